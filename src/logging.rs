use std::path::Path;

use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub const LOG_FILE_PREFIX: &str = "agrisense.log";

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: &str) -> String {
    let base = match level {
        "info" => "info,agrisense=debug",
        other => other,
    };
    format!("{base},hyper=warn,tract_onnx=warn,tract_core=warn")
}

/// Install the global subscriber for long-running modes (`serve`, `bot`).
pub fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&cfg.level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = cfg.dir.as_deref().and_then(file_writer).map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });
    let file_logging_enabled = file_layer.is_some();

    let (json_layer, plain_layer) = if cfg.json {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            ),
            None,
        )
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed && file_logging_enabled {
        if let Some(dir) = &cfg.dir {
            tracing::info!("File logging enabled: {}/{}.*", dir.display(), LOG_FILE_PREFIX);
        }
    }
}

/// Minimal logging for one-shot CLI commands.
pub fn init_logging_simple() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

fn file_writer(dir: &Path) -> Option<NonBlocking> {
    // `rolling::daily` panics when it cannot create the first file, so probe first.
    if let Err(e) = writable(dir) {
        eprintln!(
            "Warning: Could not write to log directory {} ({}), file logging disabled",
            dir.display(),
            e
        );
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    // the process lives until shutdown; keep the flush guard with it
    Box::leak(Box::new(guard));
    Some(non_blocking)
}

fn writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let probe = dir.join(".agrisense_write_test");
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&probe)?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_parses() {
        assert!(EnvFilter::try_new(default_directive("debug")).is_ok());
        assert!(default_directive("info").starts_with("info,agrisense=debug"));
    }

    #[test]
    fn writable_creates_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("logs").join("api");
        writable(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join(".agrisense_write_test").exists());
    }
}
