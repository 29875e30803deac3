use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::labels::Variant;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listen port (crop: 5001, cattle: 5002)
    pub port: u16,
    /// Upper bound on request bodies, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// File extensions accepted on `/predict` (lowercase, no dot)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ServerConfig {
    pub fn is_allowed_filename(&self, filename: &str) -> bool {
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return false;
        };
        let ext = ext.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Which detector this process serves
    pub variant: Variant,
    /// ONNX export of the fine-tuned classifier
    pub weights: PathBuf,
    /// Class list file (one label per line, or a JSON array)
    #[serde(default)]
    pub labels: Option<PathBuf>,
    /// ImageFolder-style dataset root; sub-directory names become the class list
    #[serde(default)]
    pub dataset_dir: Option<PathBuf>,
    /// Shorter-side resize target before cropping
    #[serde(default = "default_resize")]
    pub resize: u32,
    /// Square center-crop size fed to the network
    #[serde(default = "default_crop")]
    pub crop: u32,
    /// Number of ranked alternatives kept per prediction
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_resize() -> u32 {
    256
}

fn default_crop() -> u32 {
    224
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token (from BotFather)
    #[serde(default)]
    pub token: Option<String>,
    /// Full URL of the `/predict` endpoint the relay forwards photos to
    #[serde(default = "default_inference_url")]
    pub inference_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_inference_url() -> String {
    "http://127.0.0.1:5001/predict".to_string()
}

fn default_connect_timeout() -> u64 {
    20
}

fn default_read_timeout() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            inference_url: default_inference_url(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the daily rolling log file (console only when unset)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config_dir` and the environment.
    ///
    /// `variant` also pins `model.variant`, so the port and weight defaults
    /// chosen for it always describe the model being served.
    pub fn load_from<P: AsRef<Path>>(config_dir: P, variant: Variant) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let defaults = Self::default_config(variant);

        let builder = Config::builder()
            // Start with the variant's built-in values
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("model.weights", defaults.model.weights.display().to_string())?
            .set_default(
                "model.dataset_dir",
                defaults
                    .model
                    .dataset_dir
                    .map(|p| p.display().to_string()),
            )?
            .set_default("bot.inference_url", defaults.bot.inference_url)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("AGRI_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (AGRI_SERVER__PORT, etc.)
            .add_source(
                Environment::with_prefix("AGRI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("model.variant", variant.as_str())?;

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config(variant: Variant) -> Self {
        let (port, weights, dataset_dir) = match variant {
            Variant::Crop => (5001, "resnet50_crop_disease_best.onnx", "plant_disease_data"),
            Variant::Cattle => (
                5002,
                "efficientnet_cattle_disease_best.onnx",
                "livestock_data",
            ),
        };

        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port,
                max_upload_bytes: default_max_upload_bytes(),
                allowed_extensions: default_allowed_extensions(),
            },
            model: ModelConfig {
                variant,
                weights: PathBuf::from(weights),
                labels: None,
                dataset_dir: Some(PathBuf::from(dataset_dir)),
                resize: default_resize(),
                crop: default_crop(),
                top_k: default_top_k(),
            },
            bot: BotConfig {
                inference_url: format!("http://127.0.0.1:{port}/predict"),
                ..BotConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }

        if self.server.max_upload_bytes == 0 {
            errors.push("server.max_upload_bytes must be positive".to_string());
        }

        if self.server.allowed_extensions.is_empty() {
            errors.push("server.allowed_extensions must not be empty".to_string());
        }

        if self.model.crop == 0 || self.model.resize == 0 {
            errors.push("model.resize and model.crop must be positive".to_string());
        }

        if self.model.crop > self.model.resize {
            errors.push(format!(
                "model.crop ({}) should not exceed model.resize ({})",
                self.model.crop, self.model.resize
            ));
        }

        if self.model.labels.is_none() && self.model.dataset_dir.is_none() {
            errors.push("one of model.labels or model.dataset_dir is required".to_string());
        }

        if !self.bot.inference_url.starts_with("http://")
            && !self.bot.inference_url.starts_with("https://")
        {
            errors.push(format!(
                "bot.inference_url must be an http(s) URL, got {}",
                self.bot.inference_url
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // tests below read or write process-wide AGRI_* variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn variant_defaults_pick_distinct_ports() {
        let crop = AppConfig::default_config(Variant::Crop);
        let cattle = AppConfig::default_config(Variant::Cattle);
        assert_eq!(crop.server.port, 5001);
        assert_eq!(cattle.server.port, 5002);
        assert_eq!(cattle.bot.inference_url, "http://127.0.0.1:5002/predict");
        assert!(crop.validate().is_ok());
    }

    #[test]
    fn extension_check_is_case_insensitive_and_uses_last_dot() {
        let server = AppConfig::default_config(Variant::Crop).server;
        assert!(server.is_allowed_filename("leaf.JPG"));
        assert!(server.is_allowed_filename("archive.tar.png"));
        assert!(!server.is_allowed_filename("leaf.png.exe"));
        assert!(!server.is_allowed_filename("noextension"));
        assert!(!server.is_allowed_filename("photo.webp"));
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut cfg = AppConfig::default_config(Variant::Cattle);
        cfg.model.crop = 512;
        cfg.model.dataset_dir = None;
        cfg.bot.inference_url = "ftp://host".to_string();

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn load_from_empty_dir_falls_back_to_variant_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path(), Variant::Cattle).unwrap();
        assert_eq!(cfg.model.variant, Variant::Cattle);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.model.resize, 256);
        assert_eq!(cfg.server.allowed_extensions.len(), 4);
    }

    #[test]
    fn shipped_default_toml_keeps_variant_ports() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let cfg = AppConfig::load_from(&dir, Variant::Cattle).unwrap();
        assert_eq!(cfg.server.port, 5002);
        assert_eq!(
            cfg.model.weights,
            PathBuf::from("efficientnet_cattle_disease_best.onnx")
        );
        assert_eq!(cfg.bot.connect_timeout_secs, 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn single_underscore_prefix_env_overrides_apply() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("AGRI_SERVER__PORT", "6123");
        std::env::set_var("AGRI_BOT__TOKEN", "123:abc");
        std::env::set_var("AGRI_MODEL__VARIANT", "cattle");

        let cfg = AppConfig::load_from(dir.path(), Variant::Crop);

        std::env::remove_var("AGRI_SERVER__PORT");
        std::env::remove_var("AGRI_BOT__TOKEN");
        std::env::remove_var("AGRI_MODEL__VARIANT");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.server.port, 6123);
        assert_eq!(cfg.bot.token.as_deref(), Some("123:abc"));
        // the variant the process was started for wins over any layer
        assert_eq!(cfg.model.variant, Variant::Crop);
        assert_eq!(
            cfg.model.weights,
            PathBuf::from("resnet50_crop_disease_best.onnx")
        );
    }
}
