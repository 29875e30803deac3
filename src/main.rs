use anyhow::{bail, Context};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use agrisense::api::{self, AppState};
use agrisense::bot::{InferenceClient, TelegramRelay};
use agrisense::cli::{self, Cli, Commands};
use agrisense::config::AppConfig;
use agrisense::inference::InferencePipeline;
use agrisense::logging::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Labels {
            dataset_dir,
            output,
        }) => {
            init_logging_simple();
            cli::export_labels(dataset_dir, output.as_deref())?;
        }
        Some(Commands::Predict { image, json }) => {
            init_logging_simple();
            let config = load_config(&cli)?;
            let (image, json) = (image.clone(), *json);
            tokio::task::spawn_blocking(move || cli::predict_image(&config, &image, json))
                .await
                .context("prediction task panicked")??;
        }
        Some(Commands::Bot { token, api_url }) => {
            let mut config = load_config(&cli)?;
            init_logging(&config.logging);
            if let Some(url) = api_url {
                config.bot.inference_url = url.clone();
            }
            run_bot(config, token.clone()).await?;
        }
        Some(Commands::Serve { port }) => {
            let mut config = load_config(&cli)?;
            init_logging(&config.logging);
            if let Some(port) = port {
                config.server.port = *port;
            }
            run_server(config).await?;
        }
        None => {
            let config = load_config(&cli)?;
            init_logging(&config.logging);
            run_server(config).await?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load_from(&cli.config, cli.variant).with_context(|| {
        format!("failed to load configuration from {}", cli.config.display())
    })?;

    if let Err(problems) = config.validate() {
        for problem in &problems {
            eprintln!("config: {problem}");
        }
        bail!("invalid configuration ({} problems)", problems.len());
    }
    Ok(config)
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!(
        "Loading {} model from {}",
        config.model.variant,
        config.model.weights.display()
    );

    let model_cfg = config.model.clone();
    let pipeline = tokio::task::spawn_blocking(move || InferencePipeline::from_config(&model_cfg))
        .await
        .context("model loading task panicked")??;

    if !pipeline.is_loaded() {
        warn!("Serving without a model; /predict will answer 503 until weights are provided");
    }

    let state = AppState::new(pipeline, config.server);
    api::serve(state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn run_bot(config: AppConfig, token: Option<String>) -> anyhow::Result<()> {
    let token = cli::resolve_token(token, &config)?;
    let client = InferenceClient::new(&config.bot)?;

    TelegramRelay::new(token, Arc::new(client), config.model.variant)
        .run()
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
