use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::{AgriError, Result};
use crate::inference::{Detection, InferencePipeline};
use crate::labels::{ClassNames, Variant};

#[derive(Parser)]
#[command(name = "agrisense")]
#[command(author = "Agrisense Team")]
#[command(version)]
#[command(about = "Crop and cattle disease detection API with a Telegram relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml and per-environment overrides
    #[arg(short, long, global = true, default_value = "config")]
    pub config: PathBuf,

    /// Detector to run: crop (plant) or cattle (livestock)
    #[arg(short, long, global = true, default_value = "crop")]
    pub variant: Variant,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the detection API (default)
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the Telegram relay in front of a running API
    Bot {
        /// Bot token from BotFather (falls back to bot.token)
        #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Full URL of the API's /predict endpoint
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Classify a single image file and print the verdict
    Predict {
        /// Image to classify
        image: PathBuf,
        /// Print the raw JSON detection instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Print (or write) the class list derived from an ImageFolder dataset
    Labels {
        /// Dataset root whose sub-directories are the classes
        dataset_dir: PathBuf,
        /// Write the list here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run one offline prediction with the configured model.
pub fn predict_image(config: &AppConfig, image: &Path, json: bool) -> Result<()> {
    let pipeline = InferencePipeline::from_config(&config.model)?;
    let detection = pipeline.run_path(image)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
    } else {
        print!("{}", render_detection(image, &detection));
    }
    Ok(())
}

pub fn render_detection(image: &Path, detection: &Detection) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nImage:      {}\n", image.display()));
    out.push_str(&format!(
        "Verdict:    {}\n",
        if detection.detected { "DISEASE" } else { "HEALTHY" }
    ));
    out.push_str(&format!("Class:      {}\n", detection.disease));
    out.push_str(&format!(
        "Confidence: {:.2}%\n",
        detection.confidence * 100.0
    ));
    out.push_str(&format!("Treatment:  {}\n", detection.treatment));

    if detection.top_k.len() > 1 {
        out.push_str("\nTop classes:\n");
        for (rank, class) in detection.top_k.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {:<40} {:>6.2}%\n",
                rank + 1,
                class.disease,
                class.confidence * 100.0
            ));
        }
    }
    out.push_str(&format!("\n({:.1} ms)\n", detection.inference_ms));
    out
}

/// Export the sorted class list of a dataset so it can ship next to the weights.
pub fn export_labels(dataset_dir: &Path, output: Option<&Path>) -> Result<()> {
    let classes = ClassNames::from_dataset_dir(dataset_dir)?;
    let text = classes.to_lines();

    match output {
        Some(path) => {
            std::fs::write(path, &text)?;
            println!("Wrote {} classes to {}", classes.len(), path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Resolve the Telegram token: flag first, then configuration.
pub fn resolve_token(flag: Option<String>, config: &AppConfig) -> Result<String> {
    flag.or_else(|| config.bot.token.clone())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            AgriError::Validation(
                "Telegram bot token missing: pass --token, set TELEGRAM_BOT_TOKEN or AGRI_BOT__TOKEN"
                    .to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::RankedClass;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["agrisense", "predict", "leaf.jpg", "--variant", "cattle"])
            .unwrap();
        assert_eq!(cli.variant, Variant::Cattle);
        assert_eq!(cli.config, PathBuf::from("config"));
        assert!(matches!(cli.command, Some(Commands::Predict { json: false, .. })));
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["agrisense"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.variant, Variant::Crop);
    }

    #[test]
    fn token_flag_wins_over_config() {
        let mut cfg = AppConfig::default_config(Variant::Crop);
        cfg.bot.token = Some("from-config".into());
        assert_eq!(resolve_token(Some("flag".into()), &cfg).unwrap(), "flag");
        assert_eq!(resolve_token(None, &cfg).unwrap(), "from-config");

        cfg.bot.token = Some("  ".into());
        assert!(resolve_token(None, &cfg).is_err());
    }

    #[test]
    fn render_lists_ranked_classes() {
        let detection = Detection {
            detected: true,
            disease: "Tomato Early Blight".into(),
            confidence: 0.9,
            treatment: "Remove infected leaves".into(),
            message: "Disease detected: Tomato Early Blight".into(),
            class_index: 1,
            raw_class: "Tomato_Early_blight".into(),
            top_k: vec![
                RankedClass {
                    disease: "Tomato Early Blight".into(),
                    confidence: 0.9,
                },
                RankedClass {
                    disease: "Tomato Healthy".into(),
                    confidence: 0.1,
                },
            ],
            inference_ms: 12.5,
        };
        let text = render_detection(Path::new("leaf.jpg"), &detection);
        assert!(text.contains("DISEASE"));
        assert!(text.contains("90.00%"));
        assert!(text.contains("2. Tomato Healthy"));
    }

    #[test]
    fn export_labels_writes_sorted_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        for name in ["b_rust", "a_healthy"] {
            std::fs::create_dir_all(data.join(name)).unwrap();
        }
        let out = tmp.path().join("classes.txt");
        export_labels(&data, Some(&out)).unwrap();
        let text = std::fs::read_to_string(out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), ["a_healthy", "b_rust"]);
    }
}
