pub mod api;
pub mod bot;
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod labels;
pub mod logging;
pub mod ml;
pub mod services;
pub mod vision;

pub use api::AppState;
pub use bot::{InferenceClient, PredictionBackend, TelegramRelay};
pub use config::AppConfig;
pub use error::{AgriError, Result};
pub use inference::{Detection, InferencePipeline, RankedClass};
pub use labels::{ClassNames, DiseaseProfile, Variant};
pub use ml::{Classifier, OnnxModel, Prediction};
pub use services::Metrics;
pub use vision::{ImageTensor, PreprocessConfig, Preprocessor};
