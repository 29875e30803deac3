use thiserror::Error;

/// Main error type for the detection service
#[derive(Error, Debug)]
pub enum AgriError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Upload errors
    #[error("No image file uploaded")]
    MissingImage,

    #[error("Invalid file type. Only PNG, JPG, JPEG, GIF allowed.")]
    UnsupportedFileType { filename: String },

    #[error("Could not decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    // Model errors
    #[error("Model is not loaded. Check model file path and class data.")]
    ModelUnavailable,

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Label error: {0}")]
    Labels(String),

    // Bot relay errors
    #[error("Could not connect to the ML service at {url}")]
    BackendUnreachable { url: String },

    #[error("Telegram error: {0}")]
    Telegram(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AgriError {
    /// True for failures caused by the client's upload rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AgriError::MissingImage
                | AgriError::UnsupportedFileType { .. }
                | AgriError::ImageDecode(_)
        )
    }
}

/// Result type alias for AgriError
pub type Result<T> = std::result::Result<T, AgriError>;
