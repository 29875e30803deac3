use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use crate::api::types::PredictResponse;
use crate::config::BotConfig;
use crate::error::{AgriError, Result};

/// Where the relay sends photos for classification.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, image: Vec<u8>, filename: &str) -> Result<PredictResponse>;

    /// Human-readable location, used in "could not connect" replies.
    fn endpoint(&self) -> &str;
}

/// HTTP client for a running detection API.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    url: String,
}

impl InferenceClient {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(
                config.connect_timeout_secs + config.read_timeout_secs,
            ))
            .build()?;
        Ok(Self {
            http,
            url: config.inference_url.clone(),
        })
    }
}

#[async_trait]
impl PredictionBackend for InferenceClient {
    async fn predict(&self, image: Vec<u8>, filename: &str) -> Result<PredictResponse> {
        let part = Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = Form::new().part("image", part);

        debug!("Sending image to ML API at {}", self.url);
        let resp = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AgriError::BackendUnreachable {
                        url: self.url.clone(),
                    }
                } else {
                    AgriError::Http(e)
                }
            })?;

        // error statuses still carry a `{ success: false, message }` body
        let status = resp.status();
        let body = resp.text().await?;
        serde_json::from_str::<PredictResponse>(&body).map_err(|e| {
            AgriError::Internal(format!(
                "unexpected response from ML API (HTTP {status}): {e}"
            ))
        })
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
