use serde::{Deserialize, Serialize};

use crate::inference::{Detection, RankedClass};

// ============================================================================
// Prediction Types
// ============================================================================

/// Body of every `/predict` answer, success or failure.
///
/// The relay deserializes the same type, so every field beyond `success`
/// and `message` is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(
        rename = "imageType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionBody>,
}

impl PredictResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            filename: None,
            image_type: None,
            detection: None,
        }
    }

    pub fn from_detection(detection: Detection, filename: String, image_type: String) -> Self {
        Self {
            success: true,
            message: detection.message.clone(),
            filename: Some(filename),
            image_type: Some(image_type),
            detection: Some(DetectionBody::from(detection)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionBody {
    pub detected: bool,
    pub disease: String,
    pub confidence: f32,
    pub treatment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<RankedClass>,
}

impl From<Detection> for DetectionBody {
    fn from(d: Detection) -> Self {
        Self {
            detected: d.detected,
            disease: d.disease,
            confidence: d.confidence,
            treatment: d.treatment,
            // the top entry repeats the headline prediction
            alternatives: d.top_k.into_iter().skip(1).collect(),
        }
    }
}

// ============================================================================
// Service Info Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeResponse {
    pub success: bool,
    pub message: String,
    pub model_status: String,
    pub classes_loaded: usize,
    pub api_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub model_loaded: bool,
    pub classes_count: usize,
    pub classes: Vec<String>,
    pub device: String,
    pub variant: String,
    pub uptime_seconds: u64,
    pub version: String,
}
