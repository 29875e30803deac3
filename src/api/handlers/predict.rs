use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{error::ApiError, state::AppState, types::PredictResponse};
use crate::error::AgriError;

const DEFAULT_IMAGE_TYPE: &str = "crop";

/// A `/predict` form once all fields are read.
#[derive(Debug)]
struct Upload {
    filename: String,
    bytes: Vec<u8>,
    image_type: String,
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<PredictResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    state.metrics.inc_requests();

    match run_predict(&state, multipart, request_id).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            if e.is_client_error() {
                state.metrics.record_rejection();
                info!(%request_id, status = %e.status, "Rejected upload: {}", e.message);
            } else {
                state.metrics.record_failure();
                warn!(%request_id, status = %e.status, "Prediction failed: {}", e.message);
            }
            Err(e)
        }
    }
}

async fn run_predict(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
    request_id: Uuid,
) -> std::result::Result<PredictResponse, ApiError> {
    if !state.pipeline.is_loaded() {
        return Err(AgriError::ModelUnavailable.into());
    }

    let upload = read_upload(multipart?).await?;
    if !state.server.is_allowed_filename(&upload.filename) {
        return Err(AgriError::UnsupportedFileType {
            filename: upload.filename,
        }
        .into());
    }

    info!(
        %request_id,
        filename = %upload.filename,
        bytes = upload.bytes.len(),
        "Running prediction"
    );

    let pipeline = state.pipeline.clone();
    let bytes = upload.bytes;
    let detection = tokio::task::spawn_blocking(move || pipeline.run(&bytes))
        .await
        .map_err(|e| AgriError::Internal(format!("inference task failed: {e}")))??;

    state
        .metrics
        .record_success(detection.detected, detection.inference_ms);
    info!(
        %request_id,
        disease = %detection.disease,
        confidence = detection.confidence,
        detected = detection.detected,
        "Prediction served"
    );

    Ok(PredictResponse::from_detection(
        detection,
        upload.filename,
        upload.image_type,
    ))
}

/// Pull the `image` file and optional `imageType` text out of the form.
async fn read_upload(mut multipart: Multipart) -> std::result::Result<Upload, ApiError> {
    let mut image: Option<(String, Vec<u8>)> = None;
    let mut image_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                // a part without a filename is a plain form value, not a file
                if let Some(filename) = field.file_name().map(str::to_string) {
                    let bytes = field.bytes().await?;
                    image = Some((filename, bytes.to_vec()));
                }
            }
            Some("imageType") => {
                let text = field.text().await?;
                let text = text.trim();
                if !text.is_empty() {
                    image_type = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) = image.ok_or(AgriError::MissingImage)?;
    Ok(Upload {
        filename,
        bytes,
        image_type: image_type.unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string()),
    })
}
