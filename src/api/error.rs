use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::types::PredictResponse;
use crate::error::AgriError;

/// An error on its way to becoming a `{ success: false, message }` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }
}

impl From<AgriError> for ApiError {
    fn from(err: AgriError) -> Self {
        match &err {
            e if e.is_client_error() => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            AgriError::ModelUnavailable => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Prediction error: {err}"),
            ),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        // carries 413 when the body limit is hit
        Self::new(err.status(), format!("Invalid upload: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        Self::new(err.status(), format!("Invalid upload: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(PredictResponse::failure(self.message))).into_response()
    }
}
