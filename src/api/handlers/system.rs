use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::api::{
    state::AppState,
    types::{HomeResponse, StatusResponse},
};

/// GET /
pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    let pipeline = &state.pipeline;
    Json(HomeResponse {
        success: true,
        message: format!(
            "{} Disease Detection API is running!",
            pipeline.variant().title()
        ),
        model_status: if pipeline.is_loaded() {
            "Loaded".to_string()
        } else {
            "Not Loaded".to_string()
        },
        classes_loaded: pipeline.classes().len(),
        api_port: state.server.port,
    })
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let pipeline = &state.pipeline;
    Json(StatusResponse {
        success: true,
        model_loaded: pipeline.is_loaded(),
        classes_count: pipeline.classes().len(),
        classes: pipeline.classes().as_slice().to_vec(),
        device: "cpu".to_string(),
        variant: pipeline.variant().to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Liveness probe - is the process alive?
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe - can `/predict` succeed?
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.pipeline.is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.prometheus(state.pipeline.is_loaded()),
    )
}
