use std::future::Future;
use std::net::SocketAddr;

use tracing::info;

use crate::api::{create_router, AppState};
use crate::error::{AgriError, Result};

/// Bind `host:port` and serve the detection API until `shutdown` resolves.
pub async fn serve<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", state.server.host, state.server.port)
        .parse()
        .map_err(|e| AgriError::Validation(format!("invalid bind address: {e}")))?;

    info!(
        "{} Disease Detection API starting on http://{}",
        state.pipeline.variant().title(),
        addr
    );
    info!(
        "Model status: {}",
        if state.pipeline.is_loaded() {
            "Loaded"
        } else {
            "Not loaded"
        }
    );
    info!("Classes available: {}", state.pipeline.classes().len());

    let metrics = state.metrics.clone();
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AgriError::Internal(format!("API server error: {}", e)))?;

    metrics.log_status();
    Ok(())
}
