use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::inference::InferencePipeline;
use crate::services::Metrics;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Preprocessor, model and label interpreter, loaded once at startup
    pub pipeline: Arc<InferencePipeline>,

    /// Upload limits and bind settings
    pub server: Arc<ServerConfig>,

    /// Request counters exported at `/metrics`
    pub metrics: Arc<Metrics>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: InferencePipeline, server: ServerConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            server: Arc::new(server),
            metrics: Arc::new(Metrics::new()),
            start_time: Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.start_time).num_seconds().max(0) as u64
    }
}
