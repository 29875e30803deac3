use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Metrics collector for observability
pub struct Metrics {
    /// Total `/predict` requests received
    pub requests: AtomicU64,
    /// Predictions that produced a detection
    pub succeeded: AtomicU64,
    /// Requests refused because of the upload itself (4xx)
    pub rejected: AtomicU64,
    /// Requests that failed inside the service (5xx)
    pub failed: AtomicU64,
    /// Successful predictions that flagged a disease
    pub diseases_detected: AtomicU64,
    /// Cumulative forward-pass time in microseconds
    inference_micros: AtomicU64,
    started_at: DateTime<Utc>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            diseases_detected: AtomicU64::new(0),
            inference_micros: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed prediction
    pub fn record_success(&self, detected: bool, inference_ms: f64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        if detected {
            self.diseases_detected.fetch_add(1, Ordering::Relaxed);
        }
        self.inference_micros
            .fetch_add((inference_ms * 1000.0).max(0.0) as u64, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    /// Mean forward-pass latency over successful predictions
    pub fn mean_inference_ms(&self) -> f64 {
        let n = self.succeeded.load(Ordering::Relaxed);
        if n == 0 {
            return 0.0;
        }
        self.inference_micros.load(Ordering::Relaxed) as f64 / 1000.0 / n as f64
    }

    /// Get current metrics as a formatted string
    pub fn summary(&self) -> String {
        format!(
            "requests={} ok={} rejected={} failed={} diseases={} mean_inference_ms={:.1}",
            self.requests.load(Ordering::Relaxed),
            self.succeeded.load(Ordering::Relaxed),
            self.rejected.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.diseases_detected.load(Ordering::Relaxed),
            self.mean_inference_ms(),
        )
    }

    /// Export metrics in Prometheus format
    pub fn prometheus(&self, model_loaded: bool) -> String {
        format!(
            r#"# HELP agrisense_up Model loaded (1) or not (0)
# TYPE agrisense_up gauge
agrisense_up {}

# HELP agrisense_uptime_seconds Uptime in seconds
# TYPE agrisense_uptime_seconds counter
agrisense_uptime_seconds {}

# HELP agrisense_predict_requests_total Total prediction requests
# TYPE agrisense_predict_requests_total counter
agrisense_predict_requests_total {}

# HELP agrisense_predictions_total Successful predictions
# TYPE agrisense_predictions_total counter
agrisense_predictions_total {}

# HELP agrisense_rejected_total Uploads rejected as invalid
# TYPE agrisense_rejected_total counter
agrisense_rejected_total {}

# HELP agrisense_failures_total Predictions that failed inside the service
# TYPE agrisense_failures_total counter
agrisense_failures_total {}

# HELP agrisense_diseases_detected_total Predictions that flagged a disease
# TYPE agrisense_diseases_detected_total counter
agrisense_diseases_detected_total {}

# HELP agrisense_inference_seconds_total Cumulative forward-pass time
# TYPE agrisense_inference_seconds_total counter
agrisense_inference_seconds_total {:.6}
"#,
            if model_loaded { 1 } else { 0 },
            self.uptime_seconds(),
            self.requests.load(Ordering::Relaxed),
            self.succeeded.load(Ordering::Relaxed),
            self.rejected.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.diseases_detected.load(Ordering::Relaxed),
            self.inference_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        )
    }

    /// Log periodic status
    pub fn log_status(&self) {
        info!("{}", self.summary());
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
