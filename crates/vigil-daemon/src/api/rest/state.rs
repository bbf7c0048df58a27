//! Application state for API handlers

use std::sync::Arc;
use vigil_core::{IngestionPipeline, Mirror};
use vigil_observability::MetricsRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Ingestion and analytics pipeline
    pub pipeline: Arc<IngestionPipeline>,

    /// Prometheus registry; also the pipeline's metrics sink
    pub metrics: Arc<MetricsRegistry>,

    /// Mirror, when one is configured
    pub mirror: Option<Arc<dyn Mirror>>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        pipeline: Arc<IngestionPipeline>,
        metrics: Arc<MetricsRegistry>,
        mirror: Option<Arc<dyn Mirror>>,
    ) -> Self {
        Self {
            pipeline,
            metrics,
            mirror,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
