//! Health handler

use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// `healthy`, or `degraded` when the mirror is unreachable
    pub status: String,
    /// Unix seconds
    pub time: i64,
    /// `connected`, `disconnected` or `not_configured`
    pub mirror: String,
    pub tracked_series: usize,
    pub queued_results: usize,
    pub pending_jobs: usize,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let (status, mirror) = match &state.mirror {
        None => ("healthy", "not_configured"),
        Some(mirror) => match mirror.ping().await {
            Ok(()) => ("healthy", "connected"),
            Err(e) => {
                tracing::warn!(error = %e, "Mirror health check failed");
                ("degraded", "disconnected")
            }
        },
    };

    Json(HealthCheckResponse {
        status: status.to_string(),
        time: chrono::Utc::now().timestamp(),
        mirror: mirror.to_string(),
        tracked_series: state.pipeline.store().series_count(),
        queued_results: state.pipeline.channel().len(),
        pending_jobs: state.pipeline.pending_jobs(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}
