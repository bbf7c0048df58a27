//! Prometheus scrape handler

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, http::header};
use vigil_core::MetricsSink;
use vigil_observability::CONTENT_TYPE;

/// Prometheus text exposition of every registered metric
pub async fn prometheus_metrics(
    State(state): State<AppState>,
) -> ApiResult<([(header::HeaderName, &'static str); 1], String)> {
    state
        .metrics
        .metrics()
        .pipeline
        .set_tracked_series(state.pipeline.store().series_count());

    let body = state.metrics.export()?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body))
}
