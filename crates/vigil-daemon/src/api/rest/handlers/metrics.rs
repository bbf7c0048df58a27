//! Telemetry ingestion handler

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use vigil_core::{AuxMetrics, Reading};

/// Telemetry payload sent by a device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricPayload {
    pub timestamp: i64,
    pub device_id: String,
    pub cpu: f64,
    pub rps: f64,
    pub memory: f64,
}

impl From<MetricPayload> for Reading {
    fn from(payload: MetricPayload) -> Self {
        Reading::new(payload.device_id, payload.timestamp, payload.cpu).with_aux(AuxMetrics {
            rps: payload.rps,
            memory: payload.memory,
        })
    }
}

/// Ingestion acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub message: String,
}

/// Accept one reading; analytics runs after the response is sent
pub async fn ingest_metric(
    State(state): State<AppState>,
    payload: Result<Json<MetricPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let Json(payload) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected metric payload");
        ApiError::BadRequest("Invalid JSON".to_string())
    })?;

    state.pipeline.ingest(payload.into())?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted".to_string(),
            message: "Metric received and queued for processing".to_string(),
        }),
    ))
}
