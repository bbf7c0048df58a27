//! Analytics result drain handler

use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use vigil_core::AnalyticsResult;

/// One analytics result on the wire
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsResultBody {
    pub device_id: String,
    pub rolling_average: f64,
    pub z_score: f64,
    pub is_anomaly: bool,
    pub timestamp: i64,
    pub value: f64,
}

impl From<AnalyticsResult> for AnalyticsResultBody {
    fn from(result: AnalyticsResult) -> Self {
        Self {
            device_id: result.key,
            rolling_average: result.rolling_average,
            z_score: result.z_score,
            is_anomaly: result.is_anomaly,
            timestamp: result.timestamp,
            value: result.value,
        }
    }
}

/// Drained results
#[derive(Debug, Serialize, Deserialize)]
pub struct AnomaliesResponse {
    pub count: usize,
    pub anomalies: Vec<AnalyticsResultBody>,
}

/// Take every queued result available within the drain budget
pub async fn list_anomalies(State(state): State<AppState>) -> Json<AnomaliesResponse> {
    let anomalies: Vec<AnalyticsResultBody> = state
        .pipeline
        .drain_default()
        .await
        .into_iter()
        .map(Into::into)
        .collect();

    Json(AnomaliesResponse {
        count: anomalies.len(),
        anomalies,
    })
}
