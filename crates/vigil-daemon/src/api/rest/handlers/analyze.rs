//! Rolling average query handler

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// Query parameters for `/api/analyze`
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    pub device_id: Option<String>,
}

/// Rolling average for one device
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub device_id: String,
    pub rolling_average: f64,
    pub window_size: usize,
    /// Values behind `rolling_average`; zero means the device has no history
    pub samples: usize,
}

/// Current rolling average for a device
pub async fn analyze_device(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let device_id = params
        .device_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("device_id parameter is required".to_string()))?;

    let summary = state.pipeline.analyze(&device_id);

    Ok(Json(AnalyzeResponse {
        device_id: summary.key,
        rolling_average: summary.rolling_average,
        window_size: summary.window_size,
        samples: summary.samples,
    }))
}
