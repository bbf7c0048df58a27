//! Request metrics middleware

use super::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Count every API request and observe its latency, labelled by route.
/// Requests in progress are reported by the `active_connections` gauge.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().to_string();
    let start = Instant::now();

    let in_flight = state.metrics.metrics().http.in_flight();
    let response = next.run(request).await;
    drop(in_flight);

    state
        .metrics
        .metrics()
        .http
        .record_request(&endpoint, &method, start.elapsed().as_secs_f64());

    response
}
