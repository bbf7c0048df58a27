//! API Router configuration

use super::handlers;
use super::middleware::track_requests;
use super::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        // Ingestion
        .route("/metrics", post(handlers::ingest_metric))
        // Analytics
        .route("/analyze", get(handlers::analyze_device))
        .route("/anomalies", get(handlers::list_anomalies))
        // Health and metrics export
        .route("/health", get(handlers::health_check))
        .route("/prometheus", get(handlers::prometheus_metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests));

    // Build router with middleware
    let router = Router::new()
        .route("/", get(handlers::service_info))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
