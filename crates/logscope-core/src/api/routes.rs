//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Metrics
        .route("/api/v1/metrics", get(handlers::get_metrics))
        .route("/api/v1/metrics/endpoints", get(handlers::get_endpoint_stats))
        .route("/api/v1/metrics/errors", get(handlers::get_recent_errors))
        .route("/api/v1/metrics/traffic", get(handlers::get_hourly_traffic))

        // Log ingestion
        .route("/api/v1/logs", post(handlers::upload_logs))

        // Diagnostics
        .route("/api/v1/debug/sample", get(handlers::debug_sample))

        .with_state(state)
}
