//! API handlers for the HTTP REST API

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::engine::Engine;
use crate::error::Error;
use crate::models::{
    DebugSample, EndpointStat, HealthStatus, HourlyBucket, MetricsSnapshot, RequestEvent, SortBy,
    SortOrder, UploadReceipt,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

fn error_response(err: Error) -> (StatusCode, String) {
    let status = match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

/// Run a synchronous engine operation off the async runtime.
async fn run<T, F>(op: F) -> Result<Json<T>, (StatusCode, String)>
where
    T: Send + 'static,
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
{
    task::spawn_blocking(op)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map(Json)
        .map_err(error_response)
}

/// Health check endpoint
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let engine = state.engine;
    run(move || Ok(engine.health())).await
}

fn default_metrics_minutes() -> i64 {
    60
}

fn default_traffic_minutes() -> i64 {
    1440
}

fn default_endpoint_limit() -> i64 {
    10
}

fn default_errors_limit() -> i64 {
    20
}

fn default_sample_size() -> i64 {
    5
}

/// Query parameters for windowed metrics
#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    #[serde(default = "default_metrics_minutes")]
    pub minutes: i64,
}

/// Metrics response envelope
#[derive(Serialize)]
pub struct MetricsResponse {
    pub metrics: MetricsSnapshot,
}

/// Aggregated metrics for a trailing window
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsResponse>, (StatusCode, String)> {
    let engine = state.engine;
    run(move || {
        Ok(MetricsResponse {
            metrics: engine.metrics(query.minutes)?,
        })
    })
    .await
}

/// Query parameters for per-endpoint statistics
#[derive(Debug, Deserialize)]
pub struct EndpointsQuery {
    #[serde(default = "default_metrics_minutes")]
    pub minutes: i64,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default = "default_endpoint_limit")]
    pub limit: i64,
}

/// Endpoint statistics response envelope
#[derive(Serialize)]
pub struct EndpointsResponse {
    pub endpoints: Vec<EndpointStat>,
}

/// Per-endpoint statistics for a trailing window
pub async fn get_endpoint_stats(
    State(state): State<AppState>,
    Query(query): Query<EndpointsQuery>,
) -> Result<Json<EndpointsResponse>, (StatusCode, String)> {
    let engine = state.engine;
    run(move || {
        Ok(EndpointsResponse {
            endpoints: engine.endpoint_stats(
                query.minutes,
                query.sort_by,
                query.order,
                query.limit,
            )?,
        })
    })
    .await
}

/// Query parameters for the recent error listing
#[derive(Debug, Deserialize)]
pub struct ErrorsQuery {
    #[serde(default = "default_errors_limit")]
    pub limit: i64,
}

/// Recent errors response envelope
#[derive(Serialize)]
pub struct ErrorsResponse {
    pub errors: Vec<RequestEvent>,
}

/// Most recent error records, whole log, newest first
pub async fn get_recent_errors(
    State(state): State<AppState>,
    Query(query): Query<ErrorsQuery>,
) -> Result<Json<ErrorsResponse>, (StatusCode, String)> {
    let engine = state.engine;
    run(move || {
        Ok(ErrorsResponse {
            errors: engine.recent_errors(query.limit)?,
        })
    })
    .await
}

/// Query parameters for the traffic histogram
#[derive(Debug, Deserialize)]
pub struct TrafficQuery {
    #[serde(default = "default_traffic_minutes")]
    pub minutes: i64,
}

/// Traffic histogram response envelope
#[derive(Serialize)]
pub struct TrafficResponse {
    pub traffic: Vec<HourlyBucket>,
}

/// Hourly traffic histogram for a trailing window
pub async fn get_hourly_traffic(
    State(state): State<AppState>,
    Query(query): Query<TrafficQuery>,
) -> Result<Json<TrafficResponse>, (StatusCode, String)> {
    let engine = state.engine;
    run(move || {
        Ok(TrafficResponse {
            traffic: engine.hourly_traffic(query.minutes)?,
        })
    })
    .await
}

/// Append uploaded log records (JSONL, JSON array, or JSON object)
pub async fn upload_logs(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    body: String,
) -> Result<Json<UploadReceipt>, (StatusCode, String)> {
    let engine = state.engine;
    let credential = auth.map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());
    run(move || engine.upload(&body, credential.as_deref())).await
}

/// Query parameters for the debug sample
#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    #[serde(default = "default_sample_size")]
    pub n: i64,
}

/// Raw and parsed view of the first log lines, for diagnosis
pub async fn debug_sample(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Result<Json<DebugSample>, (StatusCode, String)> {
    let engine = state.engine;
    run(move || engine.debug_sample(query.n)).await
}
