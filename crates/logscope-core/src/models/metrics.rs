//! Derived metric models
//!
//! Every type here is recomputed fresh for each query from the current
//! log file contents; nothing is cached or incrementally maintained.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::ParseOutcome;

/// Aggregated metrics for a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total normalized records in the window
    pub total_requests: u64,

    /// Records classified as errors
    pub error_count: u64,

    /// Percentage of requests that errored (0 when the window is empty)
    pub error_rate: f64,

    /// Mean latency over records that carry a duration
    pub avg_response_time: f64,

    /// 50th percentile latency
    pub p50_response_time: f64,

    /// 95th percentile latency
    pub p95_response_time: f64,

    /// 99th percentile latency
    pub p99_response_time: f64,

    /// Request counts grouped by status code
    pub requests_by_status: BTreeMap<String, u64>,

    /// Request counts grouped by HTTP method
    pub requests_by_method: BTreeMap<String, u64>,

    /// Distinct non-null user identifiers
    pub unique_users: u64,

    /// Requests flagged as authenticated
    pub authenticated_requests: u64,
}

impl MetricsSnapshot {
    /// A snapshot with every counter at zero, reported for empty or
    /// missing logs.
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            error_count: 0,
            error_rate: 0.0,
            avg_response_time: 0.0,
            p50_response_time: 0.0,
            p95_response_time: 0.0,
            p99_response_time: 0.0,
            requests_by_status: BTreeMap::new(),
            requests_by_method: BTreeMap::new(),
            unique_users: 0,
            authenticated_requests: 0,
        }
    }
}

/// Statistics for one endpoint path within a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStat {
    /// Exact endpoint path (no templating of path parameters)
    pub path: String,

    /// Requests to this endpoint
    pub count: u64,

    /// Requests that errored
    pub errors: u64,

    /// Percentage of requests that errored
    pub error_rate: f64,

    /// Mean latency
    pub avg_response_time: f64,

    /// 95th percentile latency
    pub p95_response_time: f64,
}

/// One hour of traffic within a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// Hour label, `YYYY-MM-DD HH:00` in UTC
    pub hour: String,

    /// Requests observed in this hour
    pub count: u64,
}

/// Overall service condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Log file present and non-empty
    Ok,
    /// Log file missing or empty
    Degraded,
}

/// Log file introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileStatus {
    /// Whether the configured log file exists
    pub exists: bool,

    /// Configured path
    pub path: String,

    /// File size in bytes (0 when absent)
    pub size_bytes: u64,

    /// Non-blank line count (0 when absent)
    pub total_lines: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall condition
    pub status: ServiceStatus,

    /// Log file introspection
    pub log_file: LogFileStatus,

    /// Timestamp of the newest parseable record, if any
    pub latest_timestamp: Option<DateTime<Utc>>,
}

/// Result of an accepted upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Records appended to the log
    pub accepted: usize,

    /// Payload elements that were not JSON objects
    pub rejected: usize,
}

/// Diagnostic passthrough of the first lines of the log
#[derive(Debug, Clone, Serialize)]
pub struct DebugSample {
    /// Raw lines as stored
    pub raw: Vec<String>,

    /// Per-line normalization outcome
    pub parsed: Vec<ParseOutcome>,
}
