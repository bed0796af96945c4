//! Request event data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Level reported for records that carry no severity field
pub const UNKNOWN_LEVEL: &str = "unknown";

/// A single normalized log record
///
/// Raw log lines arrive in several shapes (flat keys, one level of
/// nesting, numeric fields encoded as strings); normalization flattens
/// all of them into this one form. The timestamp is the only field a
/// record cannot be admitted without.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    /// When the request was handled
    pub timestamp: DateTime<Utc>,

    /// Severity token (`info`, `error`, ...); `unknown` when absent
    pub level: String,

    /// HTTP method, if the record carried one
    pub method: Option<String>,

    /// Logical endpoint path
    pub path: Option<String>,

    /// HTTP status code
    pub status_code: Option<u16>,

    /// Request latency in milliseconds
    pub duration_ms: Option<f64>,

    /// Opaque user identifier
    pub user_id: Option<String>,

    /// Whether the request was authenticated
    pub is_authenticated: bool,

    /// Error classification, present on error records
    pub error_type: Option<String>,

    /// Error detail, present on error records
    pub error_message: Option<String>,
}

impl RequestEvent {
    /// Whether this event represents a failed request (4xx/5xx status
    /// or an `error`-level record).
    pub fn is_error(&self) -> bool {
        if matches!(self.status_code, Some(code) if code >= 400) {
            return true;
        }
        self.level.eq_ignore_ascii_case("error")
    }
}

/// Why a raw log line could not be turned into a [`RequestEvent`]
///
/// Parse failures are per-line and recoverable: the line is skipped and
/// counted, and the scan continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailure {
    /// The line is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The line parsed, but is not a JSON object
    #[error("not a JSON object")]
    NotAnObject,

    /// No timestamp field was found at any known location
    #[error("missing timestamp")]
    MissingTimestamp,

    /// A timestamp field was found but could not be parsed
    #[error("unrecognized timestamp: {0}")]
    BadTimestamp(String),
}

/// Per-line outcome exposed by the debug sample endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ParseOutcome {
    /// The line normalized cleanly
    Event(RequestEvent),
    /// The line was dropped
    Failure {
        /// Human-readable failure reason
        reason: String,
    },
}
