//! Log aggregation engine
//!
//! The engine derives every metric view on demand from the current
//! contents of the log file: each query re-opens the file, normalizes
//! the records, filters by window, and reduces. No state is kept
//! between queries, so results are never stale and concurrent readers
//! never block each other; the cost is one bounded scan per query.

pub mod aggregate;
pub mod normalize;
pub mod store;
pub mod window;

pub use store::LogStore;
pub use window::Window;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    DebugSample, EndpointStat, HealthStatus, HourlyBucket, LogFileStatus, MetricsSnapshot,
    ParseOutcome, RequestEvent, ServiceStatus, SortBy, SortOrder, UploadReceipt,
};

/// Keys under which an uploaded JSON object may wrap its record list
const WRAPPER_KEYS: &[&str] = &["logs", "events", "entries", "data", "items"];

/// Upper bound on the debug sample size
const MAX_DEBUG_SAMPLE: i64 = 50;

/// Result of decoding the full log file
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Successfully normalized records, in file order
    pub events: Vec<RequestEvent>,
    /// Lines that could not be normalized and were skipped
    pub parse_failures: u64,
}

/// The log aggregation engine
///
/// Owns the log store and the configured query limits, and exposes the
/// semantic operations consumed by the HTTP layer and the CLI.
pub struct Engine {
    store: LogStore,
    upload_token: Option<String>,
    max_window_minutes: u32,
    max_limit: usize,
}

impl Engine {
    /// Build an engine from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            store: LogStore::new(&config.log.path),
            upload_token: config.auth.upload_token.clone(),
            max_window_minutes: config.query.max_window_minutes,
            max_limit: config.query.max_limit,
        }
    }

    /// The underlying log store
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Decode the whole log file, skipping and counting malformed lines.
    pub fn scan(&self) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        for line in self.store.read_lines() {
            match normalize::normalize_line(&line) {
                Ok(event) => outcome.events.push(event),
                Err(_) => outcome.parse_failures += 1,
            }
        }
        debug!(
            "scanned {}: {} event(s), {} parse failure(s)",
            self.store.path().display(),
            outcome.events.len(),
            outcome.parse_failures
        );
        outcome
    }

    /// Report log file presence and basic statistics. Never fails:
    /// a missing or empty file is reported as a degraded status.
    pub fn health(&self) -> HealthStatus {
        let exists = self.store.exists();
        let total_lines = self.store.line_count();
        let latest_timestamp = self.scan().events.iter().map(|e| e.timestamp).max();

        let status = if exists && total_lines > 0 {
            ServiceStatus::Ok
        } else {
            ServiceStatus::Degraded
        };

        HealthStatus {
            status,
            log_file: LogFileStatus {
                exists,
                path: self.store.path().display().to_string(),
                size_bytes: self.store.size_bytes(),
                total_lines,
            },
            latest_timestamp,
        }
    }

    /// Aggregated metrics for a trailing window.
    pub fn metrics(&self, window_minutes: i64) -> Result<MetricsSnapshot> {
        let window = Window::trailing(window_minutes, self.max_window_minutes, Utc::now())?;
        let selected = window::select(self.scan().events, &window);
        Ok(aggregate::aggregate(&selected))
    }

    /// Per-endpoint statistics for a trailing window.
    pub fn endpoint_stats(
        &self,
        window_minutes: i64,
        sort_by: SortBy,
        order: SortOrder,
        limit: i64,
    ) -> Result<Vec<EndpointStat>> {
        let limit = self.check_limit(limit)?;
        let window = Window::trailing(window_minutes, self.max_window_minutes, Utc::now())?;
        let selected = window::select(self.scan().events, &window);
        Ok(aggregate::per_endpoint(&selected, sort_by, order, limit))
    }

    /// Most recent error records across the whole log (unwindowed).
    pub fn recent_errors(&self, limit: i64) -> Result<Vec<RequestEvent>> {
        let limit = self.check_limit(limit)?;
        Ok(aggregate::recent_errors(&self.scan().events, limit))
    }

    /// Hourly traffic histogram for a trailing window.
    pub fn hourly_traffic(&self, window_minutes: i64) -> Result<Vec<HourlyBucket>> {
        let window = Window::trailing(window_minutes, self.max_window_minutes, Utc::now())?;
        let selected = window::select(self.scan().events, &window);
        Ok(aggregate::hourly_traffic(&selected, &window))
    }

    /// Append an uploaded payload to the log.
    ///
    /// The payload may be JSONL, a JSON array, a single JSON object, or
    /// an object wrapping a record list under a well-known key. Elements
    /// that are not JSON objects are counted as rejected. Authorization
    /// happens before anything touches the file, so a refused upload
    /// performs no partial write.
    pub fn upload(&self, payload: &str, credential: Option<&str>) -> Result<UploadReceipt> {
        self.authorize(credential)?;

        let (objects, rejected) = decode_payload(payload)?;
        let accepted = self.store.append(&objects)?;

        info!("upload appended {} record(s), rejected {}", accepted, rejected);
        Ok(UploadReceipt { accepted, rejected })
    }

    /// Diagnostic passthrough: the first `n` raw lines and their
    /// normalization outcomes. Not used for metrics.
    pub fn debug_sample(&self, n: i64) -> Result<DebugSample> {
        if !(1..=MAX_DEBUG_SAMPLE).contains(&n) {
            return Err(Error::validation(format!(
                "n must be between 1 and {MAX_DEBUG_SAMPLE}, got {n}"
            )));
        }

        let mut raw = Vec::new();
        let mut parsed = Vec::new();
        for line in self.store.read_lines().take(n as usize) {
            parsed.push(match normalize::normalize_line(&line) {
                Ok(event) => ParseOutcome::Event(event),
                Err(failure) => ParseOutcome::Failure {
                    reason: failure.to_string(),
                },
            });
            raw.push(line);
        }
        Ok(DebugSample { raw, parsed })
    }

    fn authorize(&self, credential: Option<&str>) -> Result<()> {
        let expected = self.upload_token.as_deref().ok_or_else(|| {
            Error::config("auth.upload_token is not configured; uploads are disabled")
        })?;
        match credential {
            Some(token) if token == expected => Ok(()),
            Some(_) => Err(Error::auth("invalid upload credential")),
            None => Err(Error::auth("missing upload credential")),
        }
    }

    fn check_limit(&self, limit: i64) -> Result<usize> {
        if limit <= 0 {
            return Err(Error::validation(format!(
                "limit must be positive, got {limit}"
            )));
        }
        if limit > self.max_limit as i64 {
            return Err(Error::validation(format!(
                "limit {limit} exceeds the maximum of {}",
                self.max_limit
            )));
        }
        Ok(limit as usize)
    }
}

/// Decode an upload payload into appendable objects plus a rejected
/// element count.
fn decode_payload(payload: &str) -> Result<(Vec<Value>, usize)> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("upload payload is empty"));
    }

    // Whole-payload JSON first (array, object, or wrapped list); if
    // that fails, fall back to line-by-line JSONL
    let elements: Vec<Option<Value>> = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items.into_iter().map(Some).collect(),
        Ok(Value::Object(map)) => {
            let wrapped = WRAPPER_KEYS.iter().find_map(|key| match map.get(*key) {
                Some(Value::Array(items)) => Some(items.clone()),
                _ => None,
            });
            match wrapped {
                Some(items) => items.into_iter().map(Some).collect(),
                None => vec![Some(Value::Object(map))],
            }
        }
        Ok(other) => vec![Some(other)],
        Err(_) => trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_str::<Value>(line).ok())
            .collect(),
    };

    let mut objects = Vec::new();
    let mut rejected = 0;
    for element in elements {
        match element {
            Some(value @ Value::Object(_)) => objects.push(value),
            _ => rejected += 1,
        }
    }
    Ok((objects, rejected))
}
