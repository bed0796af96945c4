//! Record normalization
//!
//! Converts one raw log line into a canonical [`RequestEvent`]. Upstream
//! services disagree about where fields live (`status_code` at the top
//! level, `response.status_code`, `http.status`, ...), so each canonical
//! field is resolved against an ordered table of candidate paths; the
//! first present, non-null value wins. Numeric fields additionally
//! tolerate string encodings (`"200"`, `"12.5"`).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::models::{ParseFailure, RequestEvent, UNKNOWN_LEVEL};

/// Candidate paths for the timestamp, the only mandatory field.
const TIMESTAMP_PATHS: &[&[&str]] = &[&["timestamp"], &["time"], &["meta", "timestamp"]];

const METHOD_PATHS: &[&[&str]] = &[&["method"], &["request", "method"], &["http", "method"]];

const PATH_PATHS: &[&[&str]] = &[
    &["path"],
    &["request", "path"],
    &["http", "path"],
    &["endpoint"],
];

const STATUS_PATHS: &[&[&str]] = &[
    &["status_code"],
    &["status"],
    &["response", "status_code"],
    &["http", "status"],
];

const DURATION_PATHS: &[&[&str]] = &[
    &["duration_ms"],
    &["latency_ms"],
    &["response_time_ms"],
    &["timing", "duration_ms"],
];

const AUTH_PATHS: &[&[&str]] = &[
    &["is_authenticated"],
    &["authenticated"],
    &["auth", "is_authenticated"],
];

const USER_PATHS: &[&[&str]] = &[&["user_id"], &["user", "id"]];

const LEVEL_PATHS: &[&[&str]] = &[&["level"], &["severity"]];

/// Normalize one raw log line.
pub fn normalize_line(line: &str) -> Result<RequestEvent, ParseFailure> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    normalize_value(&value)
}

/// Normalize an already-decoded JSON value.
pub fn normalize_value(value: &Value) -> Result<RequestEvent, ParseFailure> {
    let record = value.as_object().ok_or(ParseFailure::NotAnObject)?;

    let raw_ts = resolve(record, TIMESTAMP_PATHS).ok_or(ParseFailure::MissingTimestamp)?;
    let timestamp = coerce_string(raw_ts)
        .and_then(|s| parse_timestamp(&s))
        .ok_or_else(|| ParseFailure::BadTimestamp(raw_ts.to_string()))?;

    let level = resolve(record, LEVEL_PATHS)
        .and_then(coerce_string)
        .unwrap_or_else(|| UNKNOWN_LEVEL.to_string());

    Ok(RequestEvent {
        timestamp,
        level,
        method: resolve(record, METHOD_PATHS).and_then(coerce_string),
        path: resolve(record, PATH_PATHS).and_then(coerce_string),
        status_code: resolve(record, STATUS_PATHS).and_then(coerce_status),
        duration_ms: resolve(record, DURATION_PATHS).and_then(coerce_duration),
        user_id: resolve(record, USER_PATHS).and_then(coerce_string),
        is_authenticated: resolve(record, AUTH_PATHS)
            .and_then(coerce_bool)
            .unwrap_or(false),
        error_type: record.get("error_type").and_then(coerce_string),
        error_message: record.get("error_message").and_then(coerce_string),
    })
}

/// Walk the candidate paths in priority order; first present wins.
fn resolve<'a>(record: &'a Map<String, Value>, paths: &[&[&str]]) -> Option<&'a Value> {
    for path in paths {
        let mut cursor: Option<&Value> = None;
        for (i, key) in path.iter().enumerate() {
            cursor = if i == 0 {
                record.get(*key)
            } else {
                cursor.and_then(|v| v.as_object()).and_then(|o| o.get(*key))
            };
            if cursor.is_none() {
                break;
            }
        }
        match cursor {
            Some(Value::Null) | None => continue,
            Some(found) => return Some(found),
        }
    }
    None
}

/// Parse an ISO-8601-like timestamp. Fails closed: anything
/// unrecognized is a parse failure, never a best-guess default.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offset without a colon, e.g. `2024-05-01T12:00:00+0000`
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // Naive timestamps are taken as UTC
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Render a scalar as a string; objects and arrays are not coerced.
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_status(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| u16::try_from(v).ok())
            .or_else(|| match n.as_f64() {
                Some(f) if f.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&f) => {
                    Some(f as u16)
                }
                _ => None,
            }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_duration(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    // Latencies are non-negative; anything else is treated as absent
    parsed.filter(|d| d.is_finite() && *d >= 0.0)
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
