//! Trailing time window selection
//!
//! A window is a trailing interval `[now - minutes, now]`, with `now`
//! fixed once at query start so a slow scan stays internally
//! consistent. Oversized or non-positive windows are rejected outright;
//! callers are never handed a silently clamped window.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::models::RequestEvent;

/// A resolved trailing time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Inclusive lower bound
    pub start: DateTime<Utc>,
    /// Inclusive upper bound (query-time "now")
    pub end: DateTime<Utc>,
}

impl Window {
    /// Resolve a trailing window of `minutes` ending at `now`,
    /// validated against the configured ceiling.
    pub fn trailing(minutes: i64, max_minutes: u32, now: DateTime<Utc>) -> Result<Self> {
        if minutes <= 0 {
            return Err(Error::validation(format!(
                "window_minutes must be positive, got {minutes}"
            )));
        }
        if minutes > i64::from(max_minutes) {
            return Err(Error::validation(format!(
                "window_minutes {minutes} exceeds the maximum of {max_minutes}"
            )));
        }

        Ok(Self {
            start: now - Duration::minutes(minutes),
            end: now,
        })
    }

    /// Whether a timestamp falls inside the window (bounds inclusive)
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Keep only events whose timestamp falls inside the window.
pub fn select(events: Vec<RequestEvent>, window: &Window) -> Vec<RequestEvent> {
    events
        .into_iter()
        .filter(|event| window.contains(event.timestamp))
        .collect()
}
