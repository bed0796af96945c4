//! Metric aggregation
//!
//! Reduces a window-selected slice of events into the derived metric
//! views: global snapshot, per-endpoint breakdown, recent errors, and
//! the hourly traffic histogram. Everything here is a pure function of
//! its input; nothing is cached between queries.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::models::{EndpointStat, HourlyBucket, MetricsSnapshot, RequestEvent, SortBy, SortOrder};

use super::window::Window;

/// Rank-based percentile over ascending-sorted values.
///
/// Selects the value at rank `ceil(p/100 * n) - 1`, clamped to
/// `[0, n-1]`. An empty set reports 0. At `n == 1` every percentile is
/// the single value; there is no interpolation.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let rank = (pct / 100.0 * n as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(n - 1)]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Error rate as a percentage; 0 when the denominator is 0.
fn error_rate(errors: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * errors as f64 / total as f64
    }
}

fn sorted_durations<'a>(events: impl Iterator<Item = &'a RequestEvent>) -> Vec<f64> {
    let mut durations: Vec<f64> = events.filter_map(|e| e.duration_ms).collect();
    durations.sort_by(f64::total_cmp);
    durations
}

/// Compute the global metrics snapshot for a set of events.
///
/// Totals count every normalized event; status, method, and latency
/// aggregates only use events that carry the relevant field.
pub fn aggregate(events: &[RequestEvent]) -> MetricsSnapshot {
    let total = events.len() as u64;
    let errors = events.iter().filter(|e| e.is_error()).count() as u64;

    let durations = sorted_durations(events.iter());

    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_method: BTreeMap<String, u64> = BTreeMap::new();
    let mut users: HashSet<&str> = HashSet::new();
    let mut authenticated = 0_u64;

    for event in events {
        if let Some(code) = event.status_code {
            *by_status.entry(code.to_string()).or_insert(0) += 1;
        }
        if let Some(method) = &event.method {
            *by_method.entry(method.clone()).or_insert(0) += 1;
        }
        if let Some(user) = event.user_id.as_deref() {
            users.insert(user);
        }
        if event.is_authenticated {
            authenticated += 1;
        }
    }

    MetricsSnapshot {
        total_requests: total,
        error_count: errors,
        error_rate: error_rate(errors, total),
        avg_response_time: mean(&durations),
        p50_response_time: percentile(&durations, 50.0),
        p95_response_time: percentile(&durations, 95.0),
        p99_response_time: percentile(&durations, 99.0),
        requests_by_status: by_status,
        requests_by_method: by_method,
        unique_users: users.len() as u64,
        authenticated_requests: authenticated,
    }
}

/// Compute per-endpoint statistics, ordered and truncated.
///
/// Events are grouped by exact path (`/products/1` and `/products/2`
/// are distinct endpoints); events without a path are excluded. The
/// sort is stable, so ties keep first-seen order.
pub fn per_endpoint(
    events: &[RequestEvent],
    sort_by: SortBy,
    order: SortOrder,
    limit: usize,
) -> Vec<EndpointStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&RequestEvent>)> = Vec::new();

    for event in events {
        let Some(path) = event.path.as_deref() else {
            continue;
        };
        match index.get(path) {
            Some(&i) => groups[i].1.push(event),
            None => {
                index.insert(path, groups.len());
                groups.push((path.to_string(), vec![event]));
            }
        }
    }

    let mut stats: Vec<EndpointStat> = groups
        .into_iter()
        .map(|(path, members)| {
            let count = members.len() as u64;
            let errors = members.iter().filter(|e| e.is_error()).count() as u64;
            let durations = sorted_durations(members.iter().copied());

            EndpointStat {
                path,
                count,
                errors,
                error_rate: error_rate(errors, count),
                avg_response_time: mean(&durations),
                p95_response_time: percentile(&durations, 95.0),
            }
        })
        .collect();

    match (sort_by, order) {
        (SortBy::Count, SortOrder::Asc) => stats.sort_by(|a, b| a.count.cmp(&b.count)),
        (SortBy::Count, SortOrder::Desc) => stats.sort_by(|a, b| b.count.cmp(&a.count)),
        (SortBy::P95, SortOrder::Asc) => {
            stats.sort_by(|a, b| a.p95_response_time.total_cmp(&b.p95_response_time));
        }
        (SortBy::P95, SortOrder::Desc) => {
            stats.sort_by(|a, b| b.p95_response_time.total_cmp(&a.p95_response_time));
        }
    }

    stats.truncate(limit);
    stats
}

/// Error-classified events, most recent first.
pub fn recent_errors(events: &[RequestEvent], limit: usize) -> Vec<RequestEvent> {
    let mut errors: Vec<RequestEvent> = events.iter().filter(|e| e.is_error()).cloned().collect();
    errors.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    errors.truncate(limit);
    errors
}

/// Hourly traffic histogram across the window, gap-free.
///
/// One bucket per absolute hour from the window start's hour through
/// the window end's hour; hours with no events are emitted with a zero
/// count so the histogram has no gaps.
pub fn hourly_traffic(events: &[RequestEvent], window: &Window) -> Vec<HourlyBucket> {
    let mut counts: HashMap<DateTime<Utc>, u64> = HashMap::new();
    for event in events {
        *counts.entry(hour_floor(event.timestamp)).or_insert(0) += 1;
    }

    let mut buckets = Vec::new();
    let mut cursor = hour_floor(window.start);
    while cursor <= window.end {
        buckets.push(HourlyBucket {
            hour: cursor.format("%Y-%m-%d %H:00").to_string(),
            count: counts.get(&cursor).copied().unwrap_or(0),
        });
        cursor += Duration::hours(1);
    }
    buckets
}

fn hour_floor(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    // Only fails at the edges of the representable range
    timestamp
        .duration_trunc(Duration::hours(1))
        .unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn event(
        timestamp: DateTime<Utc>,
        path: Option<&str>,
        status: Option<u16>,
        duration: Option<f64>,
    ) -> RequestEvent {
        RequestEvent {
            timestamp,
            level: "info".to_string(),
            method: Some("GET".to_string()),
            path: path.map(str::to_string),
            status_code: status,
            duration_ms: duration,
            user_id: None,
            is_authenticated: false,
            error_type: None,
            error_message: None,
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn snapshot_for_three_request_scenario() {
        let t = base_time();
        let events = vec![
            event(t, Some("/a"), Some(200), Some(10.0)),
            event(t, Some("/a"), Some(200), Some(20.0)),
            event(t, Some("/b"), Some(500), Some(30.0)),
        ];

        let snapshot = aggregate(&events);

        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.error_count, 1);
        assert!((snapshot.error_rate - 33.33).abs() < 0.01);
        assert!((snapshot.avg_response_time - 20.0).abs() < f64::EPSILON);
        assert!((snapshot.p50_response_time - 20.0).abs() < f64::EPSILON);
        assert!((snapshot.p95_response_time - 30.0).abs() < f64::EPSILON);
        assert!((snapshot.p99_response_time - 30.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.requests_by_status.get("200"), Some(&2));
        assert_eq!(snapshot.requests_by_status.get("500"), Some(&1));
        assert_eq!(snapshot.requests_by_method.get("GET"), Some(&3));
    }

    #[test]
    fn empty_input_yields_zeroed_snapshot() {
        let snapshot = aggregate(&[]);
        assert_eq!(snapshot, MetricsSnapshot::empty());
    }

    #[test]
    fn events_without_optional_fields_still_count_toward_totals() {
        let t = base_time();
        let mut bare = event(t, None, None, None);
        bare.method = None;

        let snapshot = aggregate(&[bare]);
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.error_count, 0);
        assert!(snapshot.requests_by_status.is_empty());
        assert_eq!(snapshot.avg_response_time, 0.0);
    }

    #[test]
    fn error_level_counts_as_error_without_status() {
        let t = base_time();
        let mut failed = event(t, Some("/a"), None, None);
        failed.level = "ERROR".to_string();

        let snapshot = aggregate(&[failed]);
        assert_eq!(snapshot.error_count, 1);
        assert!((snapshot.error_rate - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unique_users_and_authenticated_counts() {
        let t = base_time();
        let mut a = event(t, Some("/a"), Some(200), None);
        a.user_id = Some("u1".to_string());
        a.is_authenticated = true;
        let mut b = event(t, Some("/a"), Some(200), None);
        b.user_id = Some("u1".to_string());
        let mut c = event(t, Some("/a"), Some(200), None);
        c.user_id = Some("u2".to_string());

        let snapshot = aggregate(&[a, b, c]);
        assert_eq!(snapshot.unique_users, 2);
        assert_eq!(snapshot.authenticated_requests, 1);
    }

    #[test]
    fn percentile_selects_by_rank() {
        let values = [10.0, 20.0, 30.0];
        assert_eq!(percentile(&values, 50.0), 20.0);
        assert_eq!(percentile(&values, 95.0), 30.0);
        assert_eq!(percentile(&values, 99.0), 30.0);
    }

    #[test]
    fn percentiles_are_monotonic() {
        let mut values: Vec<f64> = (1..=97).map(f64::from).collect();
        values.sort_by(f64::total_cmp);

        let p50 = percentile(&values, 50.0);
        let p95 = percentile(&values, 95.0);
        let p99 = percentile(&values, 99.0);
        assert!(p50 <= p95 && p95 <= p99);
    }

    #[test]
    fn single_value_is_every_percentile() {
        let values = [42.0];
        assert_eq!(percentile(&values, 50.0), 42.0);
        assert_eq!(percentile(&values, 95.0), 42.0);
        assert_eq!(percentile(&values, 99.0), 42.0);
    }

    #[test]
    fn empty_percentile_is_zero() {
        assert_eq!(percentile(&[], 95.0), 0.0);
    }

    #[test]
    fn endpoint_sort_by_p95_desc_with_limit() {
        let t = base_time();
        let events = vec![
            event(t, Some("/a"), Some(200), Some(50.0)),
            event(t, Some("/b"), Some(200), Some(200.0)),
        ];

        let stats = per_endpoint(&events, SortBy::P95, SortOrder::Desc, 1);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].path, "/b");
        assert_eq!(stats[0].p95_response_time, 200.0);
    }

    #[test]
    fn endpoint_ties_keep_first_seen_order() {
        let t = base_time();
        let events = vec![
            event(t, Some("/second"), Some(200), None),
            event(t, Some("/first"), Some(200), None),
        ];
        // Reversed input: both endpoints have count 1, order must follow
        // appearance in the event stream
        let stats = per_endpoint(&events, SortBy::Count, SortOrder::Desc, 10);
        assert_eq!(stats[0].path, "/second");
        assert_eq!(stats[1].path, "/first");
    }

    #[test]
    fn endpoint_paths_are_not_templated() {
        let t = base_time();
        let events = vec![
            event(t, Some("/products/1"), Some(200), None),
            event(t, Some("/products/2"), Some(200), None),
        ];
        let stats = per_endpoint(&events, SortBy::Count, SortOrder::Desc, 10);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn events_without_a_path_are_excluded_from_endpoint_stats() {
        let t = base_time();
        let events = vec![
            event(t, None, Some(200), None),
            event(t, Some("/a"), Some(200), None),
        ];
        let stats = per_endpoint(&events, SortBy::Count, SortOrder::Desc, 10);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].path, "/a");
    }

    #[test]
    fn recent_errors_are_most_recent_first() {
        let t = base_time();
        let events = vec![
            event(t, Some("/a"), Some(500), None),
            event(t + Duration::minutes(2), Some("/b"), Some(404), None),
            event(t + Duration::minutes(1), Some("/c"), Some(200), None),
        ];

        let errors = recent_errors(&events, 10);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path.as_deref(), Some("/b"));
        assert_eq!(errors[1].path.as_deref(), Some("/a"));
    }

    #[test]
    fn recent_errors_respects_limit() {
        let t = base_time();
        let events: Vec<RequestEvent> = (0..5_i64)
            .map(|i| event(t + Duration::minutes(i), Some("/a"), Some(500), None))
            .collect();
        assert_eq!(recent_errors(&events, 3).len(), 3);
    }

    #[test]
    fn hourly_histogram_has_no_gaps() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let window = Window::trailing(180, 1440, now).unwrap();

        // One event in the first hour, none in between, one at the end
        let events = vec![
            event(now - Duration::minutes(170), Some("/a"), Some(200), None),
            event(now, Some("/a"), Some(200), None),
        ];

        let buckets = hourly_traffic(&events, &window);
        // 09:30..12:30 touches 09:00, 10:00, 11:00, 12:00
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0].hour, "2024-05-01 09:00");
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].count, 0);
        assert_eq!(buckets[2].count, 0);
        assert_eq!(buckets[3].hour, "2024-05-01 12:00");
        assert_eq!(buckets[3].count, 1);
    }

    #[test]
    fn hourly_histogram_with_no_events_is_all_zeros() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let window = Window::trailing(60, 1440, now).unwrap();

        let buckets = hourly_traffic(&[], &window);
        assert_eq!(buckets.len(), 2);
        assert!(buckets.iter().all(|b| b.count == 0));
    }
}
