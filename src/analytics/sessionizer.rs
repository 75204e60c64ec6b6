//! C2: Sessionizer — groups events by `(user, session_id)` and computes
//! session bounds and durations.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Event;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedTimeMetric {
    pub total_minutes: f64,
    pub sessions_count: i64,
    pub global_start: Option<DateTime<Utc>>,
    pub global_end: Option<DateTime<Utc>>,
}

impl Default for TrackedTimeMetric {
    fn default() -> Self {
        Self {
            total_minutes: 0.0,
            sessions_count: 0,
            global_start: None,
            global_end: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: f64,
    pub event_count: i64,
    pub distinct_urls: i64,
}

/// Sessions with ≥ 2 events inside the window contribute `(max_ts - min_ts)`
/// to the total.
pub fn tracked_time_by_session(events: &[Event]) -> TrackedTimeMetric {
    let grouped = group_by_session(events);

    let mut total_seconds = 0.0;
    let mut sessions_count = 0i64;
    let mut global_start: Option<DateTime<Utc>> = None;
    let mut global_end: Option<DateTime<Utc>> = None;

    for session_events in grouped.values() {
        if session_events.len() < 2 {
            continue;
        }
        let min_ts = session_events.iter().map(|e| e.timestamp).min().unwrap();
        let max_ts = session_events.iter().map(|e| e.timestamp).max().unwrap();
        total_seconds += (max_ts - min_ts).num_milliseconds() as f64 / 1000.0;
        sessions_count += 1;
        global_start = Some(global_start.map_or(min_ts, |g: DateTime<Utc>| g.min(min_ts)));
        global_end = Some(global_end.map_or(max_ts, |g: DateTime<Utc>| g.max(max_ts)));
    }

    TrackedTimeMetric {
        total_minutes: crate::analytics::domains::round2(total_seconds / 60.0),
        sessions_count,
        global_start,
        global_end,
    }
}

/// Window-agnostic span across the user's entire supplied event set, plus a
/// distinct-session count.
pub fn tracked_time_total(events: &[Event]) -> TrackedTimeMetric {
    if events.is_empty() {
        return TrackedTimeMetric::default();
    }

    let min_ts = events.iter().map(|e| e.timestamp).min().unwrap();
    let max_ts = events.iter().map(|e| e.timestamp).max().unwrap();
    let sessions: HashSet<&str> = events.iter().map(|e| e.session_id.as_str()).collect();

    TrackedTimeMetric {
        total_minutes: crate::analytics::domains::round2(
            (max_ts - min_ts).num_milliseconds() as f64 / 1000.0 / 60.0,
        ),
        sessions_count: sessions.len() as i64,
        global_start: Some(min_ts),
        global_end: Some(max_ts),
    }
}

/// Bounds, duration, event count, distinct URLs for a single session's
/// events.
pub fn session_summary(session_id: &str, events: &[Event]) -> Option<SessionSummary> {
    if events.is_empty() {
        return None;
    }

    let min_ts = events.iter().map(|e| e.timestamp).min().unwrap();
    let max_ts = events.iter().map(|e| e.timestamp).max().unwrap();
    let distinct_urls: HashSet<&str> = events.iter().map(|e| e.url.as_str()).collect();
    let representative = &events[0];

    Some(SessionSummary {
        session_id: session_id.to_string(),
        user_id: representative.user_id.clone(),
        user_name: representative.user_name.clone(),
        start: min_ts,
        end: max_ts,
        duration_minutes: crate::analytics::domains::round2(
            (max_ts - min_ts).num_milliseconds() as f64 / 1000.0 / 60.0,
        ),
        event_count: events.len() as i64,
        distinct_urls: distinct_urls.len() as i64,
    })
}

/// Every session summary for the supplied events, ordered by `start`
/// descending. Pagination is applied by the caller via the shared
/// `Pagination` machinery.
pub fn user_sessions(events: &[Event]) -> Vec<SessionSummary> {
    let grouped = group_by_session(events);
    let mut summaries: Vec<SessionSummary> = grouped
        .iter()
        .filter_map(|(session_id, session_events)| session_summary(session_id, session_events))
        .collect();
    summaries.sort_by(|a, b| b.start.cmp(&a.start));
    summaries
}

fn group_by_session(events: &[Event]) -> BTreeMap<String, Vec<Event>> {
    let mut grouped: BTreeMap<String, Vec<Event>> = BTreeMap::new();
    for event in events {
        grouped
            .entry(event.session_id.clone())
            .or_default()
            .push(event.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Event;
    use uuid::Uuid;

    fn mk(session_id: &str, secs: i64, url: &str) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            user_id: Some("u1".to_string()),
            user_name: None,
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap(),
            event_type: "click".to_string(),
            url: url.to_string(),
            x: Some(1),
            y: Some(1),
            key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn single_event_session_has_zero_duration_and_is_excluded() {
        let events = vec![mk("s1", 0, "https://a.com")];
        let metric = tracked_time_by_session(&events);
        assert_eq!(metric.sessions_count, 0);
        assert_eq!(metric.total_minutes, 0.0);
    }

    #[test]
    fn two_event_session_measures_span() {
        let events = vec![mk("s1", 0, "https://a.com"), mk("s1", 120, "https://a.com")];
        let metric = tracked_time_by_session(&events);
        assert_eq!(metric.sessions_count, 1);
        assert_eq!(metric.total_minutes, 2.0);
    }

    #[test]
    fn tracked_time_total_counts_distinct_sessions() {
        let events = vec![
            mk("s1", 0, "https://a.com"),
            mk("s2", 600, "https://a.com"),
        ];
        let metric = tracked_time_total(&events);
        assert_eq!(metric.sessions_count, 2);
        assert_eq!(metric.total_minutes, 10.0);
    }

    #[test]
    fn user_sessions_orders_by_start_descending() {
        let events = vec![
            mk("s1", 0, "https://a.com"),
            mk("s1", 60, "https://a.com"),
            mk("s2", 3600, "https://b.com"),
            mk("s2", 3660, "https://b.com"),
        ];
        let sessions = user_sessions(&events);
        assert_eq!(sessions[0].session_id, "s2");
        assert_eq!(sessions[1].session_id, "s1");
    }
}
