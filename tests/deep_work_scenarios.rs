//! Scenario coverage for the behavioral analytics engine.
//! Run with: cargo test --test deep_work_scenarios

use behavior_analytics_api::analytics::{deep_work, engagement, AnalyticsThresholds};
use behavior_analytics_api::store::Event;
use chrono::{DateTime, Utc};
use uuid::Uuid;

fn event(event_type: &str, secs: i64, url: &str) -> Event {
    Event {
        event_id: Uuid::new_v4(),
        session_id: "scenario".to_string(),
        user_id: Some("u1".to_string()),
        user_name: None,
        timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap(),
        event_type: event_type.to_string(),
        url: url.to_string(),
        x: Some(1),
        y: Some(1),
        key: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// === Empty window ===

#[test]
fn empty_window_yields_zeroed_metrics() {
    let events: Vec<Event> = Vec::new();
    let engagement = engagement::engaged_time(&events, &AnalyticsThresholds::default());
    assert_eq!(engagement.active_minutes, 0);
    assert_eq!(engagement.total_tracked_minutes, 0);
    assert_eq!(engagement.engagement_rate, 0.0);

    let deep_work = deep_work::detect(&events, 0.0, &AnalyticsThresholds::default());
    assert_eq!(deep_work.sessions_count, 0);
    assert!(deep_work.hourly_breakdown.is_empty());
}

// === One deep block ===

#[test]
fn thirty_evenly_spaced_clicks_form_one_high_focus_block() {
    let events: Vec<Event> = (0..30).map(|i| event("click", i * 60, "https://localhost/app")).collect();
    let result = deep_work::detect(&events, 29.0, &AnalyticsThresholds::default());

    assert_eq!(result.sessions_count, 1);
    let block = &result.blocks[0];
    assert!((block.duration_minutes - 29.0).abs() < 0.1);
    assert_eq!(block.events, 30);
    assert_eq!(block.unique_domains, 1);
    assert_eq!(block.context_switches, 0);
    assert_eq!(block.switches_per_hour, 0.0);
    assert_eq!(block.focus_level, deep_work::FocusLevel::High);
    assert!((result.deep_work_rate - 100.0).abs() < 1.0);
}

// === Gap splits a block, neither candidate qualifies ===

#[test]
fn gap_splits_block_and_neither_candidate_qualifies() {
    let mut events: Vec<Event> = (0..15).map(|i| event("click", i * 30, "https://a.com")).collect();
    let gap_start = 15 * 30 + 6 * 60;
    events.extend((0..15).map(|i| event("click", gap_start + i * 30, "https://a.com")));

    let result = deep_work::detect(&events, 15.0, &AnalyticsThresholds::default());
    assert_eq!(result.sessions_count, 0);
}

// === Context switches every event ===

#[test]
fn alternating_domains_yield_low_focus() {
    let events: Vec<Event> = (0..40)
        .map(|i| {
            let url = if i % 2 == 0 { "https://github.com" } else { "https://youtube.com" };
            event("click", i * 60, url)
        })
        .collect();

    let result = deep_work::detect(&events, 40.0, &AnalyticsThresholds::default());
    assert_eq!(result.sessions_count, 1);
    let block = &result.blocks[0];
    assert_eq!(block.context_switches, 39);
    assert!((block.switches_per_hour - 58.0).abs() < 2.0);
    assert_eq!(block.focus_level, deep_work::FocusLevel::Low);
}

// === Hour-boundary lateral allocation ===

#[test]
fn block_spanning_hour_boundary_allocates_laterally() {
    let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    let start = base.date_naive().and_hms_opt(10, 45, 0).unwrap().and_utc();
    let span_secs = 45 * 60;

    let events: Vec<Event> = (0..30)
        .map(|i| {
            let ts = start + chrono::Duration::seconds(i * span_secs as i64 / 29);
            let url = if i % 5 == 0 { "https://a.com" } else { "https://b.com" };
            Event {
                event_id: Uuid::new_v4(),
                session_id: "scenario".to_string(),
                user_id: Some("u1".to_string()),
                user_name: None,
                timestamp: ts,
                event_type: "click".to_string(),
                url: url.to_string(),
                x: Some(1),
                y: Some(1),
                key: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        })
        .collect();

    let result = deep_work::detect(&events, 45.0, &AnalyticsThresholds::default());
    assert_eq!(result.sessions_count, 1);

    let hour_10 = result.hourly_breakdown.iter().find(|h| h.hour == 10).unwrap();
    let hour_11 = result.hourly_breakdown.iter().find(|h| h.hour == 11).unwrap();
    assert!((hour_10.deep_work_minutes - 15.0).abs() < 0.5);
    assert!((hour_11.deep_work_minutes - 30.0).abs() < 0.5);

    // Sum invariant: hourly deep-work minutes reconstruct the block total.
    let summed: f64 = result.hourly_breakdown.iter().map(|h| h.deep_work_minutes).sum();
    assert!((summed - result.total_minutes).abs() < 0.5);
}

// === Universal invariants ===

#[test]
fn invariant_active_minutes_never_exceeds_total_tracked() {
    let events: Vec<Event> = (0..50)
        .map(|i| {
            let event_type = if i % 4 == 0 { "idle" } else { "click" };
            event(event_type, i * 90, "https://a.com")
        })
        .collect();
    let metric = engagement::engaged_time(&events, &AnalyticsThresholds::default());
    assert!(metric.active_minutes <= metric.total_tracked_minutes);
}

#[test]
fn invariant_engagement_rate_within_bounds() {
    let events: Vec<Event> = (0..20).map(|i| event("click", i * 60, "https://a.com")).collect();
    let metric = engagement::engaged_time(&events, &AnalyticsThresholds::default());
    assert!((0.0..=100.0).contains(&metric.engagement_rate));
}

#[test]
fn invariant_qualifying_blocks_meet_both_thresholds() {
    let events: Vec<Event> = (0..30).map(|i| event("click", i * 60, "https://a.com")).collect();
    let result = deep_work::detect(&events, 29.0, &AnalyticsThresholds::default());
    for block in &result.blocks {
        assert!(block.duration_minutes >= deep_work::DEEP_MIN_MINUTES);
        assert!(block.events >= deep_work::EVENT_MIN as i64);
    }
}

#[test]
fn invariant_monotonic_active_minutes_over_widening_window() {
    let events: Vec<Event> = (0..10).map(|i| event("click", i * 600, "https://a.com")).collect();
    let narrow = engagement::engaged_time(&events[..3], &AnalyticsThresholds::default());
    let wide = engagement::engaged_time(&events, &AnalyticsThresholds::default());
    assert!(narrow.active_minutes <= wide.active_minutes);
}
