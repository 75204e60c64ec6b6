//! C4: Deep-Work Detector — gap-based focus-block extraction with
//! context-switch counting and focus-level classification.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::domains::{extract_domain, round2};
use crate::analytics::engagement::hour_label;
use crate::analytics::AnalyticsThresholds;
use crate::store::Event;

/// Max inter-event gap within a block.
pub const GAP_MAX_SECONDS: i64 = 300;
/// Minimum block duration to count as deep work.
pub const DEEP_MIN_MINUTES: f64 = 25.0;
/// Minimum events per block.
pub const EVENT_MIN: usize = 10;
/// High-focus classification ceiling (switches/hr).
pub const FOCUS_HIGH_MAX: f64 = 5.0;
/// Medium-focus classification ceiling (switches/hr).
pub const FOCUS_MED_MAX: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusLevel {
    High,
    Medium,
    Low,
}

impl FocusLevel {
    pub fn classify(switches_per_hour: f64, thresholds: &AnalyticsThresholds) -> Self {
        if switches_per_hour <= thresholds.focus_high_max {
            FocusLevel::High
        } else if switches_per_hour <= thresholds.focus_med_max {
            FocusLevel::Medium
        } else {
            FocusLevel::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeepWorkBlock {
    pub block_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: f64,
    pub events: i64,
    pub unique_domains: i64,
    pub context_switches: i64,
    pub switches_per_hour: f64,
    pub focus_level: FocusLevel,
    pub dominant_domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextSwitchTotals {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyDeepWork {
    pub date: String,
    pub hour: u32,
    pub hour_label: String,
    pub deep_work_minutes: f64,
    pub context_switches: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeepWorkSessionsResponse {
    pub sessions_count: i64,
    pub total_minutes: f64,
    pub average_minutes: f64,
    pub longest_minutes: f64,
    pub shortest_minutes: f64,
    pub unique_domains: i64,
    pub deep_work_rate: f64,
    pub context_switches: ContextSwitchTotals,
    pub blocks: Vec<DeepWorkBlock>,
    pub hourly_breakdown: Vec<HourlyDeepWork>,
}

/// Runs the full C4 pipeline: candidate-block extraction, qualification
/// filter, and aggregate composition. `total_tracked_minutes` comes from C3
/// over the same window and is used only for `deep_work_rate`.
pub fn detect(
    events: &[Event],
    total_tracked_minutes: f64,
    thresholds: &AnalyticsThresholds,
) -> DeepWorkSessionsResponse {
    let blocks = qualifying_blocks(events, thresholds);

    if blocks.is_empty() {
        return DeepWorkSessionsResponse {
            sessions_count: 0,
            total_minutes: 0.0,
            average_minutes: 0.0,
            longest_minutes: 0.0,
            shortest_minutes: 0.0,
            unique_domains: 0,
            deep_work_rate: 0.0,
            context_switches: ContextSwitchTotals {
                high: 0,
                medium: 0,
                low: 0,
            },
            blocks: Vec::new(),
            hourly_breakdown: Vec::new(),
        };
    }

    let total_minutes_raw: f64 = blocks.iter().map(|b| b.duration_minutes).sum();
    let longest = blocks
        .iter()
        .map(|b| b.duration_minutes)
        .fold(f64::MIN, f64::max);
    let shortest = blocks
        .iter()
        .map(|b| b.duration_minutes)
        .fold(f64::MAX, f64::min);

    let mut all_domains: HashSet<String> = HashSet::new();
    for block in &blocks {
        if let Some(domain) = &block.dominant_domain {
            all_domains.insert(domain.clone());
        }
    }

    let mut totals = ContextSwitchTotals {
        high: 0,
        medium: 0,
        low: 0,
    };
    for block in &blocks {
        match block.focus_level {
            FocusLevel::High => totals.high += block.context_switches,
            FocusLevel::Medium => totals.medium += block.context_switches,
            FocusLevel::Low => totals.low += block.context_switches,
        }
    }

    let deep_work_rate = if total_tracked_minutes > 0.0 {
        round2(total_minutes_raw / total_tracked_minutes * 100.0)
    } else {
        0.0
    };

    DeepWorkSessionsResponse {
        sessions_count: blocks.len() as i64,
        total_minutes: round2(total_minutes_raw),
        average_minutes: round2(total_minutes_raw / blocks.len() as f64),
        longest_minutes: round2(longest),
        shortest_minutes: round2(shortest),
        unique_domains: all_domains.len() as i64,
        deep_work_rate,
        context_switches: totals,
        hourly_breakdown: hourly_breakdown(&blocks),
        blocks,
    }
}

/// Extracts all qualifying deep-work blocks (duration ≥ DEEP_MIN, events ≥
/// EVENT_MIN) from the Active-Event-Set-filtered, timestamp-ordered events.
fn qualifying_blocks(events: &[Event], thresholds: &AnalyticsThresholds) -> Vec<DeepWorkBlock> {
    let mut active: Vec<&Event> = events
        .iter()
        .filter(|e| thresholds.is_active(&e.event_type))
        .collect();
    active.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.event_id.cmp(&b.event_id)));

    let mut candidates: Vec<Vec<&Event>> = Vec::new();
    let mut current: Vec<&Event> = Vec::new();

    for event in active {
        if let Some(prev) = current.last() {
            let gap = (event.timestamp - prev.timestamp).num_seconds();
            if gap > thresholds.gap_max_seconds {
                candidates.push(std::mem::take(&mut current));
            }
        }
        current.push(event);
    }
    if !current.is_empty() {
        candidates.push(current);
    }

    let mut block_id = 0i64;
    let mut blocks = Vec::new();

    for candidate in candidates {
        let start = candidate.first().unwrap().timestamp;
        let end = candidate.last().unwrap().timestamp;
        let duration_minutes = (end - start).num_milliseconds() as f64 / 1000.0 / 60.0;
        let event_count = candidate.len();

        if duration_minutes < thresholds.deep_min_minutes || event_count < thresholds.event_min {
            continue;
        }

        let mut domain_counts: HashMap<String, i64> = HashMap::new();
        let mut context_switches = 0i64;
        let mut prev_domain: Option<String> = None;

        for event in &candidate {
            let domain = extract_domain(&event.url);
            if let Some(d) = &domain {
                *domain_counts.entry(d.clone()).or_insert(0) += 1;
            }
            if let Some(prev) = &prev_domain {
                if domain.as_deref() != Some(prev.as_str()) {
                    context_switches += 1;
                }
            }
            prev_domain = domain;
        }

        let switches_per_hour = if duration_minutes > 0.0 {
            context_switches as f64 * 60.0 / duration_minutes
        } else {
            0.0
        };
        let focus_level = FocusLevel::classify(switches_per_hour, thresholds);

        let dominant_domain = domain_counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(domain, _)| domain);

        block_id += 1;
        blocks.push(DeepWorkBlock {
            block_id,
            start,
            end,
            duration_minutes,
            events: event_count as i64,
            unique_domains: candidate
                .iter()
                .filter_map(|e| extract_domain(&e.url))
                .collect::<HashSet<_>>()
                .len() as i64,
            context_switches,
            switches_per_hour: round2(switches_per_hour),
            focus_level,
            dominant_domain,
        });
    }

    blocks
}

/// Laterally allocates each block's duration (and pro-rated context
/// switches) across the hour boundaries it spans.
fn hourly_breakdown(blocks: &[DeepWorkBlock]) -> Vec<HourlyDeepWork> {
    #[derive(Default)]
    struct HourAcc {
        minutes: f64,
        switches: f64,
    }

    let mut by_hour: BTreeMap<(chrono::NaiveDate, u32), HourAcc> = BTreeMap::new();

    for block in blocks {
        for (hour_start, hour_end) in hour_windows(block.start, block.end) {
            let overlap_minutes = overlap_minutes(block.start, block.end, hour_start, hour_end);
            if overlap_minutes <= 0.0 {
                continue;
            }
            let fraction = if block.duration_minutes > 0.0 {
                overlap_minutes / block.duration_minutes
            } else {
                0.0
            };
            let key = (hour_start.date_naive(), hour_start.hour());
            let acc = by_hour.entry(key).or_default();
            acc.minutes += overlap_minutes;
            acc.switches += block.context_switches as f64 * fraction;
        }
    }

    by_hour
        .into_iter()
        .map(|((date, hour), acc)| HourlyDeepWork {
            date: date.format("%Y-%m-%d").to_string(),
            hour,
            hour_label: hour_label(hour),
            deep_work_minutes: round2(acc.minutes),
            context_switches: round2(acc.switches),
        })
        .collect()
}

/// Every `[h, h+1h)` hour window the `[start, end]` interval overlaps.
fn hour_windows(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut windows = Vec::new();
    let mut cursor = start
        .date_naive()
        .and_hms_opt(start.hour(), 0, 0)
        .unwrap()
        .and_utc();

    while cursor <= end {
        let next = cursor + chrono::Duration::hours(1);
        windows.push((cursor, next));
        cursor = next;
    }
    windows
}

fn overlap_minutes(
    block_start: DateTime<Utc>,
    block_end: DateTime<Utc>,
    hour_start: DateTime<Utc>,
    hour_end: DateTime<Utc>,
) -> f64 {
    let overlap_start = block_start.max(hour_start);
    let overlap_end = block_end.min(hour_end);
    if overlap_end <= overlap_start {
        return 0.0;
    }
    (overlap_end - overlap_start).num_milliseconds() as f64 / 1000.0 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn mk(event_type: &str, secs: i64, url: &str) -> Event {
        Event {
            event_id: Uuid::new_v4(),
            session_id: "s1".to_string(),
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

    /// 30 events, 60s apart, same url — one high-focus block.
    #[test]
    fn one_deep_block_single_domain() {
        let events: Vec<Event> = (0..30)
            .map(|i| mk("click", i * 60, "https://localhost/app"))
            .collect();
        let result = detect(&events, 29.0, &AnalyticsThresholds::default());
        assert_eq!(result.sessions_count, 1);
        let block = &result.blocks[0];
        assert!((block.duration_minutes - 29.0).abs() < 0.01);
        assert_eq!(block.events, 30);
        assert_eq!(block.unique_domains, 1);
        assert_eq!(block.context_switches, 0);
        assert_eq!(block.focus_level, FocusLevel::High);
    }

    /// Two 15-event candidate blocks separated by a 6-minute gap; neither
    /// qualifies (duration < 25 min each).
    #[test]
    fn gap_splits_block_and_neither_qualifies() {
        let mut events: Vec<Event> = (0..15)
            .map(|i| mk("click", i * 30, "https://a.com"))
            .collect();
        let gap_start = 15 * 30 + 360;
        events.extend((0..15).map(|i| mk("click", gap_start + i * 30, "https://a.com")));
        let result = detect(&events, 10.0, &AnalyticsThresholds::default());
        assert_eq!(result.sessions_count, 0);
    }

    /// 40 events over 40 minutes alternating domains every event.
    #[test]
    fn alternating_domains_produce_low_focus() {
        let events: Vec<Event> = (0..40)
            .map(|i| {
                let url = if i % 2 == 0 {
                    "https://github.com"
                } else {
                    "https://youtube.com"
                };
                mk("click", i * 60, url)
            })
            .collect();
        let result = detect(&events, 40.0, &AnalyticsThresholds::default());
        assert_eq!(result.sessions_count, 1);
        let block = &result.blocks[0];
        assert_eq!(block.context_switches, 39);
        assert_eq!(block.focus_level, FocusLevel::Low);
    }

    /// One block 10:45..11:30 laterally allocates 15 min to hour 10 and
    /// 30 min to hour 11 (context switches pro-rated the same way).
    #[test]
    fn hour_boundary_allocation_splits_minutes_and_switches() {
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let start = base
            .date_naive()
            .and_hms_opt(10, 45, 0)
            .unwrap()
            .and_utc();
        let total_secs = 45 * 60;
        let events: Vec<Event> = (0..30)
            .map(|i| {
                let ts = start + chrono::Duration::seconds(i * total_secs as i64 / 29);
                let domain = if i % 5 == 0 {
                    "https://a.com"
                } else {
                    "https://b.com"
                };
                Event {
                    event_id: Uuid::new_v4(),
                    session_id: "s1".to_string(),
                    user_id: Some("u1".to_string()),
                    user_name: None,
                    timestamp: ts,
                    event_type: "click".to_string(),
                    url: domain.to_string(),
                    x: Some(1),
                    y: Some(1),
                    key: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }
            })
            .collect();

        let result = detect(&events, 45.0, &AnalyticsThresholds::default());
        assert_eq!(result.sessions_count, 1);
        assert_eq!(result.hourly_breakdown.len(), 2);
        let hour10 = result.hourly_breakdown.iter().find(|h| h.hour == 10).unwrap();
        let hour11 = result.hourly_breakdown.iter().find(|h| h.hour == 11).unwrap();
        assert!((hour10.deep_work_minutes - 15.0).abs() < 0.5);
        assert!((hour11.deep_work_minutes - 30.0).abs() < 0.5);
    }

    #[test]
    fn switches_per_hour_duration_invariant_holds() {
        let events: Vec<Event> = (0..40)
            .map(|i| {
                let url = if i % 2 == 0 {
                    "https://github.com"
                } else {
                    "https://youtube.com"
                };
                mk("click", i * 60, url)
            })
            .collect();
        let result = detect(&events, 40.0, &AnalyticsThresholds::default());
        let block = &result.blocks[0];
        let recomputed = block.switches_per_hour * block.duration_minutes / 60.0;
        assert!((recomputed - block.context_switches as f64).abs() < 1.0);
    }
}
