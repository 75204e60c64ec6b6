//! C3: Engagement Calculator — per-minute active/idle bucketing over an
//! event window.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;

use crate::analytics::domains::{extract_domain, floor_to_minute, round2};
use crate::analytics::AnalyticsThresholds;
use crate::store::Event;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HourlyEngagement {
    pub date: String,
    pub hour: u32,
    pub hour_label: String,
    pub active_minutes: i64,
    pub total_minutes: i64,
    pub productivity: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EngagedTimeMetric {
    pub active_minutes: i64,
    pub total_tracked_minutes: i64,
    pub idle_minutes: i64,
    pub engagement_rate: f64,
    pub unique_domains_count: i64,
    pub domains_list: Vec<String>,
    pub hourly_breakdown: Vec<HourlyEngagement>,
}

struct MinuteBucket {
    is_active: bool,
    domains: HashSet<String>,
}

/// Computes the full per-minute active/idle breakdown over a
/// caller-filtered event slice. The caller is responsible for restricting
/// `events` to the requested user/window/session.
pub fn engaged_time(events: &[Event], thresholds: &AnalyticsThresholds) -> EngagedTimeMetric {
    let mut buckets: BTreeMap<DateTime<Utc>, MinuteBucket> = BTreeMap::new();

    for event in events {
        let minute = floor_to_minute(event.timestamp);
        let bucket = buckets.entry(minute).or_insert_with(|| MinuteBucket {
            is_active: false,
            domains: HashSet::new(),
        });
        if thresholds.is_active(&event.event_type) {
            bucket.is_active = true;
        }
        if let Some(domain) = extract_domain(&event.url) {
            bucket.domains.insert(domain);
        }
    }

    let total_tracked_minutes = buckets.len() as i64;
    let mut active_minutes = buckets.values().filter(|b| b.is_active).count() as i64;
    let mut idle_minutes = total_tracked_minutes - active_minutes;

    // Defensive clamp: both passes use the same bucket set here so this
    // should never trigger, but a future caller combining independently
    // computed bucket sets would hit it.
    if active_minutes > total_tracked_minutes {
        active_minutes = total_tracked_minutes;
        idle_minutes = 0;
    }

    let engagement_rate = if total_tracked_minutes > 0 {
        round2(active_minutes as f64 / total_tracked_minutes as f64 * 100.0)
    } else {
        0.0
    };

    let mut all_domains: HashSet<String> = HashSet::new();
    for bucket in buckets.values() {
        all_domains.extend(bucket.domains.iter().cloned());
    }
    let mut domains_list: Vec<String> = all_domains.into_iter().collect();
    domains_list.sort();

    let hourly_breakdown = hourly_breakdown(&buckets);

    EngagedTimeMetric {
        active_minutes,
        total_tracked_minutes,
        idle_minutes,
        engagement_rate,
        unique_domains_count: domains_list.len() as i64,
        domains_list,
        hourly_breakdown,
    }
}

fn hourly_breakdown(buckets: &BTreeMap<DateTime<Utc>, MinuteBucket>) -> Vec<HourlyEngagement> {
    #[derive(Default)]
    struct HourAcc {
        active_minutes: i64,
        total_minutes: i64,
    }

    let mut by_hour: BTreeMap<(chrono::NaiveDate, u32), HourAcc> = BTreeMap::new();

    for (minute, bucket) in buckets {
        let key = (minute.date_naive(), minute.hour());
        let acc = by_hour.entry(key).or_default();
        acc.total_minutes += 1;
        if bucket.is_active {
            acc.active_minutes += 1;
        }
    }

    by_hour
        .into_iter()
        .map(|((date, hour), acc)| HourlyEngagement {
            date: date.format("%Y-%m-%d").to_string(),
            hour,
            hour_label: hour_label(hour),
            active_minutes: acc.active_minutes,
            total_minutes: acc.total_minutes,
            productivity: if acc.total_minutes > 0 {
                round2(acc.active_minutes as f64 / acc.total_minutes as f64 * 100.0)
            } else {
                0.0
            },
        })
        .collect()
}

/// Formats an hour-of-day (0..24) in 12-hour clock form, e.g. `"8:00 AM"`,
/// `"12:00 PM"`.
pub fn hour_label(hour: u32) -> String {
    let period = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:00 {period}")
}
