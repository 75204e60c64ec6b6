pub mod deep_work;
pub mod domains;
pub mod engagement;
pub mod orchestrator;
pub mod sessionizer;

use std::collections::HashSet;
use std::env;

use deep_work::{DEEP_MIN_MINUTES, EVENT_MIN, FOCUS_HIGH_MAX, FOCUS_MED_MAX, GAP_MAX_SECONDS};

/// Tunable thresholds for the engagement/deep-work engine. Threaded through
/// C3/C4 instead of bare module constants so a deployment can retune
/// focus-block detection and the active-event set via env vars, without a
/// code change.
#[derive(Debug, Clone)]
pub struct AnalyticsThresholds {
    pub active_event_set: HashSet<String>,
    pub gap_max_seconds: i64,
    pub deep_min_minutes: f64,
    pub event_min: usize,
    pub focus_high_max: f64,
    pub focus_med_max: f64,
}

impl Default for AnalyticsThresholds {
    fn default() -> Self {
        Self {
            active_event_set: crate::store::ACTIVE_EVENT_SET
                .iter()
                .map(|s| s.to_string())
                .collect(),
            gap_max_seconds: GAP_MAX_SECONDS,
            deep_min_minutes: DEEP_MIN_MINUTES,
            event_min: EVENT_MIN,
            focus_high_max: FOCUS_HIGH_MAX,
            focus_med_max: FOCUS_MED_MAX,
        }
    }
}

impl AnalyticsThresholds {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            active_event_set: env::var("ACTIVE_EVENT_SET")
                .ok()
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<HashSet<String>>()
                })
                .filter(|set| !set.is_empty())
                .unwrap_or(default.active_event_set),
            gap_max_seconds: env::var("GAP_MAX_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.gap_max_seconds),
            deep_min_minutes: env::var("DEEP_MIN_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.deep_min_minutes),
            event_min: env::var("EVENT_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.event_min),
            focus_high_max: env::var("FOCUS_HIGH_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.focus_high_max),
            focus_med_max: env::var("FOCUS_MED_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.focus_med_max),
        }
    }

    pub fn is_active(&self, event_type: &str) -> bool {
        self.active_event_set.contains(event_type)
    }
}
