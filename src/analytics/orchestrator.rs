//! C6: Metrics Orchestrator — validates windows, composes C2–C5 outputs,
//! and performs final rounding/labeling.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::ai_labeling::{fallback_focus_level, AiLabeling};
use crate::analytics::deep_work::{self, DeepWorkSessionsResponse};
use crate::analytics::domains::{self, DeepWorkDomain, TopDomain};
use crate::analytics::engagement::{self, EngagedTimeMetric};
use crate::analytics::sessionizer::TrackedTimeMetric;
use crate::analytics::AnalyticsThresholds;
use crate::error::AppError;
use crate::store::{Database, EventFilter};

pub struct Window {
    pub user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub session_id: Option<String>,
}

impl Window {
    /// Validates `user_id` non-empty, `end > start`, and span within the
    /// configured ceiling.
    pub fn validate(&self, max_span_days: i64) -> Result<(), AppError> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }
        if self.end <= self.start {
            return Err(AppError::Validation("end_time must be after start_time".to_string()));
        }
        let span_days = (self.end - self.start).num_days();
        if span_days > max_span_days {
            return Err(AppError::Validation(format!(
                "window span of {span_days} days exceeds the {max_span_days}-day ceiling"
            )));
        }
        Ok(())
    }

    fn filter(&self) -> EventFilter {
        EventFilter {
            user_id: Some(self.user_id.clone()),
            session_id: self.session_id.clone(),
            event_type: None,
            url_contains: None,
            start_time: Some(self.start),
            end_time: Some(self.end),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngagedTimeResponse {
    #[serde(flatten)]
    pub engagement: EngagedTimeMetric,
    pub deep_work: DeepWorkSessionsResponse,
    pub top_domains: Vec<TopDomain>,
    pub deep_work_top_domains: Vec<DeepWorkDomain>,
    pub focus_level: String,
    pub period: String,
}

/// Checks `token` and maps a trip to `AppError::Cancelled`. Call between
/// sub-query stages so long-running windows abort promptly.
fn check_cancelled(token: &CancellationToken) -> Result<(), AppError> {
    if token.is_cancelled() {
        Err(AppError::Cancelled)
    } else {
        Ok(())
    }
}

/// `GET /metrics/tracked-time` (C2, by-session variant).
pub async fn tracked_time_by_session(
    db: &Database,
    window: &Window,
    max_span_days: i64,
    token: &CancellationToken,
) -> Result<TrackedTimeMetric, AppError> {
    window.validate(max_span_days)?;
    check_cancelled(token)?;
    let events = db.query_all(&window.filter()).await?;
    check_cancelled(token)?;
    Ok(crate::analytics::sessionizer::tracked_time_by_session(&events))
}

/// `GET /metrics/tracked-time-total` (C2, window-agnostic variant).
pub async fn tracked_time_total(
    db: &Database,
    user_id: &str,
    session_id: Option<&str>,
    token: &CancellationToken,
) -> Result<TrackedTimeMetric, AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }
    check_cancelled(token)?;
    let filter = EventFilter {
        user_id: Some(user_id.to_string()),
        session_id: session_id.map(|s| s.to_string()),
        ..Default::default()
    };
    let events = db.query_all(&filter).await?;
    check_cancelled(token)?;
    Ok(crate::analytics::sessionizer::tracked_time_total(&events))
}

/// `GET /metrics/engaged-time` (C3 + C4 + C5 composite).
pub async fn engaged_time(
    db: &Database,
    window: &Window,
    max_span_days: i64,
    ai_labeling: &dyn AiLabeling,
    thresholds: &AnalyticsThresholds,
    token: &CancellationToken,
) -> Result<EngagedTimeResponse, AppError> {
    window.validate(max_span_days)?;
    check_cancelled(token)?;

    let events = db.query_all(&window.filter()).await?;
    check_cancelled(token)?;

    let engagement = engagement::engaged_time(&events, thresholds);
    check_cancelled(token)?;

    let deep_work = deep_work::detect(&events, engagement.total_tracked_minutes as f64, thresholds);
    check_cancelled(token)?;

    let top_domains = domains::top_domains(&events, domains::DEFAULT_TOP_DOMAINS_LIMIT);
    let deep_work_top_domains = domains::deep_work_top_domains(&deep_work_domain_minutes(&deep_work));

    let focus_level = match ai_labeling
        .label_focus_level(engagement.unique_domains_count, average_switches_per_hour(&deep_work))
        .await
    {
        Some(label) => label,
        None => fallback_focus_level(engagement.unique_domains_count).to_string(),
    };

    Ok(EngagedTimeResponse {
        engagement,
        deep_work,
        top_domains,
        deep_work_top_domains,
        focus_level,
        period: crate::timezone::period_label(window.start, window.end),
    })
}

/// `GET /metrics/deep-work-sessions` (C4 full detail).
pub async fn deep_work_sessions(
    db: &Database,
    window: &Window,
    max_span_days: i64,
    thresholds: &AnalyticsThresholds,
    token: &CancellationToken,
) -> Result<DeepWorkSessionsResponse, AppError> {
    window.validate(max_span_days)?;
    check_cancelled(token)?;
    let events = db.query_all(&window.filter()).await?;
    check_cancelled(token)?;
    let total_tracked_minutes = engagement::engaged_time(&events, thresholds).total_tracked_minutes as f64;
    check_cancelled(token)?;
    Ok(deep_work::detect(&events, total_tracked_minutes, thresholds))
}

/// `GET /behaviors/top-domains` (C5). Accepts an optional window so callers
/// can scope the ranking the same way the other Analytics endpoints do.
pub async fn top_domains(
    db: &Database,
    user_id: &str,
    session_id: Option<&str>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    limit: usize,
    token: &CancellationToken,
) -> Result<Vec<TopDomain>, AppError> {
    if user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }
    check_cancelled(token)?;
    let filter = EventFilter {
        user_id: Some(user_id.to_string()),
        session_id: session_id.map(|s| s.to_string()),
        start_time,
        end_time,
        ..Default::default()
    };
    let events = db.query_all(&filter).await?;
    check_cancelled(token)?;
    Ok(domains::top_domains(&events, limit))
}

fn deep_work_domain_minutes(
    response: &DeepWorkSessionsResponse,
) -> std::collections::HashMap<String, (f64, i64)> {
    let mut map: std::collections::HashMap<String, (f64, i64)> = std::collections::HashMap::new();
    for block in &response.blocks {
        if let Some(domain) = &block.dominant_domain {
            let entry = map.entry(domain.clone()).or_insert((0.0, 0));
            entry.0 += block.duration_minutes;
            entry.1 += 1;
        }
    }
    map
}

fn average_switches_per_hour(response: &DeepWorkSessionsResponse) -> f64 {
    if response.blocks.is_empty() {
        return 0.0;
    }
    let total: f64 = response.blocks.iter().map(|b| b.switches_per_hour).sum();
    total / response.blocks.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_rejects_empty_user_id() {
        let window = Window {
            user_id: String::new(),
            start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            session_id: None,
        };
        assert!(window.validate(90).is_err());
    }

    #[test]
    fn window_rejects_end_before_start() {
        let window = Window {
            user_id: "u1".to_string(),
            start: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            session_id: None,
        };
        assert!(window.validate(90).is_err());
    }

    #[test]
    fn window_rejects_span_over_ceiling() {
        let window = Window {
            user_id: "u1".to_string(),
            start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            session_id: None,
        };
        assert!(window.validate(90).is_err());
    }

    #[test]
    fn window_accepts_valid_span() {
        let window = Window {
            user_id: "u1".to_string(),
            start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            session_id: None,
        };
        assert!(window.validate(90).is_ok());
    }
}
