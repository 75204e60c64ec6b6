//! C5: Domain Analyzer — URL→domain extraction and ranking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Event;

pub const DEFAULT_TOP_DOMAINS_LIMIT: usize = 10;
pub const MAX_TOP_DOMAINS_LIMIT: usize = 50;

/// Extracts the domain from a URL per the single rule in the data model:
/// scheme-aware authority extraction for `http(s)://`, else the substring
/// before the first `/`. Returns `None` for an empty result.
pub fn extract_domain(url: &str) -> Option<String> {
    let rest = if let Some(stripped) = url.strip_prefix("https://") {
        stripped
    } else if let Some(stripped) = url.strip_prefix("http://") {
        stripped
    } else {
        url
    };

    let domain = match rest.find('/') {
        Some(idx) => &rest[..idx],
        None => rest,
    };

    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopDomain {
    pub domain: String,
    pub events_count: i64,
    pub active_minutes: i64,
    pub percentage: f64,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
}

/// Ranks domains by `events_count DESC, active_minutes DESC`. `limit` is
/// clamped to `[1, MAX_TOP_DOMAINS_LIMIT]`.
pub fn top_domains(events: &[Event], limit: usize) -> Vec<TopDomain> {
    let limit = limit.clamp(1, MAX_TOP_DOMAINS_LIMIT);

    struct Acc {
        events_count: i64,
        minutes: std::collections::HashSet<DateTime<Utc>>,
        first_visit: DateTime<Utc>,
        last_visit: DateTime<Utc>,
    }

    let mut by_domain: HashMap<String, Acc> = HashMap::new();
    let mut total_events: i64 = 0;

    for event in events {
        let Some(domain) = extract_domain(&event.url) else {
            continue;
        };
        total_events += 1;
        let minute = floor_to_minute(event.timestamp);
        let entry = by_domain.entry(domain).or_insert_with(|| Acc {
            events_count: 0,
            minutes: std::collections::HashSet::new(),
            first_visit: event.timestamp,
            last_visit: event.timestamp,
        });
        entry.events_count += 1;
        entry.minutes.insert(minute);
        if event.timestamp < entry.first_visit {
            entry.first_visit = event.timestamp;
        }
        if event.timestamp > entry.last_visit {
            entry.last_visit = event.timestamp;
        }
    }

    let mut ranked: Vec<TopDomain> = by_domain
        .into_iter()
        .map(|(domain, acc)| TopDomain {
            domain,
            events_count: acc.events_count,
            active_minutes: acc.minutes.len() as i64,
            percentage: if total_events > 0 {
                round2(acc.events_count as f64 / total_events as f64 * 100.0)
            } else {
                0.0
            },
            first_visit: acc.first_visit,
            last_visit: acc.last_visit,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.events_count
            .cmp(&a.events_count)
            .then_with(|| b.active_minutes.cmp(&a.active_minutes))
            .then_with(|| a.domain.cmp(&b.domain))
    });

    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeepWorkDomain {
    pub domain: String,
    pub minutes: f64,
    pub blocks_count: i64,
}

/// Top 3 domains ranked by summed deep-work block duration.
/// `domain_minutes` maps domain → (total minutes, contributing block count),
/// supplied by the deep-work detector which already knows the per-block
/// dominant domain.
pub fn deep_work_top_domains(domain_minutes: &HashMap<String, (f64, i64)>) -> Vec<DeepWorkDomain> {
    let mut ranked: Vec<DeepWorkDomain> = domain_minutes
        .iter()
        .map(|(domain, (minutes, blocks_count))| DeepWorkDomain {
            domain: domain.clone(),
            minutes: round2(*minutes),
            blocks_count: *blocks_count,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.minutes
            .partial_cmp(&a.minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    ranked.truncate(3);
    ranked
}

pub fn floor_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    let floored_secs = ts.timestamp() - ts.timestamp().rem_euclid(60);
    DateTime::<Utc>::from_timestamp(floored_secs, 0).unwrap_or(ts)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_domain_from_https_url() {
        assert_eq!(
            extract_domain("https://example.com/path/to/page"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn extracts_domain_from_http_url_without_path() {
        assert_eq!(extract_domain("http://example.com"), Some("example.com".to_string()));
    }

    #[test]
    fn falls_back_to_substring_before_first_slash() {
        assert_eq!(
            extract_domain("example.com/some/path"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn excludes_empty_domain() {
        assert_eq!(extract_domain("https:///no-authority"), None);
        assert_eq!(extract_domain(""), None);
    }

    #[test]
    fn ranks_by_events_count_then_active_minutes() {
        use crate::store::NewEvent;
        let mk = |url: &str, minute_offset: i64| crate::store::Event {
            event_id: uuid::Uuid::new_v4(),
            session_id: "s".to_string(),
            user_id: Some("u".to_string()),
            user_name: None,
            timestamp: chrono::DateTime::<Utc>::from_timestamp(1_700_000_000 + minute_offset * 60, 0)
                .unwrap(),
            event_type: "click".to_string(),
            url: url.to_string(),
            x: Some(1),
            y: Some(1),
            key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let _ = NewEvent {
            session_id: String::new(),
            user_id: None,
            user_name: None,
            timestamp: Utc::now(),
            event_type: String::new(),
            url: String::new(),
            x: None,
            y: None,
            key: None,
        };

        let events = vec![
            mk("https://a.com/x", 0),
            mk("https://a.com/y", 1),
            mk("https://b.com/x", 2),
        ];
        let ranked = top_domains(&events, 10);
        assert_eq!(ranked[0].domain, "a.com");
        assert_eq!(ranked[0].events_count, 2);
        assert_eq!(ranked[1].domain, "b.com");
    }
}
