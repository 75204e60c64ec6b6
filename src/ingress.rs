//! C7: Ingress Adapter — validates raw client submissions before they reach
//! the event store.

use crate::store::{NewEvent, RECOGNIZED_EVENT_TYPES};

const COORD_MIN: i32 = 0;
const COORD_MAX: i32 = 10_000;

/// Validates a single submitted event: recognized type, non-empty url and
/// session id, click coordinate bounds. Returns the offending reason on
/// failure so callers can report it verbatim.
pub fn validate_event(event: &NewEvent) -> Result<(), String> {
    if !RECOGNIZED_EVENT_TYPES.contains(&event.event_type.as_str()) {
        return Err(format!("unrecognized event type '{}'", event.event_type));
    }
    if event.url.trim().is_empty() {
        return Err("url must not be empty".to_string());
    }
    if event.session_id.trim().is_empty() {
        return Err("session_id must not be empty".to_string());
    }

    if event.event_type == "click" {
        match (event.x, event.y) {
            (Some(x), Some(y)) => {
                if !(COORD_MIN..=COORD_MAX).contains(&x) || !(COORD_MIN..=COORD_MAX).contains(&y) {
                    return Err(format!(
                        "click coordinates must be within [{COORD_MIN}, {COORD_MAX}]"
                    ));
                }
            }
            _ => return Err("click events require both x and y".to_string()),
        }
    } else {
        if let Some(x) = event.x {
            if !(COORD_MIN..=COORD_MAX).contains(&x) {
                return Err(format!("x must be within [{COORD_MIN}, {COORD_MAX}]"));
            }
        }
        if let Some(y) = event.y {
            if !(COORD_MIN..=COORD_MAX).contains(&y) {
                return Err(format!("y must be within [{COORD_MIN}, {COORD_MAX}]"));
            }
        }
    }

    Ok(())
}

/// Validates a batch submission (atomic, 1..=1000 events). Returns the
/// index and reason of the first invalid event.
pub fn validate_batch(events: &[NewEvent]) -> Result<(), String> {
    if events.is_empty() {
        return Err("batch must contain at least 1 event".to_string());
    }
    if events.len() > crate::store::MAX_BATCH_SIZE {
        return Err(format!(
            "batch must contain at most {} events, got {}",
            crate::store::MAX_BATCH_SIZE,
            events.len()
        ));
    }
    for (index, event) in events.iter().enumerate() {
        if let Err(reason) = validate_event(event) {
            return Err(format!("event at index {index}: {reason}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(event_type: &str) -> NewEvent {
        NewEvent {
            session_id: "sess-1".to_string(),
            user_id: Some("user-1".to_string()),
            user_name: None,
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            url: "https://example.com/page".to_string(),
            x: None,
            y: None,
            key: None,
        }
    }

    #[test]
    fn rejects_unrecognized_event_type() {
        let event = sample("mousewheel");
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn rejects_empty_url() {
        let mut event = sample("click");
        event.url = "   ".to_string();
        event.x = Some(1);
        event.y = Some(1);
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn click_requires_coordinates() {
        let event = sample("click");
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn click_accepts_in_range_coordinates() {
        let mut event = sample("click");
        event.x = Some(100);
        event.y = Some(200);
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn click_rejects_out_of_range_coordinates() {
        let mut event = sample("click");
        event.x = Some(-1);
        event.y = Some(200);
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn non_click_allows_missing_coordinates() {
        let event = sample("focus");
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn batch_rejects_empty() {
        assert!(validate_batch(&[]).is_err());
    }

    #[test]
    fn batch_rejects_oversized() {
        let events: Vec<NewEvent> = (0..1001).map(|_| sample("focus")).collect();
        assert!(validate_batch(&events).is_err());
    }

    #[test]
    fn batch_reports_offending_index() {
        let mut events = vec![sample("focus"), sample("focus")];
        events[1].url = String::new();
        let err = validate_batch(&events).unwrap_err();
        assert!(err.contains("index 1"));
    }
}
