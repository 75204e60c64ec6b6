//! Display-only timezone formatting. All storage and computation stays in
//! UTC; only human-readable labels pass through here.

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Almaty;

/// Formats a `[start, end]` window as a human-readable period label, e.g.
/// `"2025-07-10 → 2025-07-11"`, in the Asia/Almaty display timezone.
pub fn period_label(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{} \u{2192} {}",
        start.with_timezone(&Almaty).format("%Y-%m-%d"),
        end.with_timezone(&Almaty).format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_period_label_in_display_timezone() {
        let start = Utc.with_ymd_and_hms(2025, 7, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 7, 11, 0, 0, 0).unwrap();
        let label = period_label(start, end);
        assert!(label.contains("2025-07-10"));
        assert!(label.contains("2025-07-11"));
    }
}
