use behavior_analytics_api::analytics::AnalyticsThresholds;
use behavior_analytics_api::store::Event;
use chrono::{DateTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uuid::Uuid;

fn synthetic_events(count: i64) -> Vec<Event> {
    (0..count)
        .map(|i| {
            let url = if i % 3 == 0 {
                "https://github.com/org/repo"
            } else if i % 3 == 1 {
                "https://docs.rs/crate"
            } else {
                "https://news.ycombinator.com"
            };
            Event {
                event_id: Uuid::new_v4(),
                session_id: "bench-session".to_string(),
                user_id: Some("bench-user".to_string()),
                user_name: None,
                timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + i * 45, 0).unwrap(),
                event_type: "click".to_string(),
                url: url.to_string(),
                x: Some(100),
                y: Some(200),
                key: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        })
        .collect()
}

fn deep_work_detection_benchmark(c: &mut Criterion) {
    let events = synthetic_events(20_000);
    let thresholds = AnalyticsThresholds::default();

    c.bench_function("deep_work_detect_20k_events", |b| {
        b.iter(|| {
            behavior_analytics_api::analytics::deep_work::detect(
                black_box(&events),
                black_box(10_000.0),
                black_box(&thresholds),
            )
        })
    });
}

criterion_group!(benches, deep_work_detection_benchmark);
criterion_main!(benches);
