use chrono::{Duration as ChronoDuration, Utc};
use tempfile::TempDir;

use workpulse::core::monitor::{
    MemoryUsage, ProcessSample, ResourceSample, SessionKind, SessionRecord,
};
use workpulse::core::persist::{JsonlGateway, PersistenceGateway};

fn sample(name: &str, category: &str) -> ProcessSample {
    ProcessSample {
        pid: 100,
        name: name.to_string(),
        cpu_percent: 1.5,
        memory_percent: 0.8,
        create_time: Utc::now(),
        category: category.to_string(),
        priority: 1,
    }
}

#[test]
fn category_aggregate_counts_interval_per_batch() {
    let dir = TempDir::new().unwrap();
    let gateway = JsonlGateway::open(dir.path(), 5).unwrap();

    gateway
        .insert_process_samples(&[sample("code", "development"), sample("vlc", "entertainment")])
        .unwrap();
    gateway
        .insert_process_samples(&[sample("code", "development")])
        .unwrap();

    let aggregate = gateway.read_category_aggregate(24).unwrap();
    assert_eq!(aggregate.get("development"), Some(&10));
    assert_eq!(aggregate.get("entertainment"), Some(&5));
}

#[test]
fn latest_resource_sample_returns_the_newest() {
    let dir = TempDir::new().unwrap();
    let gateway = JsonlGateway::open(dir.path(), 5).unwrap();

    assert!(gateway.latest_resource_sample().unwrap().is_none());

    let mut first = ResourceSample::empty(Utc::now());
    first.cpu_percent = 10.0;
    let mut second = ResourceSample::empty(Utc::now());
    second.cpu_percent = 55.0;
    second.memory = MemoryUsage {
        total_bytes: 8 << 30,
        available_bytes: 2 << 30,
        percent: 75.0,
    };

    gateway.insert_resource_sample(&first).unwrap();
    gateway.insert_resource_sample(&second).unwrap();

    let latest = gateway.latest_resource_sample().unwrap().unwrap();
    assert_eq!(latest.cpu_percent, 55.0);
    assert_eq!(latest.memory.percent, 75.0);
}

#[test]
fn session_summary_sums_records_within_the_window() {
    let dir = TempDir::new().unwrap();
    let gateway = JsonlGateway::open(dir.path(), 5).unwrap();
    let now = Utc::now();

    gateway
        .record_session(&SessionRecord {
            start: now - ChronoDuration::hours(2),
            end: now - ChronoDuration::hours(1),
            kind: SessionKind::Working,
            focus_secs: 3600,
            break_secs: 0,
        })
        .unwrap();
    gateway
        .record_session(&SessionRecord {
            start: now - ChronoDuration::minutes(50),
            end: now - ChronoDuration::minutes(40),
            kind: SessionKind::Break,
            focus_secs: 0,
            break_secs: 600,
        })
        .unwrap();
    // An old record outside the window is ignored.
    gateway
        .record_session(&SessionRecord {
            start: now - ChronoDuration::hours(50),
            end: now - ChronoDuration::hours(49),
            kind: SessionKind::Working,
            focus_secs: 3600,
            break_secs: 0,
        })
        .unwrap();

    let (focus, rest) = gateway.session_summary(24).unwrap();
    assert_eq!(focus, 3600);
    assert_eq!(rest, 600);
}

#[test]
fn idle_periods_are_appended() {
    let dir = TempDir::new().unwrap();
    let gateway = JsonlGateway::open(dir.path(), 5).unwrap();
    let now = Utc::now();

    gateway
        .record_idle_period(now - ChronoDuration::minutes(10), now)
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("idle.jsonl")).unwrap();
    assert_eq!(raw.lines().count(), 1);
}

#[test]
fn corrupt_lines_are_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let gateway = JsonlGateway::open(dir.path(), 5).unwrap();

    gateway
        .insert_process_samples(&[sample("code", "development")])
        .unwrap();
    // Simulate a torn write from a crashed process.
    std::fs::OpenOptions::new()
        .append(true)
        .open(dir.path().join("samples.jsonl"))
        .map(|mut f| std::io::Write::write_all(&mut f, b"{\"time\": \"trunc").unwrap())
        .unwrap();

    let aggregate = gateway.read_category_aggregate(24).unwrap();
    assert_eq!(aggregate.get("development"), Some(&5));
}
