use chrono::{DateTime, Duration as ChronoDuration, Utc};

use workpulse::core::monitor::{SessionEvent, SessionKind, SessionTracker};

fn at(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    base + ChronoDuration::seconds(secs)
}

#[test]
fn a_morning_of_work_with_two_breaks_adds_up() {
    let mut tracker = SessionTracker::new(40 * 60);
    let base = Utc::now();
    let mut records = Vec::new();

    // Tick every 60 seconds for two hours; idle during two windows.
    for minute in 0..120 {
        let idle = (30..40).contains(&minute) || (80..95).contains(&minute);
        for event in tracker.tick(at(base, minute * 60), idle) {
            if let SessionEvent::IntervalClosed { record } = event {
                records.push(record);
            }
        }
    }

    let stats = tracker.stats(at(base, 119 * 60));
    assert_eq!(
        stats.total_work_secs + stats.total_break_secs,
        119 * 60,
        "accumulators must cover the whole wall-clock span"
    );
    // Two breaks of 10 and 15 minutes.
    assert_eq!(stats.total_break_secs, 25 * 60);
    assert!(stats.focus_ratio > 0.7 && stats.focus_ratio < 0.85);

    // Working->Break->Working twice: four closed intervals so far.
    assert_eq!(records.len(), 4);
    assert_eq!(
        records
            .iter()
            .filter(|r| r.kind == SessionKind::Break)
            .count(),
        2
    );

    // Shutdown closes the final working interval.
    let (last, final_stats) = tracker.shutdown(at(base, 120 * 60));
    assert_eq!(last.unwrap().kind, SessionKind::Working);
    assert_eq!(final_stats.session_count, 5);
    assert_eq!(
        final_stats.total_work_secs + final_stats.total_break_secs,
        120 * 60
    );
}

#[test]
fn break_reminder_fires_only_during_long_working_stretches() {
    let mut tracker = SessionTracker::new(30 * 60);
    let base = Utc::now();

    tracker.tick(base, false);
    assert!(!tracker.should_take_break(at(base, 29 * 60)));
    assert!(tracker.should_take_break(at(base, 31 * 60)));

    // The reminder is a signal, not a transition: still Working.
    let stats = tracker.stats(at(base, 31 * 60));
    assert_eq!(stats.current_kind, Some(SessionKind::Working));

    // Going idle resets the continuous-work clock.
    tracker.tick(at(base, 32 * 60), true);
    tracker.tick(at(base, 35 * 60), false);
    assert!(!tracker.should_take_break(at(base, 36 * 60)));
}
