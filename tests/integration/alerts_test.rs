use chrono::{Duration as ChronoDuration, Utc};

use workpulse::core::monitor::{
    AlertEngine, AlertRule, MonitorSnapshot, ProcessSample, ResourceKind, RuleKind, MAX_HISTORY,
};
use workpulse::core::persist::{MemoryGateway, PersistenceGateway};

fn snapshot_with_process(name: &str, pid: u32, cpu: f32) -> MonitorSnapshot {
    let mut snapshot = MonitorSnapshot::empty();
    snapshot.processes.push(ProcessSample {
        pid,
        name: name.to_string(),
        cpu_percent: cpu,
        memory_percent: 1.0,
        create_time: Utc::now(),
        category: "uncategorized".to_string(),
        priority: 1,
    });
    snapshot
}

#[test]
fn presence_duration_fires_after_continuous_observation() {
    let gateway = MemoryGateway::new(5);
    let mut rule = AlertRule::new(
        "chrome-watch",
        "chrome is lingering",
        RuleKind::ProcessPresence {
            process_name: "chrome".to_string(),
            cpu_threshold: None,
            duration_secs: Some(60),
        },
    );
    rule.cooldown_secs = 0;
    let mut engine = AlertEngine::new(vec![rule]);

    let t0 = Utc::now();
    let with_chrome = snapshot_with_process("chrome", 42, 3.0);
    let without_chrome = MonitorSnapshot::empty();

    // First sighting starts the clock; not enough presence yet.
    assert!(engine.check_all(&with_chrome, 0, &gateway, t0).is_empty());
    assert!(engine
        .check_all(&with_chrome, 0, &gateway, t0 + ChronoDuration::seconds(30))
        .is_empty());

    // 61 seconds of continuous presence fires.
    let fired = engine.check_all(&with_chrome, 0, &gateway, t0 + ChronoDuration::seconds(61));
    assert_eq!(fired.len(), 1);

    // Disappearance clears the tracking...
    assert!(engine
        .check_all(
            &without_chrome,
            0,
            &gateway,
            t0 + ChronoDuration::seconds(120)
        )
        .is_empty());

    // ...so reappearance restarts the duration clock.
    assert!(engine
        .check_all(&with_chrome, 0, &gateway, t0 + ChronoDuration::seconds(130))
        .is_empty());
    assert!(engine
        .check_all(&with_chrome, 0, &gateway, t0 + ChronoDuration::seconds(170))
        .is_empty());
    let fired = engine.check_all(&with_chrome, 0, &gateway, t0 + ChronoDuration::seconds(195));
    assert_eq!(fired.len(), 1);
}

#[test]
fn presence_cpu_threshold_gates_firing() {
    let gateway = MemoryGateway::new(5);
    let rule = AlertRule::new(
        "heavy-browser",
        "browser is burning cpu",
        RuleKind::ProcessPresence {
            process_name: "firefox".to_string(),
            cpu_threshold: Some(50.0),
            duration_secs: None,
        },
    );
    let mut engine = AlertEngine::new(vec![rule]);
    let now = Utc::now();

    let calm = snapshot_with_process("firefox", 7, 10.0);
    assert!(engine.check_all(&calm, 0, &gateway, now).is_empty());

    let busy = snapshot_with_process("firefox", 7, 80.0);
    assert_eq!(engine.check_all(&busy, 0, &gateway, now).len(), 1);
}

#[test]
fn bare_presence_rule_fires_on_sight() {
    let gateway = MemoryGateway::new(5);
    let rule = AlertRule::new(
        "no-games",
        "a game is running",
        RuleKind::ProcessPresence {
            process_name: "steam".to_string(),
            cpu_threshold: None,
            duration_secs: None,
        },
    );
    let mut engine = AlertEngine::new(vec![rule]);

    let fired = engine.check_all(
        &snapshot_with_process("steamwebhelper", 9, 0.5),
        0,
        &gateway,
        Utc::now(),
    );
    assert_eq!(fired.len(), 1);
}

#[test]
fn category_budget_fires_at_the_threshold() {
    // Each persisted batch counts one interval of tracked time per sample;
    // a 3420s interval makes two batches 1.9h and three batches 2.85h.
    let gateway = MemoryGateway::new(3420);
    let sample = snapshot_with_process("netflix", 11, 1.0);
    let mut entertainment = sample.processes[0].clone();
    entertainment.category = "entertainment".to_string();

    let rule = AlertRule::new(
        "Entertainment Limit",
        "Entertainment time exceeds 2 hours",
        RuleKind::CategoryBudget {
            category: "entertainment".to_string(),
            hours_threshold: 2.0,
            window_hours: 24,
        },
    );
    let mut engine = AlertEngine::new(vec![rule]);
    let snapshot = MonitorSnapshot::empty();

    gateway
        .insert_process_samples(std::slice::from_ref(&entertainment))
        .unwrap();
    gateway
        .insert_process_samples(std::slice::from_ref(&entertainment))
        .unwrap();

    // 1.9 tracked hours: below the budget.
    assert!(engine
        .check_all(&snapshot, 0, &gateway, Utc::now())
        .is_empty());

    gateway
        .insert_process_samples(std::slice::from_ref(&entertainment))
        .unwrap();

    // 2.85 tracked hours: over the budget.
    let fired = engine.check_all(&snapshot, 0, &gateway, Utc::now());
    assert_eq!(fired.len(), 1);
}

#[test]
fn resource_rules_cover_memory_and_disk() {
    let gateway = MemoryGateway::new(5);
    let mut engine = AlertEngine::new(vec![
        AlertRule::new(
            "mem",
            "memory high",
            RuleKind::Resource {
                resource: ResourceKind::Memory,
                threshold: 85.0,
            },
        ),
        AlertRule::new(
            "disk",
            "disk high",
            RuleKind::Resource {
                resource: ResourceKind::Disk,
                threshold: 90.0,
            },
        ),
    ]);

    let mut snapshot = MonitorSnapshot::empty();
    snapshot.resources.memory.percent = 92.0;
    snapshot.resources.disk.percent = 50.0;

    let fired = engine.check_all(&snapshot, 0, &gateway, Utc::now());
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].rule_name, "mem");
}

#[test]
fn history_is_capped_at_the_limit() {
    let gateway = MemoryGateway::new(5);
    let mut rule = AlertRule::new(
        "always",
        "fires every check",
        RuleKind::Resource {
            resource: ResourceKind::Cpu,
            threshold: 0.0,
        },
    );
    rule.cooldown_secs = 0;
    let mut engine = AlertEngine::new(vec![rule]);
    let snapshot = MonitorSnapshot::empty();

    for _ in 0..(MAX_HISTORY + 20) {
        engine.check_all(&snapshot, 0, &gateway, Utc::now());
    }

    assert_eq!(engine.history(usize::MAX).len(), MAX_HISTORY);
    // A small limit returns only the most recent slice.
    assert_eq!(engine.history(10).len(), 10);
}
