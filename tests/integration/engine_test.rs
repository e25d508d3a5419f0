use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use workpulse::core::config::ConfigStore;
use workpulse::core::monitor::{EngineConfig, MonitorEngine};
use workpulse::core::persist::MemoryGateway;

fn quiet_engine(dir: &TempDir, gateway: Arc<MemoryGateway>) -> MonitorEngine {
    let store = ConfigStore::open(dir.path()).unwrap();
    // No alert rules: keep the alert loop silent during the test.
    store.save_alert_rules(&[]).unwrap();

    let config = EngineConfig {
        sample_interval: Duration::from_secs(1),
        alert_interval: Duration::from_secs(3600),
        idle_threshold_secs: 300,
        break_threshold_secs: 40 * 60,
    };
    MonitorEngine::new(gateway, ConfigStore::open(dir.path()).unwrap(), config)
}

#[test]
fn start_is_idempotent_and_stop_reports_aggregates() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(MemoryGateway::new(1));
    let mut engine = quiet_engine(&dir, Arc::clone(&gateway));

    assert!(!engine.is_running());
    engine.start().unwrap();
    assert!(engine.is_running());
    // Second start is a no-op.
    engine.start().unwrap();

    // Let the sampler run a couple of cycles.
    std::thread::sleep(Duration::from_millis(1800));

    // Eventually-consistent management writes do not disturb the loops.
    engine.set_idle_threshold(600);
    engine.set_break_threshold(30 * 60);

    let stats = engine.stop().expect("running engine reports aggregates");
    assert!(!engine.is_running());
    assert!(stats.focus_ratio >= 0.0 && stats.focus_ratio <= 1.0);

    // A stopped engine has nothing further to report.
    assert!(engine.stop().is_none());
}

#[test]
fn snapshot_is_published_and_readable_while_running() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(MemoryGateway::new(1));
    let mut engine = quiet_engine(&dir, Arc::clone(&gateway));

    engine.start().unwrap();
    std::thread::sleep(Duration::from_millis(1800));

    let snapshot = engine.latest_snapshot();
    // The sampler stamped at least one real snapshot by now.
    assert!(snapshot.resources.memory.total_bytes > 0 || snapshot.processes.is_empty());

    engine.stop();
}

#[test]
fn management_mutations_persist_documents() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(MemoryGateway::new(1));
    let engine = quiet_engine(&dir, gateway);

    engine
        .update_filter(|filter| {
            filter.exclude_process("noisy-daemon");
            Ok(())
        })
        .unwrap();
    engine
        .update_categories(|categorizer| {
            categorizer.set_override("cargo", "development");
            Ok(())
        })
        .unwrap();

    let store = ConfigStore::open(dir.path()).unwrap();
    assert!(store
        .load_filter()
        .excluded_processes
        .contains("noisy-daemon"));
    assert_eq!(
        store.load_categories().overrides.get("cargo"),
        Some(&"development".to_string())
    );

    // Alert rule management rewrites the alerts document.
    use workpulse::core::monitor::{AlertRule, RuleKind};
    engine
        .add_alert_rule(AlertRule::new(
            "Idle Watch",
            "idle for 10 minutes",
            RuleKind::Idle { idle_minutes: 10 },
        ))
        .unwrap();
    assert!(store
        .load_alert_rules()
        .iter()
        .any(|rule| rule.name == "Idle Watch"));
    assert!(engine.remove_alert_rule("Idle Watch").unwrap());
    assert!(!store
        .load_alert_rules()
        .iter()
        .any(|rule| rule.name == "Idle Watch"));
}
