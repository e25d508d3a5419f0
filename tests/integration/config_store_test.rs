use tempfile::TempDir;

use workpulse::core::config::ConfigStore;
use workpulse::core::monitor::{AlertRule, Categorizer, ProcessFilter, RuleKind};

#[test]
fn missing_documents_are_created_with_defaults() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::open(dir.path()).unwrap();

    let filter = store.load_filter();
    assert!(filter.excluded_processes.contains("systemd"));
    let categories = store.load_categories();
    assert!(categories.keywords.contains_key("development"));
    let rules = store.load_alert_rules();
    assert!(rules.iter().any(|r| r.name == "High CPU Usage"));

    // The defaults were persisted immediately.
    assert!(dir.path().join("filter.json").exists());
    assert!(dir.path().join("categories.json").exists());
    assert!(dir.path().join("alerts.json").exists());
}

#[test]
fn corrupt_document_is_replaced_with_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("filter.json"), "{not valid json").unwrap();

    let store = ConfigStore::open(dir.path()).unwrap();
    let filter = store.load_filter();
    assert!(filter.cpu_threshold.is_some());

    // The broken file was rewritten with a readable document.
    let raw = std::fs::read_to_string(dir.path().join("filter.json")).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
}

#[test]
fn filter_settings_round_trip_through_the_store() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::open(dir.path()).unwrap();

    let mut filter = ProcessFilter::new(store.load_filter());
    filter.exclude_process("topsecret");
    filter.set_priority("cargo", 5).unwrap();
    filter.set_cpu_threshold(Some(2.5)).unwrap();
    store.save_filter(filter.settings()).unwrap();

    let reloaded = store.load_filter();
    assert!(reloaded.excluded_processes.contains("topsecret"));
    assert_eq!(reloaded.priority_processes.get("cargo"), Some(&5));
    assert_eq!(reloaded.cpu_threshold, Some(2.5));
}

#[test]
fn category_rules_round_trip_through_the_store() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::open(dir.path()).unwrap();

    let mut categorizer = Categorizer::new(store.load_categories());
    categorizer.set_override("ghidra", "security");
    categorizer.add_keyword("security", "wireshark");
    categorizer.add_pattern("security", "^nmap").unwrap();
    store.save_categories(categorizer.rules()).unwrap();

    let reloaded = Categorizer::new(store.load_categories());
    assert_eq!(reloaded.categorize("ghidra"), "security");
    assert_eq!(reloaded.categorize("wireshark-gtk"), "security");
    assert_eq!(reloaded.categorize("nmap-scan"), "security");
}

#[test]
fn alert_rules_round_trip_preserving_kind_parameters() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::open(dir.path()).unwrap();

    let mut rules = store.load_alert_rules();
    rules.push(AlertRule::new(
        "Compile Watch",
        "rustc has been busy for a while",
        RuleKind::ProcessPresence {
            process_name: "rustc".to_string(),
            cpu_threshold: Some(50.0),
            duration_secs: Some(120),
        },
    ));
    store.save_alert_rules(&rules).unwrap();

    let reloaded = store.load_alert_rules();
    let rule = reloaded
        .iter()
        .find(|r| r.name == "Compile Watch")
        .expect("saved rule");
    match &rule.kind {
        RuleKind::ProcessPresence {
            process_name,
            cpu_threshold,
            duration_secs,
        } => {
            assert_eq!(process_name, "rustc");
            assert_eq!(*cpu_threshold, Some(50.0));
            assert_eq!(*duration_secs, Some(120));
        }
        other => panic!("unexpected kind: {other:?}"),
    }
}
