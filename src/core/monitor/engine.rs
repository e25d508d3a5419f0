//! The monitoring engine runtime.
//!
//! Owns a dedicated Tokio runtime with two independently-scheduled loops: the
//! sampler (process table + idle + session tracking) and the alert checker.
//! The latest snapshot is published through a watch channel so readers never
//! contend with the sampling hot path; everything else lives behind small
//! locks inside one shared struct.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::core::config::ConfigStore;
use crate::core::persist::PersistenceGateway;
use crate::error::Result;
use crate::platform;

use super::actions::{default_actions, AlertAction};
use super::alerts::{AlertEngine, AlertEvent, AlertRule};
use super::categorizer::Categorizer;
use super::filter::ProcessFilter;
use super::idle::IdleOracle;
use super::sampler::Sampler;
use super::samples::{MonitorSnapshot, ProcessSample};
use super::session::{SessionEvent, SessionStats, SessionTracker};

pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_ALERT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_IDLE_THRESHOLD_SECS: u64 = 300;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_interval: Duration,
    pub alert_interval: Duration,
    pub idle_threshold_secs: u64,
    pub break_threshold_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(DEFAULT_SAMPLE_INTERVAL_SECS),
            alert_interval: Duration::from_secs(DEFAULT_ALERT_INTERVAL_SECS),
            idle_threshold_secs: DEFAULT_IDLE_THRESHOLD_SECS,
            break_threshold_secs: super::session::DEFAULT_BREAK_THRESHOLD_SECS,
        }
    }
}

struct EngineShared {
    oracle: Mutex<IdleOracle>,
    sessions: Mutex<SessionTracker>,
    filter: RwLock<ProcessFilter>,
    categorizer: RwLock<Categorizer>,
    alerts: Mutex<AlertEngine>,
    gateway: Arc<dyn PersistenceGateway>,
    store: ConfigStore,
    /// Management writes land here; the sampler reads it every tick.
    idle_threshold_secs: AtomicU64,
    snapshot_tx: watch::Sender<Arc<MonitorSnapshot>>,
}

/// The monitoring-and-decision engine with injected collaborators.
pub struct MonitorEngine {
    shared: Arc<EngineShared>,
    snapshot_rx: watch::Receiver<Arc<MonitorSnapshot>>,
    config: EngineConfig,
    shutdown_tx: broadcast::Sender<()>,
    runtime: Option<tokio::runtime::Runtime>,
}

impl MonitorEngine {
    /// Build an engine, loading the three configuration documents from the
    /// store (compiled-in defaults replace missing or corrupt documents).
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        store: ConfigStore,
        config: EngineConfig,
    ) -> Self {
        let filter = ProcessFilter::new(store.load_filter());
        let categorizer = Categorizer::new(store.load_categories());
        let mut alerts = AlertEngine::new(store.load_alert_rules());
        for action in default_actions() {
            alerts.register_action(action);
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(MonitorSnapshot::empty()));
        let (shutdown_tx, _) = broadcast::channel(1);

        let shared = Arc::new(EngineShared {
            oracle: Mutex::new(IdleOracle::new(platform::idle_probes())),
            sessions: Mutex::new(SessionTracker::new(config.break_threshold_secs)),
            filter: RwLock::new(filter),
            categorizer: RwLock::new(categorizer),
            alerts: Mutex::new(alerts),
            gateway,
            store,
            idle_threshold_secs: AtomicU64::new(config.idle_threshold_secs),
            snapshot_tx,
        });

        Self {
            shared,
            snapshot_rx,
            config,
            shutdown_tx,
            runtime: None,
        }
    }

    /// Spawn the sampler and alert loops. A no-op while already running.
    pub fn start(&mut self) -> Result<()> {
        if self.runtime.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("workpulse-monitor")
            .build()?;

        runtime.spawn(sampler_task(
            Arc::clone(&self.shared),
            self.config.sample_interval,
            self.shutdown_tx.subscribe(),
        ));
        runtime.spawn(alert_task(
            Arc::clone(&self.shared),
            self.config.alert_interval,
            self.shutdown_tx.subscribe(),
        ));

        self.runtime = Some(runtime);
        info!(
            "monitor engine started (sample every {:?}, alerts every {:?})",
            self.config.sample_interval, self.config.alert_interval
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Cooperatively stop both loops, force-close the open session and
    /// persist it, and return the final aggregates. Returns None when the
    /// engine was not running.
    pub fn stop(&mut self) -> Option<SessionStats> {
        let runtime = self.runtime.take()?;

        let _ = self.shutdown_tx.send(());
        runtime.shutdown_timeout(STOP_TIMEOUT);

        let (record, stats) = self.shared.sessions.lock().shutdown(Utc::now());
        if let Some(record) = record {
            if let Err(err) = self.shared.gateway.record_session(&record) {
                warn!("could not persist final session: {err}");
            }
        }

        info!("monitor engine stopped");
        Some(stats)
    }

    /// The most recently published snapshot.
    pub fn latest_snapshot(&self) -> Arc<MonitorSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to snapshot updates (for presentation consumers).
    pub fn subscribe(&self) -> watch::Receiver<Arc<MonitorSnapshot>> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.shared.sessions.lock().stats(Utc::now())
    }

    pub fn should_take_break(&self) -> bool {
        self.shared.sessions.lock().should_take_break(Utc::now())
    }

    /// Report externally-observed user activity (e.g. window focus change).
    pub fn note_activity(&self) {
        let closed = self.shared.oracle.lock().update();
        if let Some((start, end)) = closed {
            if let Err(err) = self.shared.gateway.record_idle_period(start, end) {
                warn!("could not persist idle period: {err}");
            }
        }
    }

    pub fn idle_periods(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.shared.oracle.lock().idle_periods(start, end)
    }

    /// Eventually-consistent scalar write; picked up on the next tick.
    pub fn set_idle_threshold(&self, secs: u64) {
        self.shared.idle_threshold_secs.store(secs, Ordering::Relaxed);
    }

    pub fn set_break_threshold(&self, secs: u64) {
        self.shared.sessions.lock().set_break_threshold(secs);
    }

    pub fn register_action(&self, action: Box<dyn AlertAction>) {
        self.shared.alerts.lock().register_action(action);
    }

    pub fn register_rule_action(&self, rule_name: &str, action: Box<dyn AlertAction>) {
        self.shared
            .alerts
            .lock()
            .register_rule_action(rule_name, action);
    }

    pub fn alert_history(&self, limit: usize) -> Vec<AlertEvent> {
        self.shared.alerts.lock().history(limit)
    }

    pub fn alert_rules(&self) -> Vec<AlertRule> {
        self.shared.alerts.lock().rules().to_vec()
    }

    pub fn add_alert_rule(&self, rule: AlertRule) -> Result<()> {
        self.shared.alerts.lock().add_rule(rule);
        self.persist_alert_rules()
    }

    pub fn remove_alert_rule(&self, name: &str) -> Result<bool> {
        let removed = self.shared.alerts.lock().remove_rule(name);
        if removed {
            self.persist_alert_rules()?;
        }
        Ok(removed)
    }

    pub fn set_alert_enabled(&self, name: &str, enabled: bool) -> Result<bool> {
        let found = self.shared.alerts.lock().set_enabled(name, enabled);
        if found {
            self.persist_alert_rules()?;
        }
        Ok(found)
    }

    /// Apply a filter mutation and persist the whole settings document.
    pub fn update_filter<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut ProcessFilter) -> Result<()>,
    {
        let mut filter = self.shared.filter.write();
        mutate(&mut filter)?;
        self.shared.store.save_filter(filter.settings())
    }

    /// Apply a category-rules mutation and persist the whole document.
    pub fn update_categories<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Categorizer) -> Result<()>,
    {
        let mut categorizer = self.shared.categorizer.write();
        mutate(&mut categorizer)?;
        self.shared.store.save_categories(categorizer.rules())
    }

    /// Tracked seconds per category over the trailing window.
    pub fn category_summary(&self, window_hours: u32) -> Result<HashMap<String, u64>> {
        self.shared.gateway.read_category_aggregate(window_hours)
    }

    fn persist_alert_rules(&self) -> Result<()> {
        let rules = self.shared.alerts.lock().rules().to_vec();
        self.shared.store.save_alert_rules(&rules)
    }
}

impl Drop for MonitorEngine {
    fn drop(&mut self) {
        if self.runtime.is_some() {
            self.stop();
        }
    }
}

async fn sampler_task(
    shared: Arc<EngineShared>,
    sample_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut sampler = Sampler::new();

    // First CPU reading needs a baseline measurement interval.
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;

    let mut ticker = interval(sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = run_sample_cycle(&shared, &mut sampler) {
                    error!("sampling cycle failed: {err}");
                }
            }
            _ = shutdown.recv() => {
                info!("sampler loop shutting down");
                break;
            }
        }
    }
}

fn run_sample_cycle(shared: &EngineShared, sampler: &mut Sampler) -> Result<()> {
    let (observations, resources) = sampler.sample()?;

    let threshold = shared.idle_threshold_secs.load(Ordering::Relaxed);
    let idle = {
        let mut oracle = shared.oracle.lock();
        let observation = oracle.observe(threshold);
        oracle.mark_tick();
        observation
    };

    if let Some((start, end)) = idle.closed_period {
        if let Err(err) = shared.gateway.record_idle_period(start, end) {
            warn!("could not persist idle period: {err}");
        }
    }

    let processes: Vec<ProcessSample> = {
        let filter = shared.filter.read();
        let categorizer = shared.categorizer.read();
        filter
            .apply(observations)
            .into_iter()
            .map(|obs| ProcessSample {
                category: categorizer.categorize(&obs.name),
                priority: filter.priority_of(&obs.name),
                pid: obs.pid,
                name: obs.name,
                cpu_percent: obs.cpu_percent,
                memory_percent: obs.memory_percent,
                create_time: obs.create_time,
            })
            .collect()
    };

    let now = Utc::now();
    let events = shared.sessions.lock().tick(now, idle.is_idle);
    for event in events {
        match event {
            SessionEvent::SessionStarted { .. } => info!("work session started"),
            SessionEvent::BreakStarted { .. } => info!("idle detected, break started"),
            SessionEvent::BreakEnded { .. } => info!("activity resumed, break ended"),
            SessionEvent::IntervalClosed { record } => {
                if let Err(err) = shared.gateway.record_session(&record) {
                    warn!("could not persist session interval: {err}");
                }
            }
        }
    }

    let snapshot = Arc::new(MonitorSnapshot {
        timestamp: now,
        processes,
        resources,
        idle_seconds: idle.idle_seconds,
        is_idle: idle.is_idle,
    });

    if let Err(err) = shared.gateway.insert_process_samples(&snapshot.processes) {
        warn!("could not persist process samples: {err}");
    }
    if let Err(err) = shared.gateway.insert_resource_sample(&snapshot.resources) {
        warn!("could not persist resource sample: {err}");
    }

    // send() only fails with no receivers, which is fine.
    let _ = shared.snapshot_tx.send(snapshot);
    Ok(())
}

async fn alert_task(
    shared: Arc<EngineShared>,
    alert_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(alert_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The immediate first tick would only see the placeholder snapshot.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_alert_cycle(&shared);
            }
            _ = shutdown.recv() => {
                info!("alert loop shutting down");
                break;
            }
        }
    }
}

fn run_alert_cycle(shared: &EngineShared) {
    let snapshot = shared.snapshot_tx.borrow().clone();
    let idle_seconds = shared.oracle.lock().idle_seconds();
    let now = Utc::now();

    let fired = shared
        .alerts
        .lock()
        .check_all(&snapshot, idle_seconds, shared.gateway.as_ref(), now);

    for event in &fired {
        info!("alert fired: {}", event.rule_name);
    }
}
