//! Monitoring core functionality.
//!
//! This module provides the business logic of the tracker: the periodic
//! process/resource sampler, the idle oracle, the filter/prioritizer, the
//! categorizer, the work/break session state machine and the alert engine,
//! all coordinated by [`MonitorEngine`].

pub mod actions;
pub mod alerts;
pub mod categorizer;
mod engine;
pub mod filter;
pub mod idle;
mod sampler;
pub mod samples;
pub mod session;

pub use actions::{default_actions, AlertAction, DesktopNotificationAction, LogAction, SoundAction};
pub use alerts::{
    default_rules, AlertEngine, AlertEvent, AlertRule, ResourceKind, RuleKind,
    DEFAULT_COOLDOWN_SECS, MAX_HISTORY,
};
pub use categorizer::{Categorizer, CategoryRules, UNCATEGORIZED};
pub use engine::{
    EngineConfig, MonitorEngine, DEFAULT_ALERT_INTERVAL_SECS, DEFAULT_IDLE_THRESHOLD_SECS,
    DEFAULT_SAMPLE_INTERVAL_SECS,
};
pub use filter::{FilterSettings, ProcessFilter, MAX_PRIORITY, MIN_PRIORITY};
pub use idle::{IdleObservation, IdleOracle, IdleProbe};
pub use sampler::Sampler;
pub use samples::{
    DiskUsage, MemoryUsage, MonitorSnapshot, ProcessObservation, ProcessSample, ResourceSample,
};
pub use session::{
    SessionEvent, SessionKind, SessionRecord, SessionStats, SessionTracker,
    DEFAULT_BREAK_THRESHOLD_SECS,
};
