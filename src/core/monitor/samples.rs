use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A process as read from the OS process table, before filtering.
///
/// This is the input side of the filter: retained observations are
/// classified and promoted to [`ProcessSample`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessObservation {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub create_time: DateTime<Utc>,
    /// Owned by root / a system account, per the platform heuristic.
    pub system_owned: bool,
}

/// One tracked process in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub create_time: DateTime<Utc>,
    pub category: String,
    pub priority: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub percent: f32,
}

/// System-wide resource counters captured at one poll tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub timestamp: DateTime<Utc>,
}

impl ResourceSample {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            cpu_percent: 0.0,
            memory: MemoryUsage::default(),
            disk: DiskUsage::default(),
            timestamp,
        }
    }
}

/// Complete monitoring snapshot published after each sampler tick.
///
/// Snapshots are immutable once published; readers receive them through a
/// watch channel as `Arc<MonitorSnapshot>` so the sampling hot path never
/// contends with consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub processes: Vec<ProcessSample>,
    pub resources: ResourceSample,
    pub idle_seconds: u64,
    pub is_idle: bool,
}

impl MonitorSnapshot {
    /// Placeholder value used before the first sampler tick completes.
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            timestamp: now,
            processes: Vec::new(),
            resources: ResourceSample::empty(now),
            idle_seconds: 0,
            is_idle: false,
        }
    }
}
