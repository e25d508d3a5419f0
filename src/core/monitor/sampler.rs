use chrono::{DateTime, Utc};
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, ProcessRefreshKind, RefreshKind, System, UpdateKind,
};

use crate::error::{Result, WorkpulseError};

use super::samples::{DiskUsage, MemoryUsage, ProcessObservation, ResourceSample};

/// Reads the live process table and system counters, once per tick.
///
/// Reads are best-effort: a process that vanished or denied access between
/// enumeration and read simply yields no observation. Only a completely
/// empty process table is treated as a fatal subsystem failure.
pub struct Sampler {
    system: System,
    disks: Disks,
}

impl Sampler {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything())
            .with_processes(
                ProcessRefreshKind::nothing()
                    .with_cpu()
                    .with_memory()
                    .with_user(UpdateKind::OnlyIfNotSet),
            );

        Self {
            system: System::new_with_specifics(refresh_kind),
            disks: Disks::new_with_refreshed_list(),
        }
    }

    /// Capture one batch of process observations plus a resource sample.
    pub fn sample(&mut self) -> Result<(Vec<ProcessObservation>, ResourceSample)> {
        self.system.refresh_all();
        self.disks.refresh(true);

        if self.system.processes().is_empty() {
            return Err(WorkpulseError::sample("process table is unavailable"));
        }

        let now = Utc::now();
        let total_memory = self.system.total_memory();

        let observations = self
            .system
            .processes()
            .values()
            .map(|proc| {
                let mem = proc.memory();
                ProcessObservation {
                    pid: proc.pid().as_u32(),
                    name: proc.name().to_string_lossy().to_string(),
                    cpu_percent: proc.cpu_usage(),
                    memory_percent: if total_memory > 0 {
                        (mem as f32 / total_memory as f32) * 100.0
                    } else {
                        0.0
                    },
                    create_time: start_time_utc(proc.start_time(), now),
                    system_owned: system_owned(proc),
                }
            })
            .collect();

        Ok((observations, self.resource_sample(now)))
    }

    fn resource_sample(&self, timestamp: DateTime<Utc>) -> ResourceSample {
        let total = self.system.total_memory();
        let available = self.system.available_memory();

        let (disk_total, disk_available) = self
            .disks
            .iter()
            .fold((0u64, 0u64), |(total, avail), disk| {
                (total + disk.total_space(), avail + disk.available_space())
            });
        let disk_used = disk_total.saturating_sub(disk_available);

        ResourceSample {
            cpu_percent: self.system.global_cpu_usage(),
            memory: MemoryUsage {
                total_bytes: total,
                available_bytes: available,
                percent: if total > 0 {
                    (total.saturating_sub(available) as f32 / total as f32) * 100.0
                } else {
                    0.0
                },
            },
            disk: DiskUsage {
                total_bytes: disk_total,
                used_bytes: disk_used,
                percent: if disk_total > 0 {
                    (disk_used as f32 / disk_total as f32) * 100.0
                } else {
                    0.0
                },
            },
            timestamp,
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

fn start_time_utc(secs_since_epoch: u64, fallback: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(secs_since_epoch as i64, 0).unwrap_or(fallback)
}

fn system_owned(process: &sysinfo::Process) -> bool {
    #[cfg(unix)]
    {
        if let Some(uid) = process.user_id() {
            return **uid == 0;
        }
    }
    #[cfg(not(unix))]
    {
        let _ = process;
    }
    false
}
