//! Best-effort persistence gateway.
//!
//! The monitoring core hands snapshots, session records and idle periods to a
//! [`PersistenceGateway`] and never retries: a failed write is logged by the
//! caller and dropped for that cycle.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkpulseError};

use super::monitor::samples::{ProcessSample, ResourceSample};
use super::monitor::session::SessionRecord;

pub trait PersistenceGateway: Send + Sync {
    fn insert_process_samples(&self, batch: &[ProcessSample]) -> Result<()>;

    fn insert_resource_sample(&self, sample: &ResourceSample) -> Result<()>;

    fn record_session(&self, record: &SessionRecord) -> Result<()>;

    fn record_idle_period(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()>;

    /// Tracked seconds per category within the trailing window.
    fn read_category_aggregate(&self, window_hours: u32) -> Result<HashMap<String, u64>>;
}

/// One persisted sampler batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SampleBatch {
    time: DateTime<Utc>,
    samples: Vec<ProcessSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdlePeriodRecord {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// In-memory gateway for tests and embedders that bring their own storage.
///
/// Category aggregates are estimated the same way the file-backed gateway
/// does: one batch appearance counts as `sample_interval_secs` of tracked
/// time for that category.
#[derive(Default)]
pub struct MemoryGateway {
    sample_interval_secs: u64,
    batches: Mutex<Vec<SampleBatch>>,
    resources: Mutex<Vec<ResourceSample>>,
    sessions: Mutex<Vec<SessionRecord>>,
    idle_periods: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
}

impl MemoryGateway {
    pub fn new(sample_interval_secs: u64) -> Self {
        Self {
            sample_interval_secs,
            ..Default::default()
        }
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.sessions.lock().clone()
    }

    pub fn idle_periods(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.idle_periods.lock().clone()
    }

    pub fn resource_samples(&self) -> Vec<ResourceSample> {
        self.resources.lock().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }
}

impl PersistenceGateway for MemoryGateway {
    fn insert_process_samples(&self, batch: &[ProcessSample]) -> Result<()> {
        self.batches.lock().push(SampleBatch {
            time: Utc::now(),
            samples: batch.to_vec(),
        });
        Ok(())
    }

    fn insert_resource_sample(&self, sample: &ResourceSample) -> Result<()> {
        self.resources.lock().push(sample.clone());
        Ok(())
    }

    fn record_session(&self, record: &SessionRecord) -> Result<()> {
        self.sessions.lock().push(record.clone());
        Ok(())
    }

    fn record_idle_period(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
        self.idle_periods.lock().push((start, end));
        Ok(())
    }

    fn read_category_aggregate(&self, window_hours: u32) -> Result<HashMap<String, u64>> {
        let cutoff = Utc::now() - ChronoDuration::hours(window_hours as i64);
        let interval = self.sample_interval_secs.max(1);
        let mut aggregate: HashMap<String, u64> = HashMap::new();

        for batch in self.batches.lock().iter().filter(|b| b.time >= cutoff) {
            for sample in &batch.samples {
                *aggregate.entry(sample.category.clone()).or_default() += interval;
            }
        }

        Ok(aggregate)
    }
}

/// Append-only JSON-lines gateway under the user data directory.
pub struct JsonlGateway {
    dir: PathBuf,
    sample_interval_secs: u64,
}

const SAMPLES_FILE: &str = "samples.jsonl";
const RESOURCES_FILE: &str = "resources.jsonl";
const SESSIONS_FILE: &str = "sessions.jsonl";
const IDLE_FILE: &str = "idle.jsonl";

impl JsonlGateway {
    pub fn open_default(sample_interval_secs: u64) -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| WorkpulseError::persistence("could not determine data directory"))?
            .join("workpulse");
        Self::open(dir, sample_interval_secs)
    }

    pub fn open(dir: impl Into<PathBuf>, sample_interval_secs: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            sample_interval_secs,
        })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn append<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        writeln!(handle, "{line}")?;
        Ok(())
    }

    fn read_lines<T: for<'de> Deserialize<'de>>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // A torn final line from a crashed writer is skipped, not fatal.
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(err) => log::warn!("skipping corrupt record in {file}: {err}"),
            }
        }
        Ok(records)
    }

    /// Most recent persisted resource sample, if any.
    pub fn latest_resource_sample(&self) -> Result<Option<ResourceSample>> {
        Ok(self.read_lines::<ResourceSample>(RESOURCES_FILE)?.pop())
    }

    /// Sum of focus/break seconds for sessions ending within the window.
    pub fn session_summary(&self, window_hours: u32) -> Result<(u64, u64)> {
        let cutoff = Utc::now() - ChronoDuration::hours(window_hours as i64);
        let totals = self
            .read_lines::<SessionRecord>(SESSIONS_FILE)?
            .into_iter()
            .filter(|record| record.end >= cutoff)
            .fold((0, 0), |(focus, rest), record| {
                (focus + record.focus_secs, rest + record.break_secs)
            });
        Ok(totals)
    }
}

impl PersistenceGateway for JsonlGateway {
    fn insert_process_samples(&self, batch: &[ProcessSample]) -> Result<()> {
        self.append(
            SAMPLES_FILE,
            &SampleBatch {
                time: Utc::now(),
                samples: batch.to_vec(),
            },
        )
    }

    fn insert_resource_sample(&self, sample: &ResourceSample) -> Result<()> {
        self.append(RESOURCES_FILE, sample)
    }

    fn record_session(&self, record: &SessionRecord) -> Result<()> {
        self.append(SESSIONS_FILE, record)
    }

    fn record_idle_period(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
        self.append(IDLE_FILE, &IdlePeriodRecord { start, end })
    }

    fn read_category_aggregate(&self, window_hours: u32) -> Result<HashMap<String, u64>> {
        let cutoff = Utc::now() - ChronoDuration::hours(window_hours as i64);
        let interval = self.sample_interval_secs.max(1);
        let mut aggregate: HashMap<String, u64> = HashMap::new();

        for batch in self
            .read_lines::<SampleBatch>(SAMPLES_FILE)?
            .into_iter()
            .filter(|b| b.time >= cutoff)
        {
            for sample in &batch.samples {
                *aggregate.entry(sample.category.clone()).or_default() += interval;
            }
        }

        Ok(aggregate)
    }
}
