use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkpulseError};

use super::samples::ProcessObservation;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 5;

/// Filter settings document, rewritten whole on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub excluded_processes: BTreeSet<String>,
    #[serde(default)]
    pub excluded_patterns: Vec<String>,
    /// process name -> display priority (1-5)
    #[serde(default)]
    pub priority_processes: BTreeMap<String, u8>,
    #[serde(default)]
    pub include_system_processes: bool,
    /// Minimum CPU % a process must reach to be tracked.
    #[serde(default)]
    pub cpu_threshold: Option<f32>,
    /// Minimum memory % a process must reach to be tracked.
    #[serde(default)]
    pub memory_threshold: Option<f32>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        let excluded_processes: BTreeSet<String> = [
            "svchost.exe",
            "System",
            "Registry",
            "smss.exe",
            "csrss.exe",
            "wininit.exe",
            "services.exe",
            "lsass.exe",
            "dwm.exe",
            "systemd",
            "kthreadd",
            "kworker",
            "rcu_sched",
            "migration",
            "ksoftirqd",
            "watchdog",
            "kdevtmpfs",
            "kauditd",
            "khugepaged",
            "oom_reaper",
            "writeback",
            "kcompactd",
            "bash",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let excluded_patterns = vec![
            "^kworker.*$".to_string(),
            "^rcu_.*$".to_string(),
            "^migration.*$".to_string(),
            "^ksoftirqd.*$".to_string(),
            "^watchdog.*$".to_string(),
            "^scsi_.*$".to_string(),
        ];

        let priority_processes: BTreeMap<String, u8> = [
            ("chrome", 4),
            ("firefox", 4),
            ("code", 5),
            ("pycharm", 5),
            ("intellij", 5),
            ("vscode", 5),
            ("slack", 3),
            ("discord", 3),
            ("spotify", 2),
            ("steam", 2),
        ]
        .into_iter()
        .map(|(name, priority)| (name.to_string(), priority))
        .collect();

        Self {
            excluded_processes,
            excluded_patterns,
            priority_processes,
            include_system_processes: false,
            cpu_threshold: Some(0.1),
            memory_threshold: Some(0.1),
        }
    }
}

/// Decides whether a sampled process is worth tracking and assigns its
/// display priority. Exclusion regexes are compiled once and recompiled on
/// mutation.
pub struct ProcessFilter {
    settings: FilterSettings,
    compiled: Vec<Regex>,
}

impl ProcessFilter {
    pub fn new(settings: FilterSettings) -> Self {
        let compiled = compile_patterns(&settings.excluded_patterns);
        Self { settings, compiled }
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Whether a process observation passes the filter.
    pub fn should_track(&self, obs: &ProcessObservation) -> bool {
        if self.settings.excluded_processes.contains(&obs.name) {
            return false;
        }

        if self.compiled.iter().any(|re| re.is_match(&obs.name)) {
            return false;
        }

        if obs.system_owned && !self.settings.include_system_processes {
            return false;
        }

        // Too quiet on every configured axis -> not worth tracking.
        if self.settings.cpu_threshold.is_some() || self.settings.memory_threshold.is_some() {
            let cpu_low = self
                .settings
                .cpu_threshold
                .map_or(true, |t| obs.cpu_percent < t);
            let memory_low = self
                .settings
                .memory_threshold
                .map_or(true, |t| obs.memory_percent < t);
            if cpu_low && memory_low {
                return false;
            }
        }

        true
    }

    /// Display priority for a process name: exact match wins, then the first
    /// case-insensitive substring match, otherwise 1.
    pub fn priority_of(&self, name: &str) -> u8 {
        if let Some(priority) = self.settings.priority_processes.get(name) {
            return *priority;
        }

        let name_lower = name.to_lowercase();
        for (candidate, priority) in &self.settings.priority_processes {
            if name_lower.contains(&candidate.to_lowercase()) {
                return *priority;
            }
        }

        MIN_PRIORITY
    }

    /// Retain only trackable observations.
    pub fn apply(&self, observations: Vec<ProcessObservation>) -> Vec<ProcessObservation> {
        observations
            .into_iter()
            .filter(|obs| self.should_track(obs))
            .collect()
    }

    // Mutations. Callers persist the whole settings document afterwards.

    pub fn exclude_process(&mut self, name: &str) {
        self.settings.excluded_processes.insert(name.to_string());
    }

    pub fn include_process(&mut self, name: &str) -> bool {
        self.settings.excluded_processes.remove(name)
    }

    pub fn add_excluded_pattern(&mut self, pattern: &str) -> Result<()> {
        Regex::new(pattern)
            .map_err(|err| WorkpulseError::invalid_pattern(pattern, err.to_string()))?;
        if !self.settings.excluded_patterns.iter().any(|p| p == pattern) {
            self.settings.excluded_patterns.push(pattern.to_string());
            self.compiled = compile_patterns(&self.settings.excluded_patterns);
        }
        Ok(())
    }

    pub fn remove_excluded_pattern(&mut self, pattern: &str) -> bool {
        let before = self.settings.excluded_patterns.len();
        self.settings.excluded_patterns.retain(|p| p != pattern);
        let removed = self.settings.excluded_patterns.len() != before;
        if removed {
            self.compiled = compile_patterns(&self.settings.excluded_patterns);
        }
        removed
    }

    pub fn set_priority(&mut self, name: &str, priority: u8) -> Result<()> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(WorkpulseError::invalid_input(format!(
                "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {priority}"
            )));
        }
        self.settings
            .priority_processes
            .insert(name.to_string(), priority);
        Ok(())
    }

    pub fn remove_priority(&mut self, name: &str) -> bool {
        self.settings.priority_processes.remove(name).is_some()
    }

    pub fn set_cpu_threshold(&mut self, value: Option<f32>) -> Result<()> {
        validate_threshold(value)?;
        self.settings.cpu_threshold = value;
        Ok(())
    }

    pub fn set_memory_threshold(&mut self, value: Option<f32>) -> Result<()> {
        validate_threshold(value)?;
        self.settings.memory_threshold = value;
        Ok(())
    }

    pub fn set_include_system_processes(&mut self, include: bool) {
        self.settings.include_system_processes = include;
    }
}

fn validate_threshold(value: Option<f32>) -> Result<()> {
    if let Some(v) = value {
        if !(0.0..=100.0).contains(&v) {
            return Err(WorkpulseError::invalid_input(format!(
                "threshold must be between 0 and 100, got {v}"
            )));
        }
    }
    Ok(())
}

fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(err) => {
                warn!("skipping invalid exclusion pattern '{pattern}': {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn obs(name: &str, cpu: f32, memory: f32) -> ProcessObservation {
        ProcessObservation {
            pid: 1234,
            name: name.to_string(),
            cpu_percent: cpu,
            memory_percent: memory,
            create_time: Utc::now(),
            system_owned: false,
        }
    }

    #[test]
    fn excluded_name_is_not_tracked() {
        let filter = ProcessFilter::new(FilterSettings::default());
        assert!(!filter.should_track(&obs("systemd", 5.0, 5.0)));
    }

    #[test]
    fn excluded_pattern_is_not_tracked() {
        let filter = ProcessFilter::new(FilterSettings::default());
        assert!(!filter.should_track(&obs("kworker/0:1", 5.0, 5.0)));
    }

    #[test]
    fn system_owned_respects_policy() {
        let mut filter = ProcessFilter::new(FilterSettings::default());
        let mut observation = obs("nginx", 5.0, 5.0);
        observation.system_owned = true;

        assert!(!filter.should_track(&observation));
        filter.set_include_system_processes(true);
        assert!(filter.should_track(&observation));
    }

    #[test]
    fn quiet_process_below_both_thresholds_is_dropped() {
        let mut filter = ProcessFilter::new(FilterSettings::default());
        filter.set_cpu_threshold(Some(1.0)).unwrap();
        filter.set_memory_threshold(Some(1.0)).unwrap();

        assert!(!filter.should_track(&obs("editor", 0.5, 0.5)));
        // Busy on one axis is enough to keep it.
        assert!(filter.should_track(&obs("editor", 2.0, 0.5)));
        assert!(filter.should_track(&obs("editor", 0.5, 2.0)));
    }

    #[test]
    fn apply_returns_subset_that_all_pass_the_filter() {
        let filter = ProcessFilter::new(FilterSettings::default());
        let input = vec![
            obs("chrome", 12.0, 3.0),
            obs("kworker/2:0", 0.0, 0.0),
            obs("systemd", 0.2, 0.4),
            obs("cargo", 40.0, 2.0),
        ];

        let output = filter.apply(input.clone());
        assert!(output.len() <= input.len());
        for kept in &output {
            assert!(filter.should_track(kept));
            assert!(input.contains(kept));
        }
    }

    #[test]
    fn priority_exact_match_beats_substring() {
        let mut filter = ProcessFilter::new(FilterSettings::default());
        filter.set_priority("chrome-sandbox", 2).unwrap();
        assert_eq!(filter.priority_of("chrome-sandbox"), 2);
        // Substring match against "chrome" (priority 4).
        assert_eq!(filter.priority_of("google-chrome-stable"), 4);
        // No match falls back to the default.
        assert_eq!(filter.priority_of("unheard-of"), MIN_PRIORITY);
    }

    #[test]
    fn priority_range_is_validated() {
        let mut filter = ProcessFilter::new(FilterSettings::default());
        assert!(filter.set_priority("x", 0).is_err());
        assert!(filter.set_priority("x", 6).is_err());
        assert!(filter.set_priority("x", 5).is_ok());
    }

    #[test]
    fn threshold_range_is_validated() {
        let mut filter = ProcessFilter::new(FilterSettings::default());
        assert!(filter.set_cpu_threshold(Some(-1.0)).is_err());
        assert!(filter.set_memory_threshold(Some(101.0)).is_err());
        assert!(filter.set_cpu_threshold(None).is_ok());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut filter = ProcessFilter::new(FilterSettings::default());
        assert!(filter.add_excluded_pattern("[unclosed").is_err());
        assert!(filter.add_excluded_pattern("^tracker-.*$").is_ok());
        assert!(!filter.should_track(&obs("tracker-miner", 5.0, 5.0)));
    }
}
