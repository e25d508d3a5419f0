//! Alert rules and their evaluation.
//!
//! Rules are a tagged enum evaluated by one dispatch match; cooldowns gate
//! repeated firings and fired events land in a bounded FIFO history.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::persist::PersistenceGateway;

use super::actions::AlertAction;
use super::samples::MonitorSnapshot;

pub const DEFAULT_COOLDOWN_SECS: u64 = 300;
/// Maximum retained alert events; oldest entries are evicted first.
pub const MAX_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
    Disk,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Cpu => write!(f, "cpu"),
            ResourceKind::Memory => write!(f, "memory"),
            ResourceKind::Disk => write!(f, "disk"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Latest sampled usage of a system resource reached the threshold (%).
    Resource {
        resource: ResourceKind,
        threshold: f32,
    },
    /// A process matching the name substring is present, optionally gated on
    /// CPU usage or continuous presence.
    ProcessPresence {
        process_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cpu_threshold: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u64>,
    },
    /// Cumulative tracked time for a category within the trailing window
    /// reached the budget.
    CategoryBudget {
        category: String,
        hours_threshold: f64,
        #[serde(default = "default_window_hours")]
        window_hours: u32,
    },
    /// The workstation has been idle for at least this many minutes.
    Idle { idle_minutes: u32 },
}

fn default_window_hours() -> u32 {
    24
}

fn default_cooldown() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub name: String,
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl AlertRule {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            enabled: true,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            last_triggered: None,
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    pub rule_name: String,
    pub time: DateTime<Utc>,
    pub description: String,
}

/// The compiled-in rule set used when no alerts document exists yet.
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            "High CPU Usage",
            "CPU usage exceeds 90%",
            RuleKind::Resource {
                resource: ResourceKind::Cpu,
                threshold: 90.0,
            },
        ),
        AlertRule::new(
            "High Memory Usage",
            "Memory usage exceeds 85%",
            RuleKind::Resource {
                resource: ResourceKind::Memory,
                threshold: 85.0,
            },
        ),
        AlertRule::new(
            "High Disk Usage",
            "Disk usage exceeds 90%",
            RuleKind::Resource {
                resource: ResourceKind::Disk,
                threshold: 90.0,
            },
        ),
        AlertRule::new(
            "Long Idle",
            "System has been idle for 30 minutes",
            RuleKind::Idle { idle_minutes: 30 },
        ),
        AlertRule::new(
            "Entertainment Limit",
            "Entertainment time exceeds 2 hours",
            RuleKind::CategoryBudget {
                category: "entertainment".to_string(),
                hours_threshold: 2.0,
                window_hours: 24,
            },
        ),
    ]
}

/// Evaluates the rule set against the latest snapshot and fires actions.
pub struct AlertEngine {
    rules: Vec<AlertRule>,
    history: VecDeque<AlertEvent>,
    /// Actions run for every fired rule.
    actions: Vec<Box<dyn AlertAction>>,
    /// Actions attached to one rule by name.
    rule_actions: HashMap<String, Vec<Box<dyn AlertAction>>>,
    /// rule name -> pid -> first time the pid matched.
    presence: HashMap<String, HashMap<u32, DateTime<Utc>>>,
}

impl AlertEngine {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self {
            rules,
            history: VecDeque::with_capacity(MAX_HISTORY),
            actions: Vec::new(),
            rule_actions: HashMap::new(),
            presence: HashMap::new(),
        }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: AlertRule) {
        self.rules.push(rule);
    }

    pub fn remove_rule(&mut self, name: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.name != name);
        self.presence.remove(name);
        self.rule_actions.remove(name);
        self.rules.len() != before
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|rule| rule.name == name) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Attach an action to run on every fired rule.
    pub fn register_action(&mut self, action: Box<dyn AlertAction>) {
        self.actions.push(action);
    }

    /// Attach an action to one rule; it runs after the shared actions
    /// whenever that rule fires.
    pub fn register_rule_action(&mut self, rule_name: &str, action: Box<dyn AlertAction>) {
        self.rule_actions
            .entry(rule_name.to_string())
            .or_default()
            .push(action);
    }

    /// The most recent `limit` events, oldest first.
    pub fn history(&self, limit: usize) -> Vec<AlertEvent> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Evaluate every enabled rule; fire and record those whose condition
    /// holds and whose cooldown has elapsed. Per-rule failures are logged and
    /// never interrupt the pass.
    pub fn check_all(
        &mut self,
        snapshot: &MonitorSnapshot,
        idle_seconds: u64,
        gateway: &dyn PersistenceGateway,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut fired = Vec::new();

        for idx in 0..self.rules.len() {
            if !self.rules[idx].enabled {
                continue;
            }

            let due = match self.evaluate(idx, snapshot, idle_seconds, gateway, now) {
                Ok(due) => due,
                Err(err) => {
                    warn!("alert rule '{}' check failed: {err}", self.rules[idx].name);
                    continue;
                }
            };

            if due {
                if let Some(event) = self.trigger(idx, now) {
                    fired.push(event);
                }
            }
        }

        fired
    }

    fn evaluate(
        &mut self,
        idx: usize,
        snapshot: &MonitorSnapshot,
        idle_seconds: u64,
        gateway: &dyn PersistenceGateway,
        now: DateTime<Utc>,
    ) -> crate::Result<bool> {
        let kind = self.rules[idx].kind.clone();
        let rule_name = self.rules[idx].name.clone();

        match kind {
            RuleKind::Resource {
                resource,
                threshold,
            } => {
                let usage = match resource {
                    ResourceKind::Cpu => snapshot.resources.cpu_percent,
                    ResourceKind::Memory => snapshot.resources.memory.percent,
                    ResourceKind::Disk => snapshot.resources.disk.percent,
                };
                Ok(usage >= threshold)
            }

            RuleKind::ProcessPresence {
                process_name,
                cpu_threshold,
                duration_secs,
            } => {
                let needle = process_name.to_lowercase();
                let matching: Vec<_> = snapshot
                    .processes
                    .iter()
                    .filter(|p| p.name.to_lowercase().contains(&needle))
                    .collect();

                if matching.is_empty() {
                    // Nothing matches any more: the duration clock resets.
                    self.presence.remove(&rule_name);
                    return Ok(false);
                }

                let seen = self.presence.entry(rule_name).or_default();
                seen.retain(|pid, _| matching.iter().any(|p| p.pid == *pid));

                for process in &matching {
                    let first_seen = *seen.entry(process.pid).or_insert(now);

                    if let Some(threshold) = cpu_threshold {
                        if process.cpu_percent >= threshold {
                            return Ok(true);
                        }
                    }
                    if let Some(required) = duration_secs {
                        let present = (now - first_seen).num_seconds().max(0) as u64;
                        if present >= required {
                            return Ok(true);
                        }
                    }
                }

                // No gating parameters: mere presence fires.
                Ok(cpu_threshold.is_none() && duration_secs.is_none())
            }

            RuleKind::CategoryBudget {
                category,
                hours_threshold,
                window_hours,
            } => {
                let aggregate = gateway.read_category_aggregate(window_hours)?;
                let seconds = aggregate.get(&category).copied().unwrap_or(0);
                Ok(seconds as f64 / 3600.0 >= hours_threshold)
            }

            RuleKind::Idle { idle_minutes } => Ok(idle_seconds / 60 >= idle_minutes as u64),
        }
    }

    /// Fire a rule unless it is cooling down. Actions run independently; a
    /// failing action is logged and never blocks its siblings.
    fn trigger(&mut self, idx: usize, now: DateTime<Utc>) -> Option<AlertEvent> {
        let rule = &mut self.rules[idx];

        if let Some(last) = rule.last_triggered {
            if (now - last).num_seconds() < rule.cooldown_secs as i64 {
                return None;
            }
        }
        rule.last_triggered = Some(now);

        let event = AlertEvent {
            rule_name: rule.name.clone(),
            time: now,
            description: rule.description.clone(),
        };

        let attached = self
            .rule_actions
            .get(&event.rule_name)
            .map(|actions| actions.as_slice())
            .unwrap_or_default();
        for action in self.actions.iter().chain(attached) {
            if let Err(err) = action.run(&event) {
                log::error!(
                    "action '{}' failed for alert '{}': {err}",
                    action.name(),
                    event.rule_name
                );
            }
        }

        push_bounded(&mut self.history, event.clone());
        Some(event)
    }
}

fn push_bounded(history: &mut VecDeque<AlertEvent>, event: AlertEvent) {
    if history.len() >= MAX_HISTORY {
        history.pop_front();
    }
    history.push_back(event);
}
