//! Alert rules management command handler.

use anyhow::{bail, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::ConfigStore;
use crate::core::monitor::{AlertRule, ResourceKind, RuleKind, DEFAULT_COOLDOWN_SECS};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let store = ConfigStore::open_default()?;
    let mut rules = store.load_alert_rules();

    match matches.subcommand() {
        Some(("list", _)) => {
            list(&rules);
            return Ok(());
        }
        Some(("remove", sub)) => {
            let name = required(sub, "name");
            let before = rules.len();
            rules.retain(|rule| &rule.name != name);
            if rules.len() == before {
                bail!("no alert named '{name}'");
            }
            println!("Removed alert '{name}'");
        }
        Some(("enable", sub)) => {
            set_enabled(&mut rules, required(sub, "name"), true)?;
        }
        Some(("disable", sub)) => {
            set_enabled(&mut rules, required(sub, "name"), false)?;
        }
        Some(("add-resource", sub)) => {
            let resource = match required(sub, "resource").as_str() {
                "cpu" => ResourceKind::Cpu,
                "memory" => ResourceKind::Memory,
                "disk" => ResourceKind::Disk,
                other => bail!("resource must be cpu, memory or disk, got '{other}'"),
            };
            let threshold = *sub.get_one::<f32>("threshold").expect("required arg");
            if !(0.0..=100.0).contains(&threshold) {
                bail!("threshold must be between 0 and 100");
            }
            push_rule(
                &mut rules,
                new_rule(
                    sub,
                    format!("{resource} usage exceeds {threshold}%"),
                    RuleKind::Resource {
                        resource,
                        threshold,
                    },
                ),
            )?;
        }
        Some(("add-process", sub)) => {
            let process_name = required(sub, "process").clone();
            let kind = RuleKind::ProcessPresence {
                cpu_threshold: sub.get_one::<f32>("cpu").copied(),
                duration_secs: sub.get_one::<u64>("duration").copied(),
                process_name: process_name.clone(),
            };
            push_rule(
                &mut rules,
                new_rule(sub, format!("process '{process_name}' detected"), kind),
            )?;
        }
        Some(("add-category", sub)) => {
            let category = required(sub, "category").clone();
            let hours_threshold = *sub.get_one::<f64>("hours").expect("required arg");
            let window_hours = sub.get_one::<u32>("window").copied().unwrap_or(24);
            push_rule(
                &mut rules,
                new_rule(
                    sub,
                    format!("'{category}' time exceeds {hours_threshold}h in {window_hours}h"),
                    RuleKind::CategoryBudget {
                        category,
                        hours_threshold,
                        window_hours,
                    },
                ),
            )?;
        }
        Some(("add-idle", sub)) => {
            let idle_minutes = *sub.get_one::<u32>("minutes").expect("required arg");
            push_rule(
                &mut rules,
                new_rule(
                    sub,
                    format!("system idle for {idle_minutes} minutes"),
                    RuleKind::Idle { idle_minutes },
                ),
            )?;
        }
        _ => {
            println!("Use 'workpulse alert --help' for more information.");
            return Ok(());
        }
    }

    store.save_alert_rules(&rules)?;
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a String {
    matches.get_one::<String>(id).expect("required arg")
}

fn new_rule(sub: &ArgMatches, default_description: String, kind: RuleKind) -> AlertRule {
    let name = required(sub, "name").clone();
    let description = sub
        .get_one::<String>("description")
        .cloned()
        .unwrap_or(default_description);

    let mut rule = AlertRule::new(name, description, kind);
    rule.cooldown_secs = sub
        .get_one::<u64>("cooldown")
        .copied()
        .unwrap_or(DEFAULT_COOLDOWN_SECS);
    rule
}

fn push_rule(rules: &mut Vec<AlertRule>, rule: AlertRule) -> Result<()> {
    if rules.iter().any(|existing| existing.name == rule.name) {
        bail!("an alert named '{}' already exists", rule.name);
    }
    println!("Added alert '{}'", rule.name);
    rules.push(rule);
    Ok(())
}

fn set_enabled(rules: &mut [AlertRule], name: &str, enabled: bool) -> Result<()> {
    match rules.iter_mut().find(|rule| rule.name == name) {
        Some(rule) => {
            rule.enabled = enabled;
            println!(
                "Alert '{name}' {}",
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        None => bail!("no alert named '{name}'"),
    }
}

fn list(rules: &[AlertRule]) {
    println!("{}", "Alert rules".bold());
    for rule in rules {
        let status = if rule.enabled {
            "enabled".green()
        } else {
            "disabled".red()
        };
        let condition = match &rule.kind {
            RuleKind::Resource {
                resource,
                threshold,
            } => format!("{resource} >= {threshold}%"),
            RuleKind::ProcessPresence {
                process_name,
                cpu_threshold,
                duration_secs,
            } => {
                let mut parts = vec![format!("process ~ '{process_name}'")];
                if let Some(cpu) = cpu_threshold {
                    parts.push(format!("cpu >= {cpu}%"));
                }
                if let Some(secs) = duration_secs {
                    parts.push(format!("present >= {secs}s"));
                }
                parts.join(", ")
            }
            RuleKind::CategoryBudget {
                category,
                hours_threshold,
                window_hours,
            } => format!("'{category}' >= {hours_threshold}h / {window_hours}h"),
            RuleKind::Idle { idle_minutes } => format!("idle >= {idle_minutes}m"),
        };
        println!(
            "  {:<24} [{}] {} (cooldown {}s)",
            rule.name.cyan(),
            status,
            condition,
            rule.cooldown_secs
        );
    }
}
