//! Process filter management command handler.

use anyhow::{bail, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::ConfigStore;
use crate::core::monitor::ProcessFilter;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let store = ConfigStore::open_default()?;
    let mut filter = ProcessFilter::new(store.load_filter());

    match matches.subcommand() {
        Some(("show", _)) => {
            show(&filter);
            return Ok(());
        }
        Some(("exclude", sub)) => {
            let name = required(sub, "name");
            filter.exclude_process(name);
            println!("Excluded process '{name}'");
        }
        Some(("include", sub)) => {
            let name = required(sub, "name");
            if filter.include_process(name) {
                println!("Removed '{name}' from the exclusion list");
            } else {
                println!("'{name}' was not excluded");
            }
        }
        Some(("add-pattern", sub)) => {
            let pattern = required(sub, "pattern");
            filter.add_excluded_pattern(pattern)?;
            println!("Added exclusion pattern '{pattern}'");
        }
        Some(("remove-pattern", sub)) => {
            let pattern = required(sub, "pattern");
            if !filter.remove_excluded_pattern(pattern) {
                println!("Pattern '{pattern}' was not present");
            } else {
                println!("Removed exclusion pattern '{pattern}'");
            }
        }
        Some(("priority", sub)) => {
            let name = required(sub, "name");
            let level = *sub.get_one::<u8>("level").expect("required arg");
            filter.set_priority(name, level)?;
            println!("Priority of '{name}' set to {level}");
        }
        Some(("threshold", sub)) => {
            let kind = required(sub, "kind");
            let value = required(sub, "value");
            let parsed = if value.eq_ignore_ascii_case("off") {
                None
            } else {
                Some(value.parse::<f32>()?)
            };
            match kind.as_str() {
                "cpu" => filter.set_cpu_threshold(parsed)?,
                "memory" => filter.set_memory_threshold(parsed)?,
                other => bail!("threshold kind must be 'cpu' or 'memory', got '{other}'"),
            }
            println!("{kind} threshold set to {value}");
        }
        Some(("system", sub)) => {
            let mode = required(sub, "mode");
            let include = match mode.as_str() {
                "on" => true,
                "off" => false,
                other => bail!("expected 'on' or 'off', got '{other}'"),
            };
            filter.set_include_system_processes(include);
            println!(
                "System processes are now {}",
                if include { "included" } else { "excluded" }
            );
        }
        _ => {
            println!("Use 'workpulse filter --help' for more information.");
            return Ok(());
        }
    }

    store.save_filter(filter.settings())?;
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a String {
    matches.get_one::<String>(id).expect("required arg")
}

fn show(filter: &ProcessFilter) {
    let settings = filter.settings();

    println!("{}", "Filter settings".bold());
    println!(
        "  System processes: {}",
        if settings.include_system_processes {
            "included"
        } else {
            "excluded"
        }
    );
    match settings.cpu_threshold {
        Some(v) => println!("  CPU threshold:    {v}%"),
        None => println!("  CPU threshold:    off"),
    }
    match settings.memory_threshold {
        Some(v) => println!("  Memory threshold: {v}%"),
        None => println!("  Memory threshold: off"),
    }

    println!("  Excluded names:   {}", settings.excluded_processes.len());
    for name in &settings.excluded_processes {
        println!("    {name}");
    }
    println!("  Excluded patterns:");
    for pattern in &settings.excluded_patterns {
        println!("    {pattern}");
    }
    println!("  Priorities:");
    for (name, priority) in &settings.priority_processes {
        println!("    {:<16} {}", name.cyan(), priority);
    }
}
