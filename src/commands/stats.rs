//! Statistics command handler.

use anyhow::Result;
use clap::ArgMatches;
use colored::*;
use humansize::{format_size, DECIMAL};

use crate::core::monitor::DEFAULT_SAMPLE_INTERVAL_SECS;
use crate::core::persist::{JsonlGateway, PersistenceGateway};

use super::format_duration;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let hours = matches.get_one::<u32>("hours").copied().unwrap_or(24);
    let json_output = matches.get_flag("json");

    let gateway = JsonlGateway::open_default(DEFAULT_SAMPLE_INTERVAL_SECS)?;
    let aggregate = gateway.read_category_aggregate(hours)?;
    let (focus_secs, break_secs) = gateway.session_summary(hours)?;
    let latest_resources = gateway.latest_resource_sample()?;

    if json_output {
        let payload = serde_json::json!({
            "window_hours": hours,
            "category_seconds": aggregate,
            "focus_seconds": focus_secs,
            "break_seconds": break_secs,
            "latest_resources": latest_resources,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{}", format!("Last {hours}h").bold());
    println!();

    println!("{}", "Time by category".bold());
    if aggregate.is_empty() {
        println!("  no samples recorded yet");
    } else {
        let mut entries: Vec<_> = aggregate.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        for (category, seconds) in entries {
            println!("  {:<16} {}", category.cyan(), format_duration(seconds));
        }
    }

    println!();
    println!("{}", "Sessions".bold());
    println!("  Focus time: {}", format_duration(focus_secs).green());
    println!("  Break time: {}", format_duration(break_secs).cyan());
    let total = focus_secs + break_secs;
    if total > 0 {
        println!(
            "  Focus ratio: {:.0}%",
            focus_secs as f64 / total as f64 * 100.0
        );
    }

    if let Some(resources) = latest_resources {
        println!();
        println!("{}", "Latest sample".bold());
        println!("  CPU:    {:.1}%", resources.cpu_percent);
        println!(
            "  Memory: {:.1}% of {}",
            resources.memory.percent,
            format_size(resources.memory.total_bytes, DECIMAL)
        );
        println!(
            "  Disk:   {:.1}% of {}",
            resources.disk.percent,
            format_size(resources.disk.total_bytes, DECIMAL)
        );
    }

    Ok(())
}
