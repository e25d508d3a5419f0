//! Tracking daemon command handler.
//!
//! Runs the monitoring engine in the foreground until Ctrl+C, then prints the
//! session summary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;

use crate::core::config::ConfigStore;
use crate::core::monitor::{
    EngineConfig, MonitorEngine, SessionStats, DEFAULT_ALERT_INTERVAL_SECS,
    DEFAULT_IDLE_THRESHOLD_SECS, DEFAULT_SAMPLE_INTERVAL_SECS,
};
use crate::core::persist::JsonlGateway;

use super::format_duration;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let sample_interval = matches
        .get_one::<u64>("interval")
        .copied()
        .unwrap_or(DEFAULT_SAMPLE_INTERVAL_SECS);
    let idle_threshold = matches
        .get_one::<u64>("idle-threshold")
        .copied()
        .unwrap_or(DEFAULT_IDLE_THRESHOLD_SECS);
    let break_minutes = matches
        .get_one::<u64>("break-threshold")
        .copied()
        .unwrap_or(40);
    let alert_interval = matches
        .get_one::<u64>("alert-interval")
        .copied()
        .unwrap_or(DEFAULT_ALERT_INTERVAL_SECS);

    let store = ConfigStore::open_default()?;
    let gateway = Arc::new(
        JsonlGateway::open_default(sample_interval).context("could not open the data directory")?,
    );

    let config = EngineConfig {
        sample_interval: Duration::from_secs(sample_interval.max(1)),
        alert_interval: Duration::from_secs(alert_interval.max(1)),
        idle_threshold_secs: idle_threshold,
        break_threshold_secs: break_minutes * 60,
    };

    let mut engine = MonitorEngine::new(gateway, store, config);
    engine.start()?;

    println!("{}", "Workpulse".bold());
    println!("Starting monitoring... (Press Ctrl+C to stop)");
    println!("  Sample interval: {sample_interval}s");
    println!("  Idle threshold:  {}", format_duration(idle_threshold));
    println!("  Break reminder:  {break_minutes}m");

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;

    let mut reminded = false;
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(500));

        let due = engine.should_take_break();
        if due && !reminded {
            println!(
                "{}",
                "You have been working for a while - consider taking a break.".yellow()
            );
        }
        reminded = due;
    }

    println!("\nShutting down...");
    if let Some(stats) = engine.stop() {
        print_summary(&stats);
    }

    Ok(())
}

fn print_summary(stats: &SessionStats) {
    println!();
    println!("{}", "Session summary".bold());
    println!(
        "  Focus time:  {}",
        format_duration(stats.total_work_secs).green()
    );
    println!(
        "  Break time:  {}",
        format_duration(stats.total_break_secs).cyan()
    );
    println!("  Sessions:    {}", stats.session_count);
    println!("  Focus ratio: {:.0}%", stats.focus_ratio * 100.0);
}
