use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};

use workpulse::commands;

fn main() -> Result<()> {
    workpulse::init_logging();

    let mut cli = build_cli();
    let matches = cli.clone().get_matches();

    match matches.subcommand() {
        Some(("track", sub)) => commands::track::execute(sub),
        Some(("stats", sub)) => commands::stats::execute(sub),
        Some(("filter", sub)) => commands::filter::execute(sub),
        Some(("category", sub)) => commands::category::execute(sub),
        Some(("alert", sub)) => commands::alert::execute(sub),
        Some(("completions", sub)) => commands::completions::execute(sub, &mut cli),
        _ => {
            println!("Use 'workpulse --help' for more information.");
            Ok(())
        }
    }
}

fn build_cli() -> Command {
    Command::new("workpulse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Workstation time tracker: process sampling, idle detection and alerts")
        .subcommand(
            Command::new("track")
                .about("Run the tracking daemon in the foreground")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Sampling interval in seconds (default: 5)")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("idle-threshold")
                        .long("idle-threshold")
                        .value_name("SECONDS")
                        .help("Seconds without input before a break starts (default: 300)")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("break-threshold")
                        .long("break-threshold")
                        .value_name("MINUTES")
                        .help("Continuous work minutes before a break reminder (default: 40)")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("alert-interval")
                        .long("alert-interval")
                        .value_name("SECONDS")
                        .help("Alert check interval in seconds (default: 60)")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("stats")
                .about("Show tracked time, session and resource statistics")
                .arg(
                    Arg::new("hours")
                        .long("hours")
                        .value_name("HOURS")
                        .help("Trailing window in hours (default: 24)")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print machine-readable JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("filter")
                .about("Manage the process filter (use 'workpulse filter --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Show the current filter settings"))
                .subcommand(
                    Command::new("exclude")
                        .about("Exclude a process name from tracking")
                        .arg(Arg::new("name").required(true).index(1)),
                )
                .subcommand(
                    Command::new("include")
                        .about("Remove a process name from the exclusion list")
                        .arg(Arg::new("name").required(true).index(1)),
                )
                .subcommand(
                    Command::new("add-pattern")
                        .about("Add an exclusion regex")
                        .arg(Arg::new("pattern").required(true).index(1)),
                )
                .subcommand(
                    Command::new("remove-pattern")
                        .about("Remove an exclusion regex")
                        .arg(Arg::new("pattern").required(true).index(1)),
                )
                .subcommand(
                    Command::new("priority")
                        .about("Set a process display priority (1-5)")
                        .arg(Arg::new("name").required(true).index(1))
                        .arg(
                            Arg::new("level")
                                .required(true)
                                .index(2)
                                .value_parser(value_parser!(u8)),
                        ),
                )
                .subcommand(
                    Command::new("threshold")
                        .about("Set the minimum cpu/memory % to track, or 'off'")
                        .arg(Arg::new("kind").required(true).index(1))
                        .arg(Arg::new("value").required(true).index(2)),
                )
                .subcommand(
                    Command::new("system")
                        .about("Include or exclude system-owned processes (on/off)")
                        .arg(Arg::new("mode").required(true).index(1)),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage category rules (use 'workpulse category --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Show the current category rules"))
                .subcommand(
                    Command::new("test")
                        .about("Show which category a process name resolves to")
                        .arg(Arg::new("name").required(true).index(1)),
                )
                .subcommand(
                    Command::new("set")
                        .about("Pin a process name to a category")
                        .arg(Arg::new("process").required(true).index(1))
                        .arg(Arg::new("category").required(true).index(2)),
                )
                .subcommand(
                    Command::new("unset")
                        .about("Remove a category override")
                        .arg(Arg::new("process").required(true).index(1)),
                )
                .subcommand(
                    Command::new("keyword")
                        .about("Add a keyword to a category")
                        .arg(Arg::new("category").required(true).index(1))
                        .arg(Arg::new("keyword").required(true).index(2)),
                )
                .subcommand(
                    Command::new("remove-keyword")
                        .about("Remove a keyword from a category")
                        .arg(Arg::new("category").required(true).index(1))
                        .arg(Arg::new("keyword").required(true).index(2)),
                )
                .subcommand(
                    Command::new("pattern")
                        .about("Add a regex pattern to a category")
                        .arg(Arg::new("category").required(true).index(1))
                        .arg(Arg::new("pattern").required(true).index(2)),
                )
                .subcommand(
                    Command::new("remove-pattern")
                        .about("Remove a regex pattern from a category")
                        .arg(Arg::new("category").required(true).index(1))
                        .arg(Arg::new("pattern").required(true).index(2)),
                ),
        )
        .subcommand(
            Command::new("alert")
                .about("Manage alert rules (use 'workpulse alert --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("list").about("List configured alert rules"))
                .subcommand(
                    Command::new("remove")
                        .about("Remove an alert rule")
                        .arg(Arg::new("name").required(true).index(1)),
                )
                .subcommand(
                    Command::new("enable")
                        .about("Enable an alert rule")
                        .arg(Arg::new("name").required(true).index(1)),
                )
                .subcommand(
                    Command::new("disable")
                        .about("Disable an alert rule")
                        .arg(Arg::new("name").required(true).index(1)),
                )
                .subcommand(
                    Command::new("add-resource")
                        .about("Alert when a resource usage percentage is reached")
                        .arg(Arg::new("name").required(true).index(1))
                        .arg(
                            Arg::new("resource")
                                .long("resource")
                                .value_name("cpu|memory|disk")
                                .required(true),
                        )
                        .arg(
                            Arg::new("threshold")
                                .long("threshold")
                                .value_name("PERCENT")
                                .required(true)
                                .value_parser(value_parser!(f32)),
                        )
                        .arg(common_description_arg())
                        .arg(common_cooldown_arg()),
                )
                .subcommand(
                    Command::new("add-process")
                        .about("Alert when a matching process is present")
                        .arg(Arg::new("name").required(true).index(1))
                        .arg(
                            Arg::new("process")
                                .long("process")
                                .value_name("SUBSTRING")
                                .required(true),
                        )
                        .arg(
                            Arg::new("cpu")
                                .long("cpu")
                                .value_name("PERCENT")
                                .help("Only fire when the process reaches this CPU %")
                                .value_parser(value_parser!(f32)),
                        )
                        .arg(
                            Arg::new("duration")
                                .long("duration")
                                .value_name("SECONDS")
                                .help("Only fire after this much continuous presence")
                                .value_parser(value_parser!(u64)),
                        )
                        .arg(common_description_arg())
                        .arg(common_cooldown_arg()),
                )
                .subcommand(
                    Command::new("add-category")
                        .about("Alert when a category exceeds its time budget")
                        .arg(Arg::new("name").required(true).index(1))
                        .arg(
                            Arg::new("category")
                                .long("category")
                                .value_name("CATEGORY")
                                .required(true),
                        )
                        .arg(
                            Arg::new("hours")
                                .long("hours")
                                .value_name("HOURS")
                                .required(true)
                                .value_parser(value_parser!(f64)),
                        )
                        .arg(
                            Arg::new("window")
                                .long("window")
                                .value_name("HOURS")
                                .help("Trailing window in hours (default: 24)")
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(common_description_arg())
                        .arg(common_cooldown_arg()),
                )
                .subcommand(
                    Command::new("add-idle")
                        .about("Alert when the workstation has been idle too long")
                        .arg(Arg::new("name").required(true).index(1))
                        .arg(
                            Arg::new("minutes")
                                .long("minutes")
                                .value_name("MINUTES")
                                .required(true)
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(common_description_arg())
                        .arg(common_cooldown_arg()),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .help("Shell to generate completions for")
                        .required(true)
                        .index(1)
                        .value_parser(value_parser!(clap_complete::Shell)),
                ),
        )
}

fn common_description_arg() -> Arg {
    Arg::new("description")
        .long("description")
        .value_name("TEXT")
        .help("Human-readable description shown when the alert fires")
}

fn common_cooldown_arg() -> Arg {
    Arg::new("cooldown")
        .long("cooldown")
        .value_name("SECONDS")
        .help("Minimum seconds between firings (default: 300)")
        .value_parser(value_parser!(u64))
}
