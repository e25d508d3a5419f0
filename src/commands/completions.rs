use anyhow::Result;
use clap::{ArgMatches, Command};
use clap_complete::{generate, Shell};
use std::io;

/// Generate shell completions for the specified shell
pub fn execute(matches: &ArgMatches, cli: &mut Command) -> Result<()> {
    let shell = *matches.get_one::<Shell>("shell").expect("required arg");
    generate(shell, cli, "workpulse", &mut io::stdout());
    Ok(())
}
