//! Category rules management command handler.

use anyhow::Result;
use clap::ArgMatches;
use colored::*;

use crate::core::config::ConfigStore;
use crate::core::monitor::Categorizer;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let store = ConfigStore::open_default()?;
    let mut categorizer = Categorizer::new(store.load_categories());

    match matches.subcommand() {
        Some(("show", _)) => {
            show(&categorizer);
            return Ok(());
        }
        Some(("test", sub)) => {
            let name = required(sub, "name");
            println!("{} -> {}", name, categorizer.categorize(name).cyan());
            return Ok(());
        }
        Some(("set", sub)) => {
            let process = required(sub, "process");
            let category = required(sub, "category");
            categorizer.set_override(process, category);
            println!("'{process}' will always be categorized as '{category}'");
        }
        Some(("unset", sub)) => {
            let process = required(sub, "process");
            if categorizer.remove_override(process) {
                println!("Removed override for '{process}'");
            } else {
                println!("No override for '{process}'");
            }
        }
        Some(("keyword", sub)) => {
            let category = required(sub, "category");
            let keyword = required(sub, "keyword");
            categorizer.add_keyword(category, keyword);
            println!("Keyword '{keyword}' added to '{category}'");
        }
        Some(("remove-keyword", sub)) => {
            let category = required(sub, "category");
            let keyword = required(sub, "keyword");
            if !categorizer.remove_keyword(category, keyword) {
                println!("Keyword '{keyword}' was not in '{category}'");
            } else {
                println!("Keyword '{keyword}' removed from '{category}'");
            }
        }
        Some(("pattern", sub)) => {
            let category = required(sub, "category");
            let pattern = required(sub, "pattern");
            categorizer.add_pattern(category, pattern)?;
            println!("Pattern '{pattern}' added to '{category}'");
        }
        Some(("remove-pattern", sub)) => {
            let category = required(sub, "category");
            let pattern = required(sub, "pattern");
            if !categorizer.remove_pattern(category, pattern) {
                println!("Pattern '{pattern}' was not in '{category}'");
            } else {
                println!("Pattern '{pattern}' removed from '{category}'");
            }
        }
        _ => {
            println!("Use 'workpulse category --help' for more information.");
            return Ok(());
        }
    }

    store.save_categories(categorizer.rules())?;
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a String {
    matches.get_one::<String>(id).expect("required arg")
}

fn show(categorizer: &Categorizer) {
    let rules = categorizer.rules();

    println!("{}", "Category rules".bold());
    if !rules.overrides.is_empty() {
        println!("  Overrides:");
        for (process, category) in &rules.overrides {
            println!("    {:<20} -> {}", process, category.cyan());
        }
    }

    for (category, keywords) in &rules.keywords {
        println!("  {}:", category.cyan());
        println!("    keywords: {}", keywords.join(", "));
        if let Some(patterns) = rules.patterns.get(category) {
            println!("    patterns: {}", patterns.join(", "));
        }
    }
}
