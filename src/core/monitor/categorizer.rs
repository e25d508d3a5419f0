use std::collections::BTreeMap;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkpulseError};

/// Category assigned when no rule matches.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Category rules document, rewritten whole on every mutation.
///
/// Resolution order: exact override, then case-insensitive keyword substring,
/// then regex pattern, then [`UNCATEGORIZED`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRules {
    /// exact process name -> category
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    /// category -> keywords matched as substrings
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
    /// category -> regex patterns
    #[serde(default)]
    pub patterns: BTreeMap<String, Vec<String>>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}

static DEFAULT_RULES: Lazy<CategoryRules> = Lazy::new(|| {
    let keywords: BTreeMap<String, Vec<String>> = [
        (
            "development",
            vec![
                "code", "pycharm", "intellij", "eclipse", "vim", "emacs", "sublime", "atom",
                "vscode", "terminal", "git", "npm", "node", "python", "java", "gcc", "clang",
                "make", "gradle", "maven", "cargo",
            ],
        ),
        (
            "productivity",
            vec![
                "office", "word", "excel", "powerpoint", "outlook", "teams", "zoom", "slack",
                "notion", "evernote", "onenote", "calendar", "trello", "jira", "asana",
            ],
        ),
        (
            "web_browsing",
            vec!["chrome", "firefox", "edge", "safari", "opera", "brave", "vivaldi"],
        ),
        (
            "entertainment",
            vec![
                "vlc", "netflix", "spotify", "youtube", "plex", "steam", "discord", "game",
                "player", "media", "music", "video",
            ],
        ),
        (
            "system",
            vec![
                "explorer", "finder", "systemd", "service", "daemon", "kernel", "svchost",
                "winlogon", "init", "launchd", "wininit", "csrss",
            ],
        ),
    ]
    .into_iter()
    .map(|(category, words)| {
        (
            category.to_string(),
            words.into_iter().map(String::from).collect(),
        )
    })
    .collect();

    let patterns: BTreeMap<String, Vec<String>> = [
        (
            "development",
            vec![r"^code", r"^idea", r"^pycharm", r"^eclipse", r"^android.?studio"],
        ),
        (
            "web_browsing",
            vec![r"^chromium", r"^firefox-bin$", r"^msedge"],
        ),
        (
            "system",
            vec![r"^systemd", r"^gnome", r"^kde", r"^xorg", r"^wayland"],
        ),
    ]
    .into_iter()
    .map(|(category, res)| {
        (
            category.to_string(),
            res.into_iter().map(String::from).collect(),
        )
    })
    .collect();

    CategoryRules {
        overrides: BTreeMap::new(),
        keywords,
        patterns,
    }
});

/// Maps a process name to a semantic category.
///
/// Classification is a pure function of (name, rules): it never touches
/// storage and two calls with the same inputs agree.
pub struct Categorizer {
    rules: CategoryRules,
    compiled: BTreeMap<String, Vec<Regex>>,
}

impl Categorizer {
    pub fn new(rules: CategoryRules) -> Self {
        let compiled = compile_rules(&rules);
        Self { rules, compiled }
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    pub fn categorize(&self, name: &str) -> String {
        if let Some(category) = self.rules.overrides.get(name) {
            return category.clone();
        }

        let name_lower = name.to_lowercase();

        for (category, keywords) in &self.rules.keywords {
            if keywords
                .iter()
                .any(|keyword| name_lower.contains(&keyword.to_lowercase()))
            {
                return category.clone();
            }
        }

        for (category, patterns) in &self.compiled {
            if patterns.iter().any(|re| re.is_match(&name_lower)) {
                return category.clone();
            }
        }

        UNCATEGORIZED.to_string()
    }

    // Mutations. Callers persist the whole rules document afterwards.

    pub fn set_override(&mut self, process_name: &str, category: &str) {
        self.rules
            .overrides
            .insert(process_name.to_string(), category.to_string());
    }

    pub fn remove_override(&mut self, process_name: &str) -> bool {
        self.rules.overrides.remove(process_name).is_some()
    }

    pub fn add_keyword(&mut self, category: &str, keyword: &str) {
        let keywords = self.rules.keywords.entry(category.to_string()).or_default();
        if !keywords.iter().any(|k| k == keyword) {
            keywords.push(keyword.to_string());
        }
    }

    pub fn remove_keyword(&mut self, category: &str, keyword: &str) -> bool {
        match self.rules.keywords.get_mut(category) {
            Some(keywords) => {
                let before = keywords.len();
                keywords.retain(|k| k != keyword);
                keywords.len() != before
            }
            None => false,
        }
    }

    pub fn add_pattern(&mut self, category: &str, pattern: &str) -> Result<()> {
        Regex::new(pattern)
            .map_err(|err| WorkpulseError::invalid_pattern(pattern, err.to_string()))?;
        let patterns = self.rules.patterns.entry(category.to_string()).or_default();
        if !patterns.iter().any(|p| p == pattern) {
            patterns.push(pattern.to_string());
            self.compiled = compile_rules(&self.rules);
        }
        Ok(())
    }

    pub fn remove_pattern(&mut self, category: &str, pattern: &str) -> bool {
        let removed = match self.rules.patterns.get_mut(category) {
            Some(patterns) => {
                let before = patterns.len();
                patterns.retain(|p| p != pattern);
                patterns.len() != before
            }
            None => false,
        };
        if removed {
            self.compiled = compile_rules(&self.rules);
        }
        removed
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(CategoryRules::default())
    }
}

fn compile_rules(rules: &CategoryRules) -> BTreeMap<String, Vec<Regex>> {
    rules
        .patterns
        .iter()
        .map(|(category, patterns)| {
            let compiled = patterns
                .iter()
                .filter_map(|pattern| match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(err) => {
                        warn!("skipping invalid category pattern '{pattern}': {err}");
                        None
                    }
                })
                .collect();
            (category.clone(), compiled)
        })
        .collect()
}
