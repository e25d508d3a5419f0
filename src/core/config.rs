//! Whole-document configuration store.
//!
//! Three JSON documents live under the config directory: filter settings,
//! category rules and alert rules. Each is loaded once at startup and
//! rewritten whole on every mutation; a missing or corrupt document is
//! replaced with compiled-in defaults which are persisted immediately.

use std::fs;
use std::path::PathBuf;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::monitor::alerts::{default_rules, AlertRule};
use crate::core::monitor::categorizer::CategoryRules;
use crate::core::monitor::filter::FilterSettings;
use crate::error::{Result, WorkpulseError};

const FILTER_FILE: &str = "filter.json";
const CATEGORIES_FILE: &str = "categories.json";
const ALERTS_FILE: &str = "alerts.json";

pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Open the store at the platform config directory.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| WorkpulseError::config("could not determine config directory"))?
            .join("workpulse");
        Self::open(dir)
    }

    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    pub fn load_filter(&self) -> FilterSettings {
        self.load_or_init(FILTER_FILE, FilterSettings::default)
    }

    pub fn save_filter(&self, settings: &FilterSettings) -> Result<()> {
        self.save(FILTER_FILE, settings)
    }

    pub fn load_categories(&self) -> CategoryRules {
        self.load_or_init(CATEGORIES_FILE, CategoryRules::default)
    }

    pub fn save_categories(&self, rules: &CategoryRules) -> Result<()> {
        self.save(CATEGORIES_FILE, rules)
    }

    pub fn load_alert_rules(&self) -> Vec<AlertRule> {
        self.load_or_init(ALERTS_FILE, default_rules)
    }

    pub fn save_alert_rules(&self, rules: &[AlertRule]) -> Result<()> {
        self.save(ALERTS_FILE, &rules.to_vec())
    }

    fn load_or_init<T, F>(&self, file: &str, default: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let path = self.dir.join(file);

        match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(value) => return value,
                Err(err) => {
                    warn!("config document {file} is corrupt ({err}), using defaults");
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!("could not read config document {file}: {err}, using defaults");
            }
        }

        let value = default();
        if let Err(err) = self.save(file, &value) {
            warn!("could not persist default config document {file}: {err}");
        }
        value
    }

    /// Write the whole document atomically: serialize to a temp file in the
    /// same directory and rename it into place.
    fn save<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let data = serde_json::to_string_pretty(value)?;
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));

        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
