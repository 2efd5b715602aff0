//! Runtime configuration.
//!
//! Read from `config.json` next to the data files, then overridden by
//! `TASKDESK_YEAR` / `TASKDESK_LOG`. Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::error::{DeskError, Result};
use crate::stats::TASKS_STARTED;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Year summed by the `all` statistics period.
    pub stats_year: i32,
    /// Default `tracing` filter directive, e.g. `warn` or `taskdesk=debug`.
    pub log_level: String,
    /// Write logs here instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Metric shown by `taskdesk stats` when none is given.
    pub default_metric: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stats_year: Local::now().year(),
            log_level: "warn".to_string(),
            log_file: None,
            default_metric: TASKS_STARTED.to_string(),
        }
    }
}

impl Config {
    /// Loads `path` if it exists and applies environment overrides.
    pub fn load(path: &Path) -> Result<Config> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw).map_err(|e| {
                DeskError::configuration(format!("cannot parse {}: {}", path.display(), e))
            })?
        } else {
            Config::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(year) = std::env::var("TASKDESK_YEAR") {
            self.stats_year = year.trim().parse().map_err(|_| {
                DeskError::configuration(format!("TASKDESK_YEAR '{}' is not a year", year))
            })?;
        }
        if let Ok(level) = std::env::var("TASKDESK_LOG") {
            self.log_level = level;
        }
        Ok(())
    }
}
