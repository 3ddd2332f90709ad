//! Runner configuration.
//!
//! Layers, later wins: built-in defaults, optional TOML file, environment
//! (`.env` is loaded first), command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_DB: &str = "SMART_BACKUP_DB";
pub const ENV_LOG_LEVEL: &str = "SMART_BACKUP_LOG_LEVEL";
pub const ENV_DISPLAY_LIMIT: &str = "SMART_BACKUP_DISPLAY_LIMIT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// SQLite database holding projects, mappings and run history
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Entries shown per list in analysis reports (-1 = unlimited)
    #[serde(default = "default_display_limit")]
    pub display_limit: i64,

    /// Store per-file details after every backup
    #[serde(default)]
    pub auto_save_details: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("smartbackup.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_display_limit() -> i64 {
    backup_engine::analysis::DEFAULT_DISPLAY_LIMIT as i64
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            display_limit: default_display_limit(),
            auto_save_details: false,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RunnerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults or `path`, then environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides; unparsable numbers are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DB) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(limit) = lookup(ENV_DISPLAY_LIMIT).and_then(|v| v.parse().ok()) {
            self.display_limit = limit;
        }
    }

    /// Command-line overrides
    pub fn apply_cli(&mut self, db: Option<PathBuf>, log_level: Option<String>) {
        if let Some(db) = db {
            self.db_path = db;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
    }

    /// Display limit as the engine takes it
    pub fn display_limit(&self) -> Option<usize> {
        display_limit_from(self.display_limit)
    }
}

/// Negative values mean unlimited
pub fn display_limit_from(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}
