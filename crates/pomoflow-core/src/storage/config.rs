//! TOML-based application configuration.
//!
//! Holds process-level knobs that are not user settings:
//! - Log filter for the front end
//! - Database file name
//! - Auto-start delay and achievement display interval
//!
//! Configuration is stored at `~/.config/pomoflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pomoflow/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `tracing` filter directive used when POMOFLOW_LOG is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// SQLite file inside the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,
    /// Pause between a completion and an automatic start of the next mode.
    #[serde(default = "default_auto_start_delay_ms")]
    pub auto_start_delay_ms: u64,
    /// Minimum gap between two achievement popups.
    #[serde(default = "default_achievement_display_interval_ms")]
    pub achievement_display_interval_ms: u64,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_database_file() -> String {
    "pomoflow.db".into()
}
fn default_auto_start_delay_ms() -> u64 {
    1500
}
fn default_achievement_display_interval_ms() -> u64 {
    4000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            database_file: default_database_file(),
            auto_start_delay_ms: default_auto_start_delay_ms(),
            achievement_display_interval_ms: default_achievement_display_interval_ms(),
        }
    }
}

impl AppConfig {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "config unavailable, using defaults");
                Self::default()
            }
        }
    }

    pub fn auto_start_delay(&self) -> Duration {
        Duration::from_millis(self.auto_start_delay_ms)
    }

    pub fn achievement_display_interval(&self) -> Duration {
        Duration::from_millis(self.achievement_display_interval_ms)
    }
}
