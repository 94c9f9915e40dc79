//! Persistence for settings, tasks and statistics.
//!
//! Everything is stored as JSON text under a handful of keys in a
//! key-value backend. Reads and writes go through [`Persistence`], which
//! never fails: a broken backend degrades to defaults and logs a warning.

mod config;
pub mod database;
mod memory;

pub use config::AppConfig;
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Keys under which the stores persist themselves.
pub mod keys {
    pub const SETTINGS: &str = "settings";
    pub const TASKS: &str = "tasks";
    pub const STATISTICS: &str = "statistics";
}

/// Returns `~/.config/pomoflow[-dev]/` based on POMOFLOW_ENV.
///
/// Set POMOFLOW_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POMOFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pomoflow-dev")
    } else {
        base_dir.join("pomoflow")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Raw string key-value backend.
pub trait KeyValueStore {
    /// Read the value stored under `key`, `None` if absent.
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value under `key`.
    fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Typed, failure-tolerant access to a [`KeyValueStore`].
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Ephemeral persistence, lost on drop.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Load the value under `key`, or `T::default()` if it is missing,
    /// unreadable or fails to deserialize.
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.get_raw(key) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key, error = %e, "stored value is corrupt, using defaults");
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "load failed, using defaults");
                T::default()
            }
        }
    }

    /// Best-effort write. Returns whether the value reached the backend.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                let err = StorageError::Serialization {
                    key: key.to_string(),
                    message: e.to_string(),
                };
                tracing::warn!(error = %err, "save skipped");
                return false;
            }
        };
        match self.store.put_raw(key, &json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "save failed, keeping in-memory state");
                false
            }
        }
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}
