//! Core error types for pomoflow-core.
//!
//! Validation errors are returned synchronously from mutating calls.
//! Storage and dispatch errors are normally swallowed and logged by the
//! layer above; they only surface from the low-level adapters.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomoflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected at a store boundary
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No task with the given id
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Numeric field outside its allowed range
    #[error("'{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Title is blank after trimming
    #[error("Title must not be empty")]
    EmptyTitle,

    /// Title longer than the allowed number of characters
    #[error("Title must be at most {max} characters, got {len}")]
    TitleLength { len: usize, max: usize },

    /// Reorder list is not a permutation of the current ids
    #[error("Invalid task order: {0}")]
    InvalidOrder(String),
}

/// Key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored value could not be (de)serialized
    #[error("Serialization failed for '{key}': {message}")]
    Serialization { key: String, message: String },

    /// The data directory could not be created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Dot-path key does not exist
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// Value could not be converted to the key's type
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures from sound, notification and achievement adapters.
///
/// These are never fatal; the coordinator logs and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The environment has no such capability
    #[error("Capability not supported in this environment")]
    Unsupported,

    /// The user has not granted permission
    #[error("Permission denied")]
    PermissionDenied,

    /// Anything else
    #[error("Dispatch failed: {0}")]
    Failed(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl ValidationError {
    pub(crate) fn out_of_range(field: &str, value: i64, min: i64, max: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
