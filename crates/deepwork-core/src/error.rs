//! Core error types for deepwork-core.
//!
//! User-initiated operations (start, add, update, import, export) surface these
//! errors synchronously. Opportunistic snapshot writes log and retry instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerPhase;

/// Core error type for deepwork-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// `start` was called with a non-positive planned duration.
    #[error("Invalid duration: planned time must be greater than zero (got {minutes} min)")]
    InvalidDuration { minutes: i64 },

    /// A timer command was issued in a phase that does not accept it.
    #[error("Cannot {action} while timer is {from:?}")]
    InvalidTransition {
        from: TimerPhase,
        action: &'static str,
    },

    /// Session data failed validation.
    #[error("Invalid session: {0}")]
    InvalidSession(#[from] ValidationError),

    /// Referenced session does not exist.
    #[error("Session {id} not found")]
    NotFound { id: i64 },

    /// Backup document failed the schema check.
    #[error("Invalid backup format: {0}")]
    InvalidFormat(String),

    /// Persistence layer is inaccessible.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors.
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Backing store rejected the write (used by in-memory stores in tests).
    #[error("Backing store unavailable: {0}")]
    Unavailable(String),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Duration must be positive
    #[error("duration must be greater than zero (got {0})")]
    NonPositiveDuration(i64),

    /// Rating must be within 1..=5
    #[error("rating must be between 1 and 5 (got {0})")]
    RatingOutOfRange(i64),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
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

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::StorageUnavailable(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
