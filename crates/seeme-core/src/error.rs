//! Core error types for seeme-core.
//!
//! The hierarchy separates programming errors in the commitment engine,
//! classified failures reported by the remote collaborator, store-level
//! validation failures and configuration problems.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::habit::HabitId;

/// Core error type for seeme-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Commitment engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Remote collaborator errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// SQLite errors outside of the collaborator boundary
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the state machine itself.
///
/// These indicate a bug or corrupt input rather than a runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A value outside `empty | committed | skipped` reached the cycler.
    #[error("Invalid day state: '{0}'")]
    InvalidState(String),
}

/// Failures reported by a [`RemoteLogStore`](crate::remote::RemoteLogStore).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RemoteError {
    /// The remote rejected a duplicate row
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The addressed row or habit does not exist remotely
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote did not answer in time
    #[error("Remote operation timed out")]
    Timeout,

    /// Any other failure
    #[error("Remote operation failed: {0}")]
    Failure(String),
}

impl RemoteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict(_))
    }
}

/// Store-level errors visible to callers of the optimistic store.
///
/// Remote failures of optimistic operations never show up here; they are
/// resolved into a local correction instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The habit is not part of the local snapshot
    #[error("Habit not found: {0}")]
    HabitNotFound(HabitId),

    /// Committing to a day after the reference date
    #[error("Cannot commit to {date}: it is after {today}")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    /// Habit title is empty after trimming
    #[error("Habit title must not be empty")]
    EmptyTitle,

    /// Remote failure of a pessimistic operation (create, delete, load)
    #[error(transparent)]
    Remote(#[from] RemoteError),
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

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<tokio::time::error::Elapsed> for RemoteError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RemoteError::Timeout
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
