//! Core error types for pomocycle-core.
//!
//! The session machine distinguishes between a rejected call (nothing
//! happened) and a transition that happened but could not be saved.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::Phase;

/// Core error type for pomocycle-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session machine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Persistence errors outside of a transition (open, load)
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

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

/// Errors returned by [`crate::timer::SessionMachine`] operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The operation is not allowed from the current phase. State is unchanged.
    #[error("cannot {operation} while {phase}")]
    IllegalTransition {
        operation: &'static str,
        phase: Phase,
    },

    /// The transition took effect in memory but the save failed.
    /// The next transition (or `flush`) retries the write.
    #[error("transition applied but not persisted: {0}")]
    NotPersisted(#[source] PersistError),
}

/// Errors raised by a [`crate::storage::SessionStore`].
#[derive(Error, Debug)]
pub enum PersistError {
    /// Underlying database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Stored record could not be decoded into a valid session
    #[error("stored session is corrupt: {0}")]
    Corrupt(String),

    /// Storage backend is not reachable
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for PersistError {
    fn from(err: rusqlite::Error) -> Self {
        PersistError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
