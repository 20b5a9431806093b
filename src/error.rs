//! Error types for trueno-metrics
//!
//! Absence of data is never an error: reading an unknown tag yields an empty
//! series. Everything here is either a broken precondition, malformed stored
//! data, or a failure of the underlying store.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-metrics error types
#[derive(Error, Debug)]
pub enum Error {
    /// Construction-time precondition not met (missing store, nothing to delegate to)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A named entity (e.g. an experiment id) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored record could not be decoded
    #[error("Decode error in '{key}' at line {line}: {source}")]
    Decode {
        /// Metric key whose storage holds the bad record
        key: String,
        /// 1-based line number of the bad record
        line: usize,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A stored row does not fit the record shape (NULL value, negative step)
    #[error("Invalid row for '{key}': {reason}")]
    InvalidRow {
        /// Metric key of the bad row
        key: String,
        /// What is wrong with it
        reason: String,
    },

    /// A metric key cannot be mapped to storage (file backend: empty,
    /// absolute, or containing `.`/`..`/empty segments)
    #[error("Invalid metric key '{0}': expected `/`-separated non-empty segments without `.` or `..`")]
    InvalidKey(String),

    /// A value cannot be stored by the target backend
    #[error("Invalid value for '{key}': {value} (backend stores REAL values only)")]
    InvalidValue {
        /// Metric key the value was reported under
        key: String,
        /// Offending value
        value: serde_json::Value,
    },

    /// `SQLite` error (failed statement, failed commit)
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error while listing metric files
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error returned by a caller-supplied callback
    #[error("Callback failed: {0}")]
    Callback(#[from] anyhow::Error),

    /// Operation attempted after `close()`
    #[error("Handle already closed")]
    Closed,

    /// Shared engine lock poisoned by a panicking holder
    #[error("Engine lock poisoned")]
    Poisoned,
}
