//! Backend selection from configuration.
//!
//! ```json
//! {"backend": "sql", "path": "metrics.db", "experiment_id": 1, "run_id": 3}
//! ```

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sql::{Experiment, SqlEngine, SqlReporter};
use crate::{FsReporter, LoggingReporter, MemoryReporter, NullReporter, Reporter, Result};

/// Standard stream a [`LoggingReporter`] writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Standard output
    #[default]
    Stdout,
    /// Standard error
    Stderr,
}

/// Which backend to report to, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-memory store, lost on exit
    #[default]
    Memory,
    /// Discard everything
    Null,
    /// Human-readable lines on a standard stream
    Logging {
        /// Target stream
        #[serde(default)]
        stream: Stream,
    },
    /// `.jsonl` files under `root`
    File {
        /// Metric root directory (created if missing)
        root: PathBuf,
    },
    /// Rows of an existing `SQLite` store
    Sql {
        /// Database file; must already hold the tables
        path: PathBuf,
        /// Experiment the rows belong to
        experiment_id: i64,
        /// Run the rows belong to
        run_id: i64,
    },
}

impl BackendConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) for malformed input or an
    /// unknown backend.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Name of the selected backend, as written in the `backend` field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Null => "null",
            Self::Logging { .. } => "logging",
            Self::File { .. } => "file",
            Self::Sql { .. } => "sql",
        }
    }

    /// Build the configured reporter.
    ///
    /// # Errors
    ///
    /// Propagates the backend's construction errors: a missing SQL store is
    /// [`Error::Config`](crate::Error::Config), an unknown experiment id is
    /// [`Error::NotFound`](crate::Error::NotFound).
    pub fn build_reporter(&self) -> Result<Box<dyn Reporter>> {
        let reporter: Box<dyn Reporter> = match self {
            Self::Memory => Box::new(MemoryReporter::new()),
            Self::Null => Box::new(NullReporter::new()),
            Self::Logging {
                stream: Stream::Stdout,
            } => Box::new(LoggingReporter::new(io::stdout())),
            Self::Logging {
                stream: Stream::Stderr,
            } => Box::new(LoggingReporter::new(io::stderr())),
            Self::File { root } => Box::new(FsReporter::new(root)?),
            Self::Sql {
                path,
                experiment_id,
                run_id,
            } => {
                let engine = SqlEngine::file(path);
                engine.require_exists("reporter")?;
                let experiment = Experiment::load(&engine, *experiment_id)?;
                Box::new(SqlReporter::new(&engine, &experiment, *run_id)?)
            }
        };
        info!(backend = self.name(), "built reporter from config");
        Ok(reporter)
    }
}
