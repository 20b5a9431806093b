//! Relational (`SQLite`) backend.
//!
//! ## Schema
//!
//! ```text
//! experiment (id INTEGER PRIMARY KEY, params JSON)
//!      │
//!      └──< metric (id, experiment_id, run_id, step, tag, value REAL)
//! ```
//!
//! Tables are created only by [`create_tables`]; reporters and readers never
//! create storage. A run has no table of its own: its id is stamped on every
//! metric row, and `(experiment_id, run_id)` scopes what a reader sees.
//!
//! ## Usage
//!
//! ```rust
//! use trueno_metrics::sql::{create_tables, Experiment, SqlEngine, SqlReporter};
//! use trueno_metrics::{metric::metrics, Reader, Reporter};
//!
//! # fn example() -> trueno_metrics::Result<()> {
//! let engine = SqlEngine::in_memory();
//! create_tables(&engine)?;
//!
//! let experiment = Experiment::create(&engine, serde_json::json!({"lr": 0.1}))?;
//! let mut reporter = SqlReporter::new(&engine, &experiment, 1)?;
//! reporter.report_all(0, metrics([("loss", 0.9), ("acc", 0.1)]))?;
//!
//! let reader = reporter.reader().unwrap();
//! assert_eq!(reader.read("loss")?.len(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod engine;
mod experiment;
mod reader;
mod reporter;

pub use engine::SqlEngine;
pub use experiment::{new_experiment, Experiment};
pub use reader::SqlReader;
pub use reporter::SqlReporter;

use tracing::info;

use crate::Result;

/// DDL for both tables.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS experiment (
    id INTEGER PRIMARY KEY,
    params JSON
);
CREATE TABLE IF NOT EXISTS metric (
    id INTEGER PRIMARY KEY,
    experiment_id INTEGER,
    run_id INTEGER,
    step INTEGER,
    tag TEXT,
    value REAL
);
";

/// Create the `experiment` and `metric` tables if they do not exist.
///
/// Run this once against a fresh store before creating any reporter or
/// reader. Connecting to a file store creates the file.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the DDL fails.
pub fn create_tables(engine: &SqlEngine) -> Result<()> {
    engine.with_connection(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
    })?;
    info!(url = %engine.url(), "created metric tables");
    Ok(())
}

/// The `(experiment, run)` pair a reporter writes to and a reader reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scope {
    pub(crate) experiment_id: i64,
    pub(crate) run_id: i64,
}

impl Scope {
    pub(crate) const fn new(experiment: &Experiment, run_id: i64) -> Self {
        Self {
            experiment_id: experiment.id(),
            run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_tables_is_idempotent() {
        let engine = SqlEngine::in_memory();
        create_tables(&engine).unwrap();
        create_tables(&engine).unwrap();

        let count: i64 = engine
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('experiment', 'metric')",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_create_tables_creates_file() {
        let dir = TempDir::new().unwrap();
        let engine = SqlEngine::file(dir.path().join("metrics.db"));
        assert!(!engine.exists());

        create_tables(&engine).unwrap();
        assert!(engine.exists());
    }
}
