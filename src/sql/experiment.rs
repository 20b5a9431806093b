//! Experiment row - groups the runs that share one configuration

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::SqlEngine;
use crate::{Error, Result};

/// Experiment Record represents a row of the `experiment` table.
///
/// Every metric row written by a [`SqlReporter`](super::SqlReporter) carries
/// its experiment's id. Experiments are immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    id: i64,
    params: serde_json::Value,
}

impl Experiment {
    /// Insert a new experiment with the given parameters.
    ///
    /// # Arguments
    ///
    /// * `engine` - Store whose tables already exist (see [`create_tables`](super::create_tables))
    /// * `params` - Arbitrary JSON configuration shared by the experiment's runs
    ///
    /// # Returns
    ///
    /// The stored experiment, carrying its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. tables were never created).
    pub fn create(engine: &SqlEngine, params: serde_json::Value) -> Result<Self> {
        // Stored as a BLOB: numeric affinity would turn `1.0` text into the
        // integer 1.
        let encoded = serde_json::to_vec(&params)?;
        let id = engine.with_connection(|conn| {
            conn.execute("INSERT INTO experiment (params) VALUES (?1)", params![encoded])?;
            Ok(conn.last_insert_rowid())
        })?;
        info!(experiment_id = id, "created experiment");
        Ok(Self { id, params })
    }

    /// Fetch an existing experiment by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no experiment has this id.
    pub fn load(engine: &SqlEngine, id: i64) -> Result<Self> {
        let raw = engine.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT params FROM experiment WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, SqlValue>(0),
                )
                .optional()?)
        })?;

        let raw = raw.ok_or_else(|| Error::NotFound(format!("experiment {id}")))?;
        Ok(Self {
            id,
            params: params_from_sql(raw)?,
        })
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Get the experiment parameters.
    #[must_use]
    pub const fn params(&self) -> &serde_json::Value {
        &self.params
    }
}

/// Create a new experiment; shorthand for [`Experiment::create`].
///
/// # Errors
///
/// See [`Experiment::create`].
pub fn new_experiment(engine: &SqlEngine, params: serde_json::Value) -> Result<Experiment> {
    Experiment::create(engine, params)
}

/// Decode a `params` cell. Rows written by this crate hold a JSON blob;
/// text and numeric cells come from other writers.
fn params_from_sql(raw: SqlValue) -> Result<serde_json::Value> {
    Ok(match raw {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Integer(i) => serde_json::Value::from(i),
        SqlValue::Real(f) => serde_json::Value::from(f),
        SqlValue::Text(text) => serde_json::from_str(&text)?,
        SqlValue::Blob(bytes) => serde_json::from_slice(&bytes)?,
    })
}
