use std::collections::HashMap;

use itertools::Itertools;
use rusqlite::{params, Row};
use serde_json::Number;
use tracing::{debug, trace};

use super::{Experiment, Scope, SqlEngine};
use crate::metric::{MetricKey, Point, Series, Step};
use crate::reader::Keys;
use crate::{Error, Reader, Result};

/// Reader over the metric rows of one `(experiment, run)` pair.
///
/// Series come back ordered by step; rows sharing a step keep insertion
/// order. Unlike the default [`Reader::read_all`], a requested key with no
/// rows is left out of the returned map.
#[derive(Debug)]
pub struct SqlReader {
    engine: Option<SqlEngine>,
    scope: Scope,
}

impl SqlReader {
    /// Create a reader for `run_id` under `experiment`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the store does not exist yet.
    pub fn new(engine: &SqlEngine, experiment: &Experiment, run_id: i64) -> Result<Self> {
        engine.require_exists("reader")?;
        let reader = Self::scoped(engine.clone(), Scope::new(experiment, run_id));
        debug!(
            url = %engine.url(),
            experiment_id = reader.scope.experiment_id,
            run_id,
            "opened sql reader"
        );
        Ok(reader)
    }

    pub(crate) const fn scoped(engine: SqlEngine, scope: Scope) -> Self {
        Self {
            engine: Some(engine),
            scope,
        }
    }

    fn engine(&self) -> Result<&SqlEngine> {
        self.engine.as_ref().ok_or(Error::Closed)
    }
}

/// Raw `(step, value)` cells of a metric row, before validation.
type RawPoint = (i64, Option<f64>);

fn raw_point(row: &Row<'_>, offset: usize) -> rusqlite::Result<RawPoint> {
    Ok((row.get(offset)?, row.get(offset + 1)?))
}

/// Turn stored cells into a [`Point`], rejecting rows that do not fit.
fn to_point(key: &str, (step, value): RawPoint) -> Result<Point> {
    let invalid = |reason: String| Error::InvalidRow {
        key: key.to_string(),
        reason,
    };
    let step = Step::try_from(step).map_err(|_| invalid(format!("negative step {step}")))?;
    let value = value.ok_or_else(|| invalid(format!("NULL value at step {step}")))?;
    let number =
        Number::from_f64(value).ok_or_else(|| invalid(format!("non-finite value at step {step}")))?;
    Ok(Point::new(step, number))
}

impl Reader for SqlReader {
    /// Distinct tags in scope. Rows are fetched when `keys()` is called.
    fn keys(&self) -> Result<Keys<'_>> {
        let scope = self.scope;
        let tags = self.engine()?.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT DISTINCT tag FROM metric WHERE experiment_id = ?1 AND run_id = ?2",
            )?;
            let tags = stmt
                .query_map(params![scope.experiment_id, scope.run_id], |row| {
                    row.get::<_, MetricKey>(0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tags)
        })?;
        Ok(Box::new(tags.into_iter().map(Ok)))
    }

    fn read(&self, key: &str) -> Result<Series> {
        let scope = self.scope;
        let rows = self.engine()?.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT step, value FROM metric \
                 WHERE experiment_id = ?1 AND run_id = ?2 AND tag = ?3 \
                 ORDER BY step, id",
            )?;
            let rows = stmt
                .query_map(params![scope.experiment_id, scope.run_id, key], |row| {
                    raw_point(row, 0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        trace!(key, points = rows.len(), "sql read");
        rows.into_iter().map(|raw| to_point(key, raw)).collect()
    }

    /// One query for every requested key, grouped in a single pass over the
    /// tag-sorted rows. Keys without rows are omitted.
    fn read_all(&self, keys: &[MetricKey]) -> Result<HashMap<MetricKey, Series>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let scope = self.scope;

        // The key list travels as one JSON array parameter, so any number of
        // keys fits under SQLite's bound-parameter limit.
        let requested = serde_json::to_string(keys)?;
        let rows = self.engine()?.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT tag, step, value FROM metric \
                 WHERE experiment_id = ?1 AND run_id = ?2 \
                 AND tag IN (SELECT value FROM json_each(?3)) \
                 ORDER BY tag, step, id",
            )?;
            let rows = stmt
                .query_map(params![scope.experiment_id, scope.run_id, requested], |row| {
                    Ok((row.get::<_, MetricKey>(0)?, raw_point(row, 1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut out = HashMap::with_capacity(keys.len());
        for (tag, group) in &rows.into_iter().group_by(|(tag, _)| tag.clone()) {
            let series = group
                .map(|(_, raw)| to_point(&tag, raw))
                .collect::<Result<Series>>()?;
            out.insert(tag, series);
        }
        trace!(requested = keys.len(), found = out.len(), "sql read_all");
        Ok(out)
    }

    fn close(&mut self) -> Result<()> {
        if self.engine.take().is_some() {
            debug!(
                experiment_id = self.scope.experiment_id,
                run_id = self.scope.run_id,
                "closed sql reader"
            );
        }
        Ok(())
    }
}
