use rusqlite::params;
use tracing::debug;

use super::{Experiment, Scope, SqlEngine, SqlReader};
use crate::metric::{Metrics, Step};
use crate::{Error, Reader, Reporter, Result};

/// Reporter writing metric rows for one `(experiment, run)` pair.
///
/// Each [`report_all`](Reporter::report_all) batch is inserted in a single
/// transaction: either every row of the batch commits or none does.
#[derive(Debug)]
pub struct SqlReporter {
    engine: Option<SqlEngine>,
    scope: Scope,
}

impl SqlReporter {
    /// Create a reporter for `run_id` under `experiment`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the store does not exist yet. This
    /// reporter never creates storage; call
    /// [`create_tables`](super::create_tables) first.
    pub fn new(engine: &SqlEngine, experiment: &Experiment, run_id: i64) -> Result<Self> {
        engine.require_exists("reporter")?;
        let scope = Scope::new(experiment, run_id);
        debug!(url = %engine.url(), experiment_id = scope.experiment_id, run_id, "opened sql reporter");
        Ok(Self {
            engine: Some(engine.clone()),
            scope,
        })
    }

    /// Get the experiment ID rows are stamped with.
    #[must_use]
    pub const fn experiment_id(&self) -> i64 {
        self.scope.experiment_id
    }

    /// Get the run ID rows are stamped with.
    #[must_use]
    pub const fn run_id(&self) -> i64 {
        self.scope.run_id
    }

    fn engine(&self) -> Result<&SqlEngine> {
        self.engine.as_ref().ok_or(Error::Closed)
    }
}

impl Reporter for SqlReporter {
    fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
        let engine = self.engine()?;
        let scope = self.scope;

        let step_col = i64::try_from(step).map_err(|_| Error::InvalidValue {
            key: "step".to_string(),
            value: step.into(),
        })?;
        let rows = metrics
            .into_iter()
            .map(|(tag, value)| match value.as_f64() {
                Some(v) => Ok((tag, v)),
                None => Err(Error::InvalidValue { key: tag, value }),
            })
            .collect::<Result<Vec<_>>>()?;

        engine.with_connection(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO metric (experiment_id, run_id, step, tag, value) VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (tag, value) in &rows {
                    stmt.execute(params![scope.experiment_id, scope.run_id, step_col, tag, value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })?;

        debug!(
            step,
            rows = rows.len(),
            experiment_id = scope.experiment_id,
            run_id = scope.run_id,
            "sql report_all committed"
        );
        Ok(())
    }

    fn reader(&self) -> Option<Box<dyn Reader>> {
        let engine = self.engine.clone()?;
        Some(Box::new(SqlReader::scoped(engine, self.scope)))
    }

    fn close(&mut self) -> Result<()> {
        if self.engine.take().is_some() {
            debug!(
                experiment_id = self.scope.experiment_id,
                run_id = self.scope.run_id,
                "closed sql reporter"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{metrics, Point};
    use crate::sql::create_tables;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (SqlEngine, Experiment) {
        let engine = SqlEngine::in_memory();
        create_tables(&engine).unwrap();
        let exp = Experiment::create(&engine, json!({"lr": 0.1})).unwrap();
        (engine, exp)
    }

    fn row_count(engine: &SqlEngine) -> i64 {
        engine
            .with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM metric", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_sql_reporter_requires_existing_store() {
        let dir = TempDir::new().unwrap();
        let engine = SqlEngine::file(dir.path().join("metrics.db"));
        let (_, exp) = setup();

        let err = SqlReporter::new(&engine, &exp, 1).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!engine.exists(), "reporter must not create the store");
    }

    #[test]
    fn test_sql_report_all_writes_rows() {
        let (engine, exp) = setup();
        let mut reporter = SqlReporter::new(&engine, &exp, 1).unwrap();
        reporter.report_all(0, metrics([("loss", 0.9), ("acc", 0.1)])).unwrap();
        reporter.report(1, "loss", json!(0.5)).unwrap();

        assert_eq!(row_count(&engine), 3);
        assert_eq!(reporter.experiment_id(), exp.id());
        assert_eq!(reporter.run_id(), 1);
    }

    #[test]
    fn test_sql_non_numeric_batch_is_rejected_whole() {
        let (engine, exp) = setup();
        let mut reporter = SqlReporter::new(&engine, &exp, 1).unwrap();

        let batch = metrics([("loss", json!(0.9)), ("phase", json!("train"))]);
        let err = reporter.report_all(0, batch).unwrap_err();

        assert!(matches!(err, Error::InvalidValue { ref key, .. } if key == "phase"));
        assert_eq!(row_count(&engine), 0);
    }

    #[test]
    fn test_sql_reporter_reader() {
        let (engine, exp) = setup();
        let mut reporter = SqlReporter::new(&engine, &exp, 1).unwrap();
        reporter.report(0, "loss", json!(0.9)).unwrap();

        let reader = reporter.reader().unwrap();
        assert_eq!(reader.read("loss").unwrap(), vec![Point::new(0, 0.9)]);
    }

    #[test]
    fn test_sql_reporter_close() {
        let (engine, exp) = setup();
        let mut reporter = SqlReporter::new(&engine, &exp, 1).unwrap();
        reporter.close().unwrap();
        reporter.close().unwrap();

        assert!(reporter.reader().is_none());
        assert!(matches!(
            reporter.report(0, "loss", json!(1.0)),
            Err(Error::Closed)
        ));
    }
}
