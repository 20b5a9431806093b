//! Write-side capability and the reporters that persist nothing themselves.
//!
//! A backend implements [`Reporter::report_all`]; single-value
//! [`Reporter::report`] defaults to a one-entry batch. Backends whose natural
//! unit is a single value go the other way and implement `report_all` with
//! [`report_each`].
//!
//! | Reporter | Persists | Reader |
//! |----------|----------|--------|
//! | [`NullReporter`] | nothing | [`EmptyReader`](crate::EmptyReader) |
//! | [`LambdaReporter`] | whatever the closures do | none |
//! | [`LoggingReporter`] | formatted lines to a sink | none |

mod lambda;
mod logging;
mod null;

pub use lambda::{CloseFn, LambdaReporter, ReportAllFn, ReportFn};
pub use logging::LoggingReporter;
pub use null::NullReporter;

use crate::metric::{MetricKey, MetricValue, Metrics, Step};
use crate::{Reader, Result};

/// Persists metric values reported at integer steps.
pub trait Reporter {
    /// Report every `(key, value)` pair of `metrics` at `step`.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure unchanged (failed commit, IO error, ...).
    fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()>;

    /// Report a single value.
    ///
    /// Defaults to [`Reporter::report_all`] with a one-entry batch.
    ///
    /// # Errors
    ///
    /// See [`Reporter::report_all`].
    fn report(&mut self, step: Step, key: &str, value: MetricValue) -> Result<()> {
        report_one(self, step, key, value)
    }

    /// A reader over what this reporter has written, if the backend supports
    /// reading.
    fn reader(&self) -> Option<Box<dyn Reader>> {
        None
    }

    /// Release the storage handle. Calling it more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns any error raised while flushing pending writes.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Default `report`: a one-entry [`Reporter::report_all`].
///
/// # Errors
///
/// Propagates the error returned by `report_all`.
pub fn report_one<R: Reporter + ?Sized>(
    reporter: &mut R,
    step: Step,
    key: &str,
    value: MetricValue,
) -> Result<()> {
    let mut batch = Metrics::new();
    batch.insert(MetricKey::from(key), value);
    reporter.report_all(step, batch)
}

/// `report_all` expressed as one [`Reporter::report`] per entry.
///
/// For reporters that implement `report` natively; such a reporter's
/// `report_all` calls this.
///
/// # Errors
///
/// Stops at, and returns, the first failing `report`.
pub fn report_each<R: Reporter + ?Sized>(
    reporter: &mut R,
    step: Step,
    metrics: Metrics,
) -> Result<()> {
    for (key, value) in metrics {
        reporter.report(step, &key, value)?;
    }
    Ok(())
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
        (**self).report_all(step, metrics)
    }

    fn report(&mut self, step: Step, key: &str, value: MetricValue) -> Result<()> {
        (**self).report(step, key, value)
    }

    fn reader(&self) -> Option<Box<dyn Reader>> {
        (**self).reader()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Records every batch it sees.
    #[derive(Default)]
    struct BatchLog(Vec<(Step, Metrics)>);

    impl Reporter for BatchLog {
        fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
            self.0.push((step, metrics));
            Ok(())
        }
    }

    /// Implements single-value `report` natively.
    #[derive(Default)]
    struct SingleLog(Vec<(Step, String, MetricValue)>);

    impl Reporter for SingleLog {
        fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
            report_each(self, step, metrics)
        }

        fn report(&mut self, step: Step, key: &str, value: MetricValue) -> Result<()> {
            self.0.push((step, key.to_string(), value));
            Ok(())
        }
    }

    #[test]
    fn test_report_defaults_to_single_entry_batch() {
        let mut log = BatchLog::default();
        log.report(4, "loss", json!(0.25)).unwrap();

        assert_eq!(log.0.len(), 1);
        assert_eq!(log.0[0].0, 4);
        assert_eq!(log.0[0].1.get("loss"), Some(&json!(0.25)));
    }

    #[test]
    fn test_report_each_splits_batch() {
        let mut log = SingleLog::default();
        let batch = crate::metric::metrics([("a", 1), ("b", 2)]);
        log.report_all(7, batch).unwrap();

        assert_eq!(
            log.0,
            vec![
                (7, "a".to_string(), json!(1)),
                (7, "b".to_string(), json!(2)),
            ]
        );
    }

    #[test]
    fn test_default_reader_and_close() {
        let mut log = BatchLog::default();
        assert!(log.reader().is_none());
        log.close().unwrap();
        log.close().unwrap();
    }
}
