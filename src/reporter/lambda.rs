use std::fmt;

use tracing::debug;

use super::{report_each, report_one, Reporter};
use crate::metric::{MetricValue, Metrics, Step};
use crate::{Error, Result};

/// Callback invoked for a single value.
pub type ReportFn = Box<dyn FnMut(Step, &str, MetricValue) -> anyhow::Result<()>>;

/// Callback invoked for a batch.
pub type ReportAllFn = Box<dyn FnMut(Step, Metrics) -> anyhow::Result<()>>;

/// Callback invoked once on close.
pub type CloseFn = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Reporter that hands every value to caller-supplied closures.
///
/// Lets an ad hoc destination (a network call, a custom log) act as a
/// [`Reporter`] without a dedicated type. At least one of `report` and
/// `report_all` must be supplied; the missing one delegates to the other.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use trueno_metrics::{LambdaReporter, Reporter};
///
/// # fn example() -> trueno_metrics::Result<()> {
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
///
/// let mut reporter = LambdaReporter::from_report_all(move |step, batch| {
///     sink.lock().unwrap().push((step, batch.len()));
///     Ok(())
/// });
///
/// // No `report` closure: delegates through `report_all`.
/// reporter.report(3, "loss", serde_json::json!(0.5))?;
/// assert_eq!(*seen.lock().unwrap(), vec![(3, 1)]);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct LambdaReporter {
    report: Option<ReportFn>,
    report_all: Option<ReportAllFn>,
    close: Option<CloseFn>,
}

impl LambdaReporter {
    /// Create a reporter from optional callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if both `report` and `report_all` are `None`:
    /// there would be nothing to delegate to.
    pub fn new(
        report: Option<ReportFn>,
        report_all: Option<ReportAllFn>,
        close: Option<CloseFn>,
    ) -> Result<Self> {
        if report.is_none() && report_all.is_none() {
            return Err(Error::Config(
                "Must supply one of `report` and `report_all` to `LambdaReporter`.".to_string(),
            ));
        }

        Ok(Self {
            report,
            report_all,
            close,
        })
    }

    /// Reporter driven by a batch callback only.
    #[must_use]
    pub fn from_report_all<F>(f: F) -> Self
    where
        F: FnMut(Step, Metrics) -> anyhow::Result<()> + 'static,
    {
        Self {
            report: None,
            report_all: Some(Box::new(f)),
            close: None,
        }
    }

    /// Reporter driven by a single-value callback only.
    #[must_use]
    pub fn from_report<F>(f: F) -> Self
    where
        F: FnMut(Step, &str, MetricValue) -> anyhow::Result<()> + 'static,
    {
        Self {
            report: Some(Box::new(f)),
            report_all: None,
            close: None,
        }
    }

    /// Run `f` when the reporter is closed.
    #[must_use]
    pub fn with_close<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        self.close = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for LambdaReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaReporter")
            .field("report", &self.report.is_some())
            .field("report_all", &self.report_all.is_some())
            .field("close", &self.close.is_some())
            .finish()
    }
}

impl Reporter for LambdaReporter {
    fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
        match self.report_all.as_mut() {
            Some(f) => f(step, metrics).map_err(Error::Callback),
            None => report_each(self, step, metrics),
        }
    }

    fn report(&mut self, step: Step, key: &str, value: MetricValue) -> Result<()> {
        match self.report.as_mut() {
            Some(f) => f(step, key, value).map_err(Error::Callback),
            None => report_one(self, step, key, value),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(f) = self.close.take() {
            debug!("closing lambda reporter");
            f().map_err(Error::Callback)?;
        }
        Ok(())
    }
}
