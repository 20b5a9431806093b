use super::Reporter;
use crate::metric::{MetricValue, Metrics, Step};
use crate::{EmptyReader, Reader, Result};

/// A reporter that ignores every value.
///
/// Useful as a default or to switch reporting off. Its reader is an
/// [`EmptyReader`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl NullReporter {
    /// Create a new null reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reporter for NullReporter {
    fn report_all(&mut self, _step: Step, _metrics: Metrics) -> Result<()> {
        Ok(())
    }

    fn report(&mut self, _step: Step, _key: &str, _value: MetricValue) -> Result<()> {
        Ok(())
    }

    fn reader(&self) -> Option<Box<dyn Reader>> {
        Some(Box::new(EmptyReader))
    }
}
