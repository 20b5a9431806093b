use std::io::Write;

use super::Reporter;
use crate::metric::{MetricValue, Metrics, Step};
use crate::Result;

/// Reporter that writes one human-readable line per batch to a sink.
///
/// Line format: `Step 3: acc = 0.400, loss = 0.500`. Numbers are shown with
/// three decimals, strings verbatim, anything else as JSON. Keys appear in
/// batch (key) order.
///
/// The sink is chosen by the caller; there is no process-wide default.
///
/// ```rust
/// use trueno_metrics::{metric::metrics, LoggingReporter, Reporter};
///
/// # fn example() -> trueno_metrics::Result<()> {
/// let mut reporter = LoggingReporter::new(Vec::new());
/// reporter.report_all(3, metrics([("loss", 0.5), ("acc", 0.4)]))?;
///
/// let out = String::from_utf8(reporter.into_inner()).unwrap();
/// assert_eq!(out, "Step 3: acc = 0.400, loss = 0.500\n");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug)]
pub struct LoggingReporter<W: Write> {
    sink: W,
}

impl<W: Write> LoggingReporter<W> {
    /// Create a reporter writing to `sink`.
    #[must_use]
    pub const fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Get a reference to the sink.
    #[must_use]
    pub const fn sink(&self) -> &W {
        &self.sink
    }

    /// Consume the reporter, returning the sink.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Render one value for a log line.
fn format_value(value: &MetricValue) -> String {
    match value {
        MetricValue::Number(n) => n
            .as_f64()
            .map_or_else(|| n.to_string(), |f| format!("{f:.3}")),
        MetricValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a whole batch as a log line (without the trailing newline).
fn format_line(step: Step, metrics: &Metrics) -> String {
    let body = metrics
        .iter()
        .map(|(k, v)| format!("{k} = {}", format_value(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Step {step}: {body}")
}

impl<W: Write> Reporter for LoggingReporter<W> {
    fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
        writeln!(self.sink, "{}", format_line(step, &metrics))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
