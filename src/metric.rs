//! Metric model - the vocabulary shared by every reporter and reader
//!
//! ## Time-Series Shape
//!
//! A tag (`MetricKey`) names one series. Each point of a series carries the
//! step it was reported at and its value:
//!
//! ```text
//! "loss" ──> [ {step: 0, value: 0.9}, {step: 1, value: 0.5}, ... ]
//! ```
//!
//! Readers always return points in ascending step order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of one time series (a "tag").
pub type MetricKey = String;

/// Position of a point within a series.
pub type Step = u64;

/// A metric value: a number, or any JSON-compatible structure.
pub type MetricValue = serde_json::Value;

/// One batch of values reported at a single step.
///
/// Ordered by key, so batch handling and log output are deterministic.
pub type Metrics = BTreeMap<MetricKey, MetricValue>;

/// The full series for one key.
pub type Series = Vec<Point>;

/// A single `(step, value)` point of a series.
///
/// Serializes as `{"step": 3, "value": 0.5}`, which is also the line format
/// of the file backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    step: Step,
    value: MetricValue,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub fn new(step: Step, value: impl Into<MetricValue>) -> Self {
        Self {
            step,
            value: value.into(),
        }
    }

    /// Get the step.
    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    /// Get the value.
    #[must_use]
    pub const fn value(&self) -> &MetricValue {
        &self.value
    }

    /// Get the value as `f64`, if it is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }

    /// Split the point into its step and value.
    #[must_use]
    pub fn into_parts(self) -> (Step, MetricValue) {
        (self.step, self.value)
    }
}

/// Build a batch from `(key, value)` pairs.
///
/// ```rust
/// use trueno_metrics::metric::metrics;
///
/// let batch = metrics([("loss", 0.9), ("acc", 0.1)]);
/// assert_eq!(batch.len(), 2);
/// ```
pub fn metrics<K, V, I>(pairs: I) -> Metrics
where
    K: Into<MetricKey>,
    V: Into<MetricValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Stable sort by step: points sharing a step keep their write order.
pub(crate) fn sort_by_step(series: &mut Series) {
    series.sort_by_key(Point::step);
}
