//! In-memory backend using `DashMap`.
//!
//! This is the default backend - data is lost on process restart. The
//! reporter and every reader it hands out share one [`MemoryStore`], so a
//! reader sees values reported after it was created (live tailing). The store
//! lives as long as its longest holder.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace};

use crate::metric::{sort_by_step, MetricKey, Metrics, Point, Series, Step};
use crate::reader::Keys;
use crate::{Reader, Reporter, Result};

/// Shared backing map: metric key to the points reported under it, in write
/// order.
pub type MemoryStore = Arc<DashMap<MetricKey, Series, FxBuildHasher>>;

/// Create an empty [`MemoryStore`].
#[must_use]
pub fn new_store() -> MemoryStore {
    Arc::new(DashMap::with_hasher(FxBuildHasher))
}

/// Reporter that keeps every point in a [`MemoryStore`].
///
/// Each value is stored together with the step it was reported at, so
/// skipped or repeated steps come back exactly as reported.
///
/// # Example
///
/// ```rust
/// use trueno_metrics::{metric::metrics, MemoryReporter, Reporter};
///
/// # fn example() -> trueno_metrics::Result<()> {
/// let mut reporter = MemoryReporter::new();
/// let reader = reporter.reader().unwrap();
///
/// reporter.report_all(0, metrics([("loss", 0.9)]))?;
/// reporter.report_all(1, metrics([("loss", 0.5)]))?;
///
/// // The reader was created first and still sees both points.
/// assert_eq!(reader.read("loss")?.len(), 2);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryReporter {
    store: MemoryStore,
}

impl MemoryReporter {
    /// Create a reporter over a fresh store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(new_store())
    }

    /// Create a reporter over a caller-owned store; the store is mutated as
    /// values arrive.
    #[must_use]
    pub const fn with_store(store: MemoryStore) -> Self {
        Self { store }
    }

    /// Get the backing store.
    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Number of keys with at least one point.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Erase every key and its points from the backing store.
    ///
    /// Readers sharing the store observe the erasure.
    pub fn clear(&self) {
        self.store.clear();
    }
}

impl Default for MemoryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for MemoryReporter {
    fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
        debug!(step, entries = metrics.len(), "memory report_all");
        for (key, value) in metrics {
            self.store.entry(key).or_default().push(Point::new(step, value));
        }
        Ok(())
    }

    fn reader(&self) -> Option<Box<dyn Reader>> {
        Some(Box::new(MemoryReader::new(Arc::clone(&self.store))))
    }
}

/// Read-only view over a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryReader {
    store: MemoryStore,
}

impl MemoryReader {
    /// Create a reader over `store`.
    #[must_use]
    pub const fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

impl Reader for MemoryReader {
    /// Keys in hash order.
    ///
    /// The key set is snapshotted when the call is made, so no map lock is
    /// held while the caller iterates.
    fn keys(&self) -> Result<Keys<'_>> {
        let keys: Vec<MetricKey> = self.store.iter().map(|e| e.key().clone()).collect();
        Ok(Box::new(keys.into_iter().map(Ok)))
    }

    fn read(&self, key: &str) -> Result<Series> {
        let mut series = self
            .store
            .get(key)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        sort_by_step(&mut series);
        trace!(key, points = series.len(), "memory read");
        Ok(series)
    }
}
