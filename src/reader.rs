//! Read-side capability shared by every backend.
//!
//! # Example
//!
//! ```rust
//! use trueno_metrics::{metric::metrics, MemoryReporter, Reader, Reporter};
//!
//! # fn example() -> trueno_metrics::Result<()> {
//! let mut reporter = MemoryReporter::new();
//! reporter.report_all(0, metrics([("loss", 0.9)]))?;
//!
//! let reader = reporter.reader().unwrap();
//! assert_eq!(reader.read("loss")?.len(), 1);
//! assert!(reader.read("never-written")?.is_empty());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::collections::HashMap;

use crate::metric::{MetricKey, Series};
use crate::Result;

/// Lazy sequence of metric keys produced by [`Reader::keys`].
pub type Keys<'a> = Box<dyn Iterator<Item = Result<MetricKey>> + 'a>;

/// Reads back previously reported series.
///
/// Absence of data is never an error: reading a key that was never written
/// returns an empty series.
pub trait Reader {
    /// Every key known to the backing scope.
    ///
    /// Each call starts a fresh sequence. Ordering is backend specific.
    fn keys(&self) -> Result<Keys<'_>>;

    /// The full series for `key`, ascending by step.
    ///
    /// Returns an empty series if the key is unknown.
    fn read(&self, key: &str) -> Result<Series>;

    /// The series for each of `keys`.
    ///
    /// The default maps every requested key, including unknown ones (as an
    /// empty series). Backends that override this document their own absence
    /// representation.
    fn read_all(&self, keys: &[MetricKey]) -> Result<HashMap<MetricKey, Series>> {
        read_each(self, keys)
    }

    /// Release backend resources. Calling it more than once is a no-op.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Default `read_all`: one [`Reader::read`] per requested key.
///
/// # Errors
///
/// Propagates the first error returned by `read`.
pub fn read_each<R: Reader + ?Sized>(
    reader: &R,
    keys: &[MetricKey],
) -> Result<HashMap<MetricKey, Series>> {
    let mut out = HashMap::with_capacity(keys.len());
    for key in keys {
        out.insert(key.clone(), reader.read(key)?);
    }
    Ok(out)
}

/// Reader over nothing: no keys, every series empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyReader;

impl Reader for EmptyReader {
    fn keys(&self) -> Result<Keys<'_>> {
        Ok(Box::new(std::iter::empty()))
    }

    fn read(&self, _key: &str) -> Result<Series> {
        Ok(Vec::new())
    }
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn keys(&self) -> Result<Keys<'_>> {
        (**self).keys()
    }

    fn read(&self, key: &str) -> Result<Series> {
        (**self).read(key)
    }

    fn read_all(&self, keys: &[MetricKey]) -> Result<HashMap<MetricKey, Series>> {
        (**self).read_all(keys)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
