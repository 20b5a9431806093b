use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use super::{jsonl_path, key_for_path, validate_key};
use crate::metric::{sort_by_step, Point, Series};
use crate::reader::Keys;
use crate::{Error, Reader, Result};

/// Reader over a directory of `.jsonl` series files.
///
/// A missing series file reads as an empty series. A line that does not
/// decode as a point is an [`Error::Decode`]; it is never skipped.
#[derive(Debug, Clone)]
pub struct FsReader {
    root: Option<PathBuf>,
}

impl FsReader {
    /// Open a reader rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `root` is not an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "{} is not a directory! Create the metric root before creating a reader.",
                root.display()
            )));
        }
        debug!(root = %root.display(), "opened file reader");
        Ok(Self { root: Some(root) })
    }

    /// Reader over a root the caller already knows exists.
    pub(crate) const fn at(root: PathBuf) -> Self {
        Self { root: Some(root) }
    }

    /// Get the root directory, or [`Error::Closed`] after `close()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] once the reader has been closed.
    pub fn root(&self) -> Result<&Path> {
        self.root.as_deref().ok_or(Error::Closed)
    }
}

/// Decode the non-empty lines of one series file.
fn decode_lines(key: &str, content: &str) -> Result<Series> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Point>(line).map_err(|source| Error::Decode {
                key: key.to_string(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

impl Reader for FsReader {
    /// Keys of every `.jsonl` file under the root, in walk order.
    fn keys(&self) -> Result<Keys<'_>> {
        let root = self.root()?;
        let keys = WalkDir::new(root).into_iter().filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => key_for_path(root, entry.path()).map(Ok),
            Ok(_) => None,
            Err(e) => Some(Err(Error::from(e))),
        });
        Ok(Box::new(keys))
    }

    /// Series for `key`. A key that cannot name a file under the root was
    /// never written, so it reads as an empty series.
    fn read(&self, key: &str) -> Result<Series> {
        let root = self.root()?;
        if validate_key(key).is_err() {
            trace!(key, "key outside metric root");
            return Ok(Vec::new());
        }
        let path = jsonl_path(root, key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(key, path = %path.display(), "no series file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut series = decode_lines(key, &content)?;
        sort_by_step(&mut series);
        trace!(key, points = series.len(), "file read");
        Ok(series)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(root) = self.root.take() {
            debug!(root = %root.display(), "closed file reader");
        }
        Ok(())
    }
}
