use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::debug;

use super::{jsonl_path, validate_key, FsReader};
use crate::metric::{MetricKey, Metrics, Point, Step};
use crate::{Error, Reader, Reporter, Result};

/// Reporter that appends points to `<root>/<tag>.jsonl` files.
///
/// Files are opened in append mode, so reporting into an existing root
/// extends its series. Every batch is flushed before `report_all` returns.
#[derive(Debug)]
pub struct FsReporter {
    root: PathBuf,
    handles: FxHashMap<MetricKey, BufWriter<File>>,
    closed: bool,
}

impl FsReporter {
    /// Create a reporter rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "opened file reporter");
        Ok(Self {
            root,
            handles: FxHashMap::default(),
            closed: false,
        })
    }

    /// Get the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append handle for `key`, opened on first use.
    fn handle(&mut self, key: &str) -> Result<&mut BufWriter<File>> {
        if !self.handles.contains_key(key) {
            let path = jsonl_path(&self.root, key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            self.handles.insert(key.to_string(), BufWriter::new(file));
        }
        self.handles.get_mut(key).ok_or(Error::Closed)
    }

    fn flush_all(&mut self) -> Result<()> {
        for writer in self.handles.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Reporter for FsReporter {
    fn report_all(&mut self, step: Step, metrics: Metrics) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        debug!(step, entries = metrics.len(), root = %self.root.display(), "file report_all");
        // Reject the batch before any file is touched.
        for key in metrics.keys() {
            validate_key(key)?;
        }

        for (key, value) in metrics {
            let writer = self.handle(&key)?;
            serde_json::to_writer(&mut *writer, &Point::new(step, value))?;
            writer.write_all(b"\n")?;
        }
        self.flush_all()
    }

    fn reader(&self) -> Option<Box<dyn Reader>> {
        if self.closed {
            return None;
        }
        Some(Box::new(FsReader::at(self.root.clone())))
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush_all()?;
        self.handles.clear();
        self.closed = true;
        debug!(root = %self.root.display(), "closed file reporter");
        Ok(())
    }
}
