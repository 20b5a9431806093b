use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::{Error, Result};

/// Default busy timeout for file stores (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Memory,
    File(PathBuf),
}

#[derive(Debug)]
struct EngineInner {
    location: Location,
    conn: Mutex<Option<Connection>>,
}

/// Handle on a `SQLite` store.
///
/// Creating an engine performs no IO; the connection is opened on first use,
/// and connecting to a file store creates the file. Clones share a single
/// connection, so a reporter and the readers it hands out see the same
/// store, including an in-memory one.
#[derive(Debug, Clone)]
pub struct SqlEngine {
    inner: Arc<EngineInner>,
}

impl SqlEngine {
    fn with_location(location: Location) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                location,
                conn: Mutex::new(None),
            }),
        }
    }

    /// Engine for the database file at `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::File(path.into()))
    }

    /// Engine for a private in-memory database.
    ///
    /// The data lives as long as the connection: [`SqlEngine::dispose`]
    /// discards it.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    /// Database file path, or `None` for an in-memory engine.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.location {
            Location::Memory => None,
            Location::File(path) => Some(path.as_path()),
        }
    }

    /// Connection URL, e.g. `sqlite:///tmp/metrics.db`.
    #[must_use]
    pub fn url(&self) -> String {
        match &self.inner.location {
            Location::Memory => "sqlite://".to_string(),
            Location::File(path) => format!("sqlite:///{}", path.display()),
        }
    }

    /// Check that the store exists (always true in memory).
    #[must_use]
    pub fn exists(&self) -> bool {
        match &self.inner.location {
            Location::Memory => true,
            Location::File(path) => path.is_file(),
        }
    }

    /// Fail with [`Error::Config`] unless the store exists.
    pub(crate) fn require_exists(&self, role: &str) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "{} doesn't exist! Create the database before creating a {role}.",
                self.url()
            )))
        }
    }

    fn connect(&self) -> Result<Connection> {
        let conn = match &self.inner.location {
            Location::Memory => Connection::open_in_memory()?,
            Location::File(path) => {
                let conn = Connection::open(path)?;
                conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
                conn
            }
        };
        info!(url = %self.url(), "connected to metric store");
        Ok(conn)
    }

    /// Run `f` against the shared connection, connecting first if needed.
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.inner.conn.lock().map_err(|_| Error::Poisoned)?;
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let conn = guard.as_mut().ok_or(Error::Closed)?;
        f(conn)
    }

    /// Close the shared connection. The next use reconnects.
    ///
    /// Calling it on an engine with no open connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the error `SQLite` reports while closing.
    pub fn dispose(&self) -> Result<()> {
        let conn = self.inner.conn.lock().map_err(|_| Error::Poisoned)?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| Error::Sql(e))?;
            debug!(url = %self.url(), "disposed metric store connection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_engine_is_lazy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.db");
        let engine = SqlEngine::file(&path);

        assert!(!engine.exists());
        assert!(!path.exists());
        assert_eq!(engine.path(), Some(path.as_path()));

        engine.with_connection(|_| Ok(())).unwrap();
        assert!(engine.exists());
    }

    #[test]
    fn test_engine_url() {
        assert_eq!(SqlEngine::in_memory().url(), "sqlite://");
        assert_eq!(
            SqlEngine::file("/tmp/metrics.db").url(),
            "sqlite:////tmp/metrics.db"
        );
    }

    #[test]
    fn test_require_exists_message() {
        let dir = TempDir::new().unwrap();
        let engine = SqlEngine::file(dir.path().join("missing.db"));
        let err = engine.require_exists("reporter").unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("doesn't exist"));
        assert!(err.to_string().contains("reporter"));
    }

    #[test]
    fn test_clones_share_connection() {
        let engine = SqlEngine::in_memory();
        engine
            .with_connection(|conn| {
                conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")?;
                Ok(())
            })
            .unwrap();

        let clone = engine.clone();
        let x: i64 = clone
            .with_connection(|conn| Ok(conn.query_row("SELECT x FROM t", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(x, 7);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let engine = SqlEngine::in_memory();
        engine.dispose().unwrap();
        engine.with_connection(|_| Ok(())).unwrap();
        engine.dispose().unwrap();
        engine.dispose().unwrap();
    }
}
