//! # Trueno-Metrics: Backend-Agnostic Experiment Metrics
//!
//! **Version**: 0.1.0
//!
//! Trueno-Metrics records named values (tags) at integer steps and reads them
//! back as ordered time series. Writing goes through the [`Reporter`] trait,
//! reading through [`Reader`]; backends implement one or both.
//!
//! ## Backends
//!
//! | Backend | Reporter | Reader | Storage |
//! |---------|----------|--------|---------|
//! | Memory | [`MemoryReporter`] | [`MemoryReader`] | shared `DashMap` |
//! | File | [`FsReporter`] | [`FsReader`] | `<root>/<tag>.jsonl` |
//! | Relational | [`SqlReporter`] | [`SqlReader`] | `SQLite` `metric` table |
//! | Null | [`NullReporter`] | [`EmptyReader`] | nothing |
//! | Lambda | [`LambdaReporter`] | - | caller closures |
//! | Logging | [`LoggingReporter`] | - | formatted lines |
//!
//! ## Example Usage
//!
//! ```rust
//! use trueno_metrics::sql::{create_tables, Experiment, SqlEngine, SqlReporter};
//! use trueno_metrics::{metric::metrics, Reader, Reporter};
//!
//! let engine = SqlEngine::in_memory();
//! create_tables(&engine)?;
//! let experiment = Experiment::create(&engine, serde_json::json!({"lr": 0.1}))?;
//!
//! let mut reporter = SqlReporter::new(&engine, &experiment, 1)?;
//! reporter.report_all(0, metrics([("loss", 0.9), ("acc", 0.1)]))?;
//! reporter.report_all(1, metrics([("loss", 0.5), ("acc", 0.4)]))?;
//!
//! let reader = reporter.reader().unwrap();
//! let loss: Vec<_> = reader.read("loss")?.iter().map(|p| p.step()).collect();
//! assert_eq!(loss, vec![0, 1]);
//! # Ok::<(), trueno_metrics::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod metric;
pub mod reader;
pub mod reporter;
pub mod sql;

pub use config::BackendConfig;
pub use error::{Error, Result};
pub use fs::{FsReader, FsReporter};
pub use memory::{MemoryReader, MemoryReporter};
pub use metric::{MetricKey, MetricValue, Metrics, Point, Series, Step};
pub use reader::{EmptyReader, Reader};
pub use reporter::{LambdaReporter, LoggingReporter, NullReporter, Reporter};
pub use sql::{create_tables, Experiment, SqlEngine, SqlReader, SqlReporter};
