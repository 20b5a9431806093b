//! Reporter/Reader contract, checked the same way on every backend
//!
//! Each readable backend is driven through its `Reporter` and read back
//! through the `Reader` it hands out.

use serde_json::json;
use tempfile::TempDir;
use trueno_metrics::metric::metrics;
use trueno_metrics::sql::{create_tables, Experiment, SqlEngine, SqlReporter};
use trueno_metrics::{
    Error, FsReporter, LambdaReporter, MemoryReporter, NullReporter, Point, Reader, Reporter,
};

/// A backend under test. Holds the temp dir so it outlives the reporter.
struct Backend {
    name: &'static str,
    reporter: Box<dyn Reporter>,
    _dir: Option<TempDir>,
}

fn backends() -> Vec<Backend> {
    let fs_dir = TempDir::new().unwrap();
    let fs = FsReporter::new(fs_dir.path().join("run")).unwrap();

    let sql_dir = TempDir::new().unwrap();
    let engine = SqlEngine::file(sql_dir.path().join("metrics.db"));
    create_tables(&engine).unwrap();
    let experiment = Experiment::create(&engine, json!({"lr": 0.1})).unwrap();
    let sql = SqlReporter::new(&engine, &experiment, 1).unwrap();

    vec![
        Backend {
            name: "memory",
            reporter: Box::new(MemoryReporter::new()),
            _dir: None,
        },
        Backend {
            name: "file",
            reporter: Box::new(fs),
            _dir: Some(fs_dir),
        },
        Backend {
            name: "sql",
            reporter: Box::new(sql),
            _dir: Some(sql_dir),
        },
    ]
}

fn reader_of(backend: &Backend) -> Box<dyn Reader> {
    backend
        .reporter
        .reader()
        .unwrap_or_else(|| panic!("{} backend has no reader", backend.name))
}

// =============================================================================
// Absence
// =============================================================================

#[test]
fn test_unknown_tag_reads_empty_everywhere() {
    for backend in backends() {
        let reader = reader_of(&backend);
        assert!(
            reader.read("never-reported").unwrap().is_empty(),
            "{}",
            backend.name
        );
    }
    assert!(NullReporter::new()
        .reader()
        .unwrap()
        .read("never-reported")
        .unwrap()
        .is_empty());
}

// =============================================================================
// No loss, no duplication
// =============================================================================

#[test]
fn test_report_all_then_read_exactly_once() {
    for mut backend in backends() {
        backend
            .reporter
            .report_all(3, metrics([("loss", 0.25), ("acc", 0.75)]))
            .unwrap();

        let reader = reader_of(&backend);
        let series = reader.read("loss").unwrap();
        let hits = series.iter().filter(|p| **p == Point::new(3, 0.25)).count();
        assert_eq!(hits, 1, "{}", backend.name);
        assert_eq!(series.len(), 1, "{}", backend.name);
    }
}

#[test]
fn test_read_all_agrees_with_read() {
    for mut backend in backends() {
        for step in 0..4u64 {
            let loss = 1.0 / (step as f64 + 1.0);
            backend
                .reporter
                .report_all(step, metrics([("loss", loss), ("acc", 1.0 - loss)]))
                .unwrap();
        }

        let reader = reader_of(&backend);
        let keys = ["loss", "acc", "missing"].map(String::from);
        let all = reader.read_all(&keys).unwrap();
        for key in &keys {
            if let Some(series) = all.get(key) {
                assert_eq!(series, &reader.read(key).unwrap(), "{} {key}", backend.name);
            }
        }
        assert_eq!(all["loss"].len(), 4, "{}", backend.name);
    }
}

#[test]
fn test_out_of_order_steps_read_ascending() {
    for mut backend in backends() {
        backend.reporter.report(5, "loss", json!(0.2)).unwrap();
        backend.reporter.report(2, "loss", json!(0.6)).unwrap();
        backend.reporter.report(9, "loss", json!(0.1)).unwrap();

        let steps: Vec<u64> = reader_of(&backend)
            .read("loss")
            .unwrap()
            .iter()
            .map(Point::step)
            .collect();
        assert_eq!(steps, vec![2, 5, 9], "{}", backend.name);
    }
}

#[test]
fn test_keys_list_reported_tags() {
    for mut backend in backends() {
        backend
            .reporter
            .report_all(0, metrics([("loss", 0.9), ("acc", 0.1)]))
            .unwrap();

        let mut keys: Vec<String> = reader_of(&backend)
            .keys()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        keys.sort();
        assert_eq!(keys, vec!["acc".to_string(), "loss".to_string()], "{}", backend.name);
    }
}

#[test]
fn test_close_is_idempotent_everywhere() {
    for mut backend in backends() {
        backend.reporter.close().unwrap();
        backend.reporter.close().unwrap();
    }
}

// =============================================================================
// Utility reporters
// =============================================================================

#[test]
fn test_null_reporter_reader_stays_empty() {
    let mut reporter = NullReporter::new();
    reporter
        .report_all(0, metrics([("loss", 0.9), ("acc", 0.1)]))
        .unwrap();
    reporter.report(1, "loss", json!(0.5)).unwrap();

    assert_eq!(reporter.reader().unwrap().keys().unwrap().count(), 0);
}

#[test]
fn test_lambda_reporter_without_writer_is_config_error() {
    let result = LambdaReporter::new(None, None, None);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_lambda_report_delegates_to_report_all() {
    let memory = MemoryReporter::new();
    let mut sink = memory.clone();
    let mut reporter = LambdaReporter::from_report_all(move |step, batch| {
        sink.report_all(step, batch)?;
        Ok(())
    });

    reporter.report(7, "loss", json!(0.5)).unwrap();

    let reader = memory.reader().unwrap();
    assert_eq!(reader.read("loss").unwrap(), vec![Point::new(7, 0.5)]);
}
