//! Metric Tracking Example
//!
//! Simulates a short training run and reports the same metrics to every
//! backend: SQLite, JSONL files, memory, a log sink and a closure.
//!
//! Run with: RUST_LOG=debug cargo run --example metric_tracking

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use trueno_metrics::metric::metrics;
use trueno_metrics::sql::{create_tables, Experiment, SqlEngine, SqlReporter};
use trueno_metrics::{
    BackendConfig, FsReporter, LambdaReporter, LoggingReporter, MemoryReporter, Reader, Reporter,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Trueno-Metrics Tracking ===\n");

    let workdir = tempfile::tempdir().context("creating scratch directory")?;

    // -------------------------------------------------------------------------
    // 1. Create the store and an experiment
    // -------------------------------------------------------------------------
    println!("1. Creating experiment...");

    let engine = SqlEngine::file(workdir.path().join("metrics.db"));
    create_tables(&engine)?;
    let experiment = Experiment::create(
        &engine,
        serde_json::json!({
            "model": "resnet50",
            "learning_rate": 0.001,
            "batch_size": 32,
        }),
    )?;
    println!("   Store: {}", engine.url());
    println!("   Experiment ID: {}", experiment.id());
    println!("   Params: {}", serde_json::to_string(experiment.params())?);

    // -------------------------------------------------------------------------
    // 2. One reporter per backend
    // -------------------------------------------------------------------------
    println!("\n2. Opening reporters...");

    let memory = MemoryReporter::new();
    let mut best_loss = f64::INFINITY;
    let tracker = LambdaReporter::from_report_all(move |step, batch| {
        if let Some(loss) = batch.get("loss").and_then(serde_json::Value::as_f64) {
            if loss < best_loss {
                best_loss = loss;
                println!("   [lambda] new best loss {loss:.3} at step {step}");
            }
        }
        Ok(())
    });

    let mut reporters: Vec<(&str, Box<dyn Reporter>)> = vec![
        ("sql", Box::new(SqlReporter::new(&engine, &experiment, 1)?)),
        ("file", Box::new(FsReporter::new(workdir.path().join("run-1"))?)),
        ("memory", Box::new(memory.clone())),
        ("logging", Box::new(LoggingReporter::new(std::io::stdout()))),
        ("lambda", Box::new(tracker)),
    ];
    for (name, _) in &reporters {
        println!("   {name}");
    }

    // -------------------------------------------------------------------------
    // 3. Simulated training loop
    // -------------------------------------------------------------------------
    println!("\n3. Simulating training (5 epochs)...");

    for epoch in 0..5u64 {
        #[allow(clippy::cast_precision_loss)]
        let e = epoch as f64;
        let batch = metrics([
            ("loss", 2.5 / (e + 1.0) + 0.1),
            ("accuracy", 0.5 + 0.05 * e),
            ("eval/loss", 2.7 / (e + 1.0) + 0.15),
        ]);
        for (name, reporter) in &mut reporters {
            reporter
                .report_all(epoch, batch.clone())
                .with_context(|| format!("reporting epoch {epoch} to {name}"))?;
        }
    }

    // -------------------------------------------------------------------------
    // 4. Read back
    // -------------------------------------------------------------------------
    println!("\n4. Reading back...");

    for (name, reporter) in &reporters {
        let Some(reader) = reporter.reader() else {
            println!("   {name}: write-only");
            continue;
        };
        let mut keys = reader.keys()?.collect::<trueno_metrics::Result<Vec<_>>>()?;
        keys.sort();
        let loss = reader.read("loss")?;
        let last = loss.last().and_then(|p| p.as_f64()).unwrap_or(f64::NAN);
        println!(
            "   {name}: keys={keys:?} loss points={} final loss={last:.3}",
            loss.len()
        );
    }

    let all = memory
        .reader()
        .context("memory reporter has a reader")?
        .read_all(&["loss".to_string(), "missing".to_string()])?;
    println!(
        "   memory read_all: loss={} points, missing={} points",
        all["loss"].len(),
        all["missing"].len()
    );

    // -------------------------------------------------------------------------
    // 5. Close everything
    // -------------------------------------------------------------------------
    println!("\n5. Closing...");
    for (_, reporter) in &mut reporters {
        reporter.close()?;
    }
    engine.dispose()?;

    // -------------------------------------------------------------------------
    // 6. Reporters from configuration
    // -------------------------------------------------------------------------
    println!("\n6. Building a reporter from configuration...");
    let config = BackendConfig::from_json(&format!(
        r#"{{"backend": "sql", "path": {:?}, "experiment_id": {}, "run_id": 2}}"#,
        workdir.path().join("metrics.db").display().to_string(),
        experiment.id()
    ))?;
    let mut reporter = config.build_reporter()?;
    reporter.report(0, "loss", serde_json::json!(1.25))?;
    let run2 = reporter
        .reader()
        .context("sql reporter has a reader")?
        .read("loss")?;
    println!("   {} backend, run 2 loss: {run2:?}", config.name());
    reporter.close()?;

    println!("\n=== Done ===");
    Ok(())
}
