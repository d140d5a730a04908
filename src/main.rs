//! Benchload CLI entry point

use benchload::config::cli::Cli;
use benchload::config::file::{build_config, load_props, Props};
use benchload::coordinator::{Coordinator, RunReport};
use benchload::output::RunSummary;
use benchload::Config;
use thiserror::Error;

/// Fatal error classes, each mapped to a distinct process exit code.
#[derive(Debug, Error)]
enum FatalError {
    /// Configuration could not be loaded or is invalid (exit 1).
    #[error(transparent)]
    Config(anyhow::Error),
    /// A sink or output file could not be initialized (exit 3).
    #[error(transparent)]
    Init(anyhow::Error),
    /// A worker thread could not be joined (exit 4).
    #[error(transparent)]
    Join(anyhow::Error),
    /// One or more workers terminated with a write failure (exit 4).
    #[error("{failed} worker(s) failed")]
    WorkersFailed { failed: usize },
}

impl FatalError {
    fn exit_code(&self) -> i32 {
        match self {
            FatalError::Config(_) => 1,
            FatalError::Init(_) => 3,
            FatalError::Join(_) | FatalError::WorkersFailed { .. } => 4,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<(), FatalError> {
    println!("benchload v{}", env!("CARGO_PKG_VERSION"));
    println!("Parallel TPC-C style benchmark data loader");
    println!();

    let cli = Cli::parse_args();

    let props = match cli.props {
        Some(ref path) => load_props(path).map_err(FatalError::Config)?,
        None => Props::default(),
    };
    let config = build_config(&cli, &props).map_err(FatalError::Config)?;

    print!("{}", config);
    println!();
    println!("Starting load...");
    println!();

    // Coordinator::new opens the output stream / sink; failures here are
    // initialization failures, before any worker starts.
    let coordinator = Coordinator::new(config.clone()).map_err(FatalError::Init)?;
    let report = coordinator.run().map_err(FatalError::Join)?;

    print_results(&config, &report);

    // The summary is written on failed runs too; it records what happened.
    if let Some(ref path) = config.output.json_summary {
        RunSummary::new(&config, &report)
            .write_to(path)
            .map_err(FatalError::Init)?;
    }

    if !report.success() {
        let failed = report.workers.iter().filter(|w| w.failed()).count();
        return Err(FatalError::WorkersFailed { failed });
    }
    Ok(())
}

/// Print the per-worker and aggregate results.
fn print_results(config: &Config, report: &RunReport) {
    println!();
    println!("Results:");
    for worker in &report.workers {
        println!("  Worker {:03}: {}", worker.id, worker.stats);
    }
    println!("  Total:      {}", report.totals);
    println!();
    println!(
        "C values: c_last={} c_customer={} c_item={}",
        report.constants.c_last, report.constants.c_customer, report.constants.c_item
    );
    if config.load.c_last_load.is_none() {
        println!(
            "Record c_last for a later run phase: --c-last-load {}",
            report.constants.c_last
        );
    }
    println!();
    println!(
        "Exec {} elapsed: {}ms",
        config.load.mode,
        report.elapsed.as_millis()
    );
}
