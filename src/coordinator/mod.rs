//! Worker pool orchestration
//!
//! The coordinator owns the run: it builds the master generator for the
//! configured phase, creates the job queue and the per-worker backends,
//! starts the fixed pool of worker threads, joins every one of them, and
//! aggregates their terminal reports. A failed worker never stops its
//! siblings; it only makes the aggregated result a failure.
//!
//! Sink creation is separated from the run so that initialization failures
//! (opening the output file, connecting a sink) surface before any thread
//! is spawned.

use crate::config::Config;
use crate::jobs::JobQueue;
use crate::random::{Nurand, NurandConstants};
use crate::sink::memory::MemoryDb;
use crate::sink::text::{CsvWriter, TextStream};
use crate::sink::SqlSink;
use crate::stats::WorkerStats;
use crate::strategy::BatchWriter;
use crate::worker::{Backend, Worker, WorkerReport};
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Factory producing one exclusively-owned sink per database-mode worker.
pub type SinkFactory = Box<dyn Fn(usize) -> Result<Box<dyn SqlSink>>>;

/// Aggregated result of a run.
#[derive(Debug)]
pub struct RunReport {
    /// Per-worker terminal reports, in worker-id order.
    pub workers: Vec<WorkerReport>,
    /// Merged counters across all workers.
    pub totals: WorkerStats,
    /// The C values the master generator was initialized with.
    pub constants: NurandConstants,
    pub elapsed: Duration,
}

impl RunReport {
    /// True when no worker reported a failure.
    pub fn success(&self) -> bool {
        self.workers.iter().all(|w| !w.failed())
    }
}

enum PoolBackend {
    /// Database mode: a sink per worker from the factory.
    Sql(SinkFactory),
    /// Text mode: every worker appends to this shared stream.
    Text(TextStream),
}

/// Owns the worker pool for one run.
pub struct Coordinator {
    config: Arc<Config>,
    backend: PoolBackend,
    /// Kept when the default in-memory sink is in use, for inspection.
    memory_db: Option<MemoryDb>,
}

impl Coordinator {
    /// Create a coordinator with the default backend for the configuration:
    /// the shared text stream in CSV mode, the in-memory database sink
    /// otherwise.
    pub fn new(config: Config) -> Result<Self> {
        if let Some(path) = config.sink.csv_path.clone() {
            let stream = TextStream::create(&path)?;
            return Ok(Self {
                config: Arc::new(config),
                backend: PoolBackend::Text(stream),
                memory_db: None,
            });
        }

        let db = MemoryDb::new();
        let factory_db = db.clone();
        Ok(Self {
            config: Arc::new(config),
            backend: PoolBackend::Sql(Box::new(move |_| Ok(Box::new(factory_db.connect())))),
            memory_db: Some(db),
        })
    }

    /// Create a coordinator writing through a caller-provided sink factory.
    ///
    /// This is the seam a real database driver plugs into.
    pub fn with_sink_factory(config: Config, factory: SinkFactory) -> Self {
        Self {
            config: Arc::new(config),
            backend: PoolBackend::Sql(factory),
            memory_db: None,
        }
    }

    /// The in-memory database, when the default sink is in use.
    pub fn memory_db(&self) -> Option<&MemoryDb> {
        self.memory_db.as_ref()
    }

    /// Run the load: spawn the pool, join every worker, aggregate.
    ///
    /// Returns an error only when a worker cannot be constructed or a
    /// thread cannot be joined; per-worker write failures are reported
    /// inside the [`RunReport`].
    pub fn run(&self) -> Result<RunReport> {
        let master = self.master_generator();
        let constants = master.constants();
        let jobs = Arc::new(JobQueue::new(self.config.load.warehouses));
        let verb = self.config.load.mode.verb();
        let start = Instant::now();

        let mut handles = Vec::with_capacity(self.config.workers.count);
        for id in 0..self.config.workers.count {
            let backend = self.worker_backend(id)?;
            let worker = Worker::new(id, master.derive(), backend, verb);
            let jobs = Arc::clone(&jobs);
            handles.push(std::thread::spawn(move || worker.run(&jobs)));
        }

        // Join every worker before reporting anything, so no thread is
        // abandoned even when one of them panicked.
        let mut workers = Vec::with_capacity(handles.len());
        let mut panicked = None;
        for (id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(report) => workers.push(report),
                Err(_) => panicked = Some(id),
            }
        }

        if let PoolBackend::Text(ref stream) = self.backend {
            stream.flush()?;
        }

        if let Some(id) = panicked {
            anyhow::bail!("Worker {} thread panicked", id);
        }

        let mut totals = WorkerStats::new();
        for report in &workers {
            totals.merge(&report.stats);
        }

        Ok(RunReport {
            workers,
            totals,
            constants,
            elapsed: start.elapsed(),
        })
    }

    fn master_generator(&self) -> Nurand {
        match self.config.load.c_last_load {
            Some(c_last_load) => Nurand::run_master(c_last_load),
            None => Nurand::load_master(),
        }
    }

    fn worker_backend(&self, id: usize) -> Result<Backend> {
        match self.backend {
            PoolBackend::Sql(ref factory) => {
                let sink = factory(id)
                    .with_context(|| format!("Failed to create sink for worker {}", id))?;
                Ok(Backend::Sql(BatchWriter::new(
                    self.config.load.mode,
                    sink,
                    self.config.load.batch_size,
                )))
            }
            PoolBackend::Text(ref stream) => Ok(Backend::Text(CsvWriter::new(
                stream.clone(),
                self.config.sink.csv_null.clone(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadConfig, OutputConfig, SinkConfig, WorkerConfig};
    use crate::order::{LINES_PER_ORDER, ORDERS_PER_WAREHOUSE};
    use crate::strategy::WriteMode;

    fn config(warehouses: u64, workers: usize, batch_size: usize, mode: WriteMode) -> Config {
        Config {
            load: LoadConfig {
                warehouses,
                batch_size,
                mode,
                c_last_load: None,
            },
            workers: WorkerConfig { count: workers },
            sink: SinkConfig::default(),
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn test_end_to_end_insert_two_workers() {
        let coordinator = Coordinator::new(config(2, 2, 5, WriteMode::Insert)).unwrap();
        let report = coordinator.run().unwrap();

        assert!(report.success());
        assert_eq!(report.totals.units_processed, 2);

        let expected_rows = 2 * (ORDERS_PER_WAREHOUSE * LINES_PER_ORDER) as u64;
        assert_eq!(report.totals.rows_written, expected_rows);

        // Every unit loaded exactly once: the table holds each key once.
        let db = coordinator.memory_db().unwrap();
        assert_eq!(db.row_count() as u64, expected_rows);
        assert_eq!(db.ops_applied(), expected_rows);
    }

    #[test]
    fn test_more_workers_than_units() {
        let coordinator = Coordinator::new(config(1, 8, 100, WriteMode::Insert)).unwrap();
        let report = coordinator.run().unwrap();

        assert!(report.success());
        assert_eq!(report.totals.units_processed, 1);
        assert_eq!(
            coordinator.memory_db().unwrap().row_count() as u64,
            (ORDERS_PER_WAREHOUSE * LINES_PER_ORDER) as u64
        );
    }

    #[test]
    fn test_failed_worker_does_not_stop_siblings() {
        let db = MemoryDb::new();
        let factory_db = db.clone();
        let coordinator = Coordinator::with_sink_factory(
            config(4, 2, 50, WriteMode::Insert),
            Box::new(move |id| {
                let mut sink = factory_db.connect();
                if id == 0 {
                    // Kill worker 0 inside its first unit.
                    sink.fail_after_ops(100);
                }
                Ok(Box::new(sink))
            }),
        );

        let report = coordinator.run().unwrap();
        assert!(!report.success());

        let failed: Vec<_> = report.workers.iter().filter(|w| w.failed()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, 0);
        assert_eq!(report.totals.errors, 1);
        // The surviving worker drained the rest of the queue.
        assert_eq!(report.totals.units_processed, 3);
        assert_eq!(db.row_count() as u64, 3 * 30_000 + 100);
    }

    #[test]
    fn test_run_phase_constants() {
        let mut cfg = config(1, 1, 100, WriteMode::Insert);
        cfg.load.c_last_load = Some(100);
        let coordinator = Coordinator::new(cfg).unwrap();
        let report = coordinator.run().unwrap();

        let delta = (report.constants.c_last - 100).abs();
        assert!((65..=119).contains(&delta));
        assert_ne!(delta, 96);
        assert_ne!(delta, 112);
    }

    #[test]
    fn test_text_mode_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order-line.csv");
        let mut cfg = config(2, 2, 5, WriteMode::Insert);
        cfg.sink.csv_path = Some(path.clone());

        let coordinator = Coordinator::new(cfg).unwrap();
        let report = coordinator.run().unwrap();
        assert!(report.success());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 60_000);
    }

    #[test]
    fn test_update_mode_against_loaded_table() {
        let coordinator = Coordinator::new(config(1, 1, 10, WriteMode::Insert)).unwrap();
        let report = coordinator.run().unwrap();
        assert!(report.success());
        let db = coordinator.memory_db().unwrap().clone();

        let mut cfg = config(1, 1, 10, WriteMode::UpdateBatch);
        cfg.load.warehouses = 1;
        let updater = Coordinator::with_sink_factory(
            cfg,
            Box::new(move |_| Ok(Box::new(db.connect()))),
        );
        let update_report = updater.run().unwrap();
        assert!(update_report.success());
        assert_eq!(update_report.totals.rows_written, 30_000);
    }
}
