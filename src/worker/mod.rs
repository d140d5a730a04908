//! Worker thread implementation
//!
//! A worker is the claim/execute unit of the loader. Each worker owns its
//! derived random generator and its write backend for its whole lifetime;
//! the only shared state it touches is the job queue (one atomic claim per
//! unit) and, in text mode, the output stream lock during an append.
//!
//! Per unit, the worker walks the fixed order grid (3000 orders x 10
//! lines), synthesizes each row and hands it to the backend. Database-mode
//! rows go through the worker's [`BatchWriter`]; text-mode rows are
//! rendered and appended one order at a time.
//!
//! An unrecoverable error terminates this worker only: the error is
//! reported with the owning unit, siblings keep draining the queue.

use crate::jobs::JobQueue;
use crate::order::{OrderLine, LINES_PER_ORDER, ORDERS_PER_WAREHOUSE};
use crate::random::Nurand;
use crate::sink::text::CsvWriter;
use crate::stats::WorkerStats;
use crate::strategy::BatchWriter;
use crate::Result;

/// Write backend a worker is bound to at setup time.
pub enum Backend {
    /// Batched transactional writes through an exclusively-owned sink.
    Sql(BatchWriter),
    /// Delimited text appended to the shared output stream.
    Text(CsvWriter),
}

/// Terminal report of one worker.
#[derive(Debug)]
pub struct WorkerReport {
    pub id: usize,
    pub stats: WorkerStats,
    /// The error that terminated this worker, if any.
    pub error: Option<anyhow::Error>,
}

impl WorkerReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One worker of the fixed pool.
pub struct Worker {
    id: usize,
    rnd: Nurand,
    backend: Backend,
    verb: &'static str,
    stats: WorkerStats,
}

impl Worker {
    /// Create a worker bound to its generator and backend.
    ///
    /// `verb` names the workload in progress lines ("Loading", "Updating",
    /// ...).
    pub fn new(id: usize, rnd: Nurand, backend: Backend, verb: &'static str) -> Self {
        Self {
            id,
            rnd,
            backend,
            verb,
            stats: WorkerStats::new(),
        }
    }

    /// Drain the job queue until exhaustion or an unrecoverable error.
    ///
    /// Consumes the worker and returns its terminal report; errors are
    /// recorded, not propagated, so the caller can aggregate them.
    pub fn run(mut self, jobs: &JobQueue) -> WorkerReport {
        let result = self.run_inner(jobs);
        self.sync_stats();
        let error = match result {
            Ok(()) => None,
            Err(e) => {
                eprintln!("Worker {:03}: ERROR: {:#}", self.id, e);
                self.stats.errors += 1;
                Some(e)
            }
        };
        WorkerReport {
            id: self.id,
            stats: self.stats,
            error,
        }
    }

    fn run_inner(&mut self, jobs: &JobQueue) -> Result<()> {
        while let Some(unit) = jobs.claim() {
            if unit == 0 {
                // Warehouse zero is a reserved sentinel and carries no work.
                continue;
            }
            println!("Worker {:03}: {} Warehouse {:6}", self.id, self.verb, unit);
            self.process_unit(unit)?;
            println!(
                "Worker {:03}: {} Warehouse {:6} done",
                self.id, self.verb, unit
            );
            self.stats.units_processed += 1;
        }

        if let Backend::Sql(writer) = &mut self.backend {
            writer.finalize()?;
        }
        Ok(())
    }

    /// Synthesize and write every order line of one warehouse unit.
    fn process_unit(&mut self, unit: u64) -> Result<()> {
        let w_id = unit as u32;
        match &mut self.backend {
            Backend::Sql(writer) => {
                writer.begin_unit(unit);
                for o_id in 1..=ORDERS_PER_WAREHOUSE {
                    for number in 1..=LINES_PER_ORDER {
                        let item_id = self.rnd.next_int(1, 100_000) as u32;
                        let row =
                            OrderLine::synthesize(&mut self.rnd, w_id, o_id, number, item_id);
                        writer.add_row(&row)?;
                    }
                }
                writer.end_unit()?;
            }
            Backend::Text(writer) => {
                for o_id in 1..=ORDERS_PER_WAREHOUSE {
                    for number in 1..=LINES_PER_ORDER {
                        let item_id = self.rnd.next_int(1, 100_000) as u32;
                        let row =
                            OrderLine::synthesize(&mut self.rnd, w_id, o_id, number, item_id);
                        writer.push_row(&row);
                    }
                    // One locked append per order keeps the stream lock short.
                    writer.append_buffered()?;
                    self.stats.rows_written += LINES_PER_ORDER as u64;
                    self.stats.batches_committed += 1;
                }
            }
        }
        Ok(())
    }

    fn sync_stats(&mut self) {
        if let Backend::Sql(writer) = &self.backend {
            self.stats.rows_written = writer.rows_written();
            self.stats.batches_committed = writer.batches_committed();
        }
    }
}
