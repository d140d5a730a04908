//! Run summary output
//!
//! Besides the console lines, the loader can write a machine-readable JSON
//! summary of a run. The summary records the drawn C values so a later run
//! phase can be pointed at the load phase's last-name constant.

use crate::config::Config;
use crate::coordinator::RunReport;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

/// Machine-readable summary of one run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub mode: String,
    pub warehouses: u64,
    pub workers: usize,
    pub batch_size: usize,
    pub elapsed_ms: u64,
    pub units_processed: u64,
    pub rows_written: u64,
    pub batches_committed: u64,
    pub failed_workers: usize,
    pub success: bool,
    /// C values of this run; `c_last` seeds a later run phase.
    pub c_last: i64,
    pub c_customer: i64,
    pub c_item: i64,
}

impl RunSummary {
    pub fn new(config: &Config, report: &RunReport) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            mode: config.load.mode.to_string(),
            warehouses: config.load.warehouses,
            workers: config.workers.count,
            batch_size: config.load.batch_size,
            elapsed_ms: report.elapsed.as_millis() as u64,
            units_processed: report.totals.units_processed,
            rows_written: report.totals.rows_written,
            batches_committed: report.totals.batches_committed,
            failed_workers: report.workers.iter().filter(|w| w.failed()).count(),
            success: report.success(),
            c_last: report.constants.c_last,
            c_customer: report.constants.c_customer,
            c_item: report.constants.c_item,
        }
    }

    /// Write the summary as pretty-printed JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadConfig, OutputConfig, SinkConfig, WorkerConfig};
    use crate::coordinator::Coordinator;
    use crate::strategy::WriteMode;

    #[test]
    fn test_summary_round_trips_through_json() {
        let config = Config {
            load: LoadConfig {
                warehouses: 1,
                batch_size: 500,
                mode: WriteMode::Insert,
                c_last_load: None,
            },
            workers: WorkerConfig { count: 1 },
            sink: SinkConfig::default(),
            output: OutputConfig::default(),
        };
        let coordinator = Coordinator::new(config.clone()).unwrap();
        let report = coordinator.run().unwrap();
        let summary = RunSummary::new(&config, &report);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        summary.write_to(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "insert");
        assert_eq!(value["rows_written"], 30_000);
        assert_eq!(value["success"], true);
        let c_last = value["c_last"].as_i64().unwrap();
        assert!((0..=255).contains(&c_last));
    }
}
