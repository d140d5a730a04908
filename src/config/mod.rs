//! Configuration module
//!
//! Handles CLI argument parsing, the TOML properties file, and validation.
//! Every value can come from the properties file or the command line; CLI
//! values win, so a run can override a checked-in properties file without
//! editing it.

pub mod cli;
pub mod file;

use crate::strategy::WriteMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub load: LoadConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to generate and how to write it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Number of warehouse units to process.
    pub warehouses: u64,
    /// Rows per committed batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Write-mode policy.
    #[serde(default)]
    pub mode: WriteMode,
    /// Last-name C value recorded from a previous load phase.
    ///
    /// When present the master generator is constructed for the run phase,
    /// drawing its last-name constant under the forbidden-gap rule.
    pub c_last_load: Option<i64>,
}

fn default_batch_size() -> usize {
    100
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker threads.
    #[serde(default = "default_workers")]
    pub count: usize,
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_workers(),
        }
    }
}

/// Where the rows go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Emit delimited text to this file instead of writing to the database
    /// sink.
    pub csv_path: Option<PathBuf>,
    /// Token emitted for NULL values in text output.
    #[serde(default = "default_csv_null")]
    pub csv_null: String,
}

fn default_csv_null() -> String {
    "NULL".to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            csv_null: default_csv_null(),
        }
    }
}

/// Reporting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write a JSON run summary to this path.
    pub json_summary: Option<PathBuf>,
}

impl Config {
    /// Validate the complete configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.load.warehouses == 0 {
            return Err("warehouses must be greater than 0".to_string());
        }
        if self.load.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.workers.count == 0 {
            return Err("workers must be greater than 0".to_string());
        }
        if let Some(c_last) = self.load.c_last_load {
            if !(0..=255).contains(&c_last) {
                return Err(format!(
                    "c_last_load must be in 0..=255, got {}",
                    c_last
                ));
            }
        }
        // Text output renders full rows; only the insert workload does.
        if self.sink.csv_path.is_some() && self.load.mode != WriteMode::Insert {
            return Err(format!(
                "csv output supports the insert mode only, got '{}'",
                self.load.mode
            ));
        }
        Ok(())
    }

    /// True when rows are emitted as delimited text.
    pub fn text_mode(&self) -> bool {
        self.sink.csv_path.is_some()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(
            f,
            "  Load: {} warehouse(s), mode={}, batch_size={}",
            self.load.warehouses, self.load.mode, self.load.batch_size
        )?;
        if let Some(c_last) = self.load.c_last_load {
            writeln!(f, "  Phase: run (c_last_load={})", c_last)?;
        } else {
            writeln!(f, "  Phase: load")?;
        }
        writeln!(f, "  Workers: {} thread(s)", self.workers.count)?;
        match self.sink.csv_path {
            Some(ref path) => writeln!(
                f,
                "  Sink: csv={} (null='{}')",
                path.display(),
                self.sink.csv_null
            )?,
            None => writeln!(f, "  Sink: database")?,
        }
        if let Some(ref path) = self.output.json_summary {
            writeln!(f, "  Summary: {}", path.display())?;
        }
        Ok(())
    }
}
