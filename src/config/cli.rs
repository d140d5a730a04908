//! CLI argument parsing using clap

use clap::Parser;
use std::path::PathBuf;

/// Benchload - parallel TPC-C style benchmark data loader
#[derive(Parser, Debug)]
#[command(name = "benchload")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Properties file (TOML); CLI options override its values
    #[arg(short = 'p', long, env = "BENCHLOAD_PROPS")]
    pub props: Option<PathBuf>,

    /// Number of warehouse units to generate
    #[arg(short = 'w', long)]
    pub warehouses: Option<u64>,

    /// Number of worker threads (default: CPU count)
    #[arg(short = 't', long)]
    pub workers: Option<usize>,

    /// Rows per committed batch
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Write mode (insert, update, update_batch, delete_batch,
    /// insert_update, insert_update_bucket, upsert, insert_batch_value,
    /// update_batch_value, update_batch_value_list, delete_batch_value,
    /// upsert_batch_value)
    #[arg(short = 'm', long)]
    pub mode: Option<String>,

    /// Emit delimited text to this file instead of the database sink
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Token emitted for NULL values in text output
    #[arg(long)]
    pub csv_null: Option<String>,

    /// Last-name C value recorded from a previous load phase
    /// (selects the run-phase generator)
    #[arg(long)]
    pub c_last_load: Option<i64>,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub json_summary: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::parse_from(["benchload", "--warehouses", "10"]);
        assert_eq!(cli.warehouses, Some(10));
        assert_eq!(cli.mode, None);
        assert_eq!(cli.csv, None);
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::parse_from([
            "benchload",
            "-w",
            "4",
            "-t",
            "2",
            "-b",
            "50",
            "-m",
            "update_batch",
            "--c-last-load",
            "123",
        ]);
        assert_eq!(cli.warehouses, Some(4));
        assert_eq!(cli.workers, Some(2));
        assert_eq!(cli.batch_size, Some(50));
        assert_eq!(cli.mode.as_deref(), Some("update_batch"));
        assert_eq!(cli.c_last_load, Some(123));
    }
}
