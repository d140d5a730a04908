//! Properties file loading and CLI merge
//!
//! The properties file is TOML with the same flat keys the CLI exposes.
//! Every key is optional; [`build_config`] layers CLI values over file
//! values and fills in defaults, so the same binary serves a checked-in
//! properties file, pure command-line use, or a mix.

use super::cli::Cli;
use super::{Config, LoadConfig, OutputConfig, SinkConfig, WorkerConfig};
use crate::strategy::WriteMode;
use crate::Result;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw properties file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Props {
    pub warehouses: Option<u64>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub mode: Option<String>,
    pub csv: Option<PathBuf>,
    pub csv_null: Option<String>,
    pub c_last_load: Option<i64>,
    pub json_summary: Option<PathBuf>,
}

/// Load and parse a TOML properties file.
pub fn load_props(path: &Path) -> Result<Props> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read properties file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse properties file {}", path.display()))
}

/// Build the validated configuration from CLI arguments and properties.
///
/// CLI values override file values. `warehouses` is required from one of
/// the two sources.
pub fn build_config(cli: &Cli, props: &Props) -> Result<Config> {
    let warehouses = cli
        .warehouses
        .or(props.warehouses)
        .context("warehouses (not defined)")?;

    let mode = match cli.mode.as_deref().or(props.mode.as_deref()) {
        Some(name) => name
            .parse::<WriteMode>()
            .map_err(anyhow::Error::msg)
            .context("Invalid write mode")?,
        None => WriteMode::default(),
    };

    let config = Config {
        load: LoadConfig {
            warehouses,
            batch_size: cli.batch_size.or(props.batch_size).unwrap_or(100),
            mode,
            c_last_load: cli.c_last_load.or(props.c_last_load),
        },
        workers: WorkerConfig {
            count: cli
                .workers
                .or(props.workers)
                .unwrap_or_else(num_cpus::get),
        },
        sink: SinkConfig {
            csv_path: cli.csv.clone().or_else(|| props.csv.clone()),
            csv_null: cli
                .csv_null
                .clone()
                .or_else(|| props.csv_null.clone())
                .unwrap_or_else(|| "NULL".to_string()),
        },
        output: OutputConfig {
            json_summary: cli.json_summary.clone().or_else(|| props.json_summary.clone()),
        },
    };

    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}
