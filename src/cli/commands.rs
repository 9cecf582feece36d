//! CLI arguments and parsing

use crate::config::DEFAULT_CONFIG_PATH;
use crate::types::Environment;
use clap::Parser;
use std::path::PathBuf;

/// NYC collisions ETL: raw ingestion, standardization and daily aggregation
#[derive(Parser, Debug)]
#[command(name = "collision-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Execution environment (logged only)
    #[arg(long, value_enum, default_value_t = Environment::Dev)]
    pub env: Environment,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
