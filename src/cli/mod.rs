//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Flags
//!
//! - `--config` - pipeline configuration file
//! - `--env` - `dev` or `prod`, logged at startup
//! - `--verbose` - debug logging

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::{init_tracing, ExitStatus, Runner};
