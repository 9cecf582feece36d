//! # Collision ETL
//!
//! Batch pipeline that joins NYC motor vehicle collisions with public
//! holidays and daily weather, producing daily statistics.
//!
//! ## Layers
//!
//! - **Raw**: source files downloaded verbatim (collisions, weather) and
//!   holiday API pages saved as one JSON array
//! - **Standardized**: cleaned, typed records per entity, partitioned by
//!   year (and month) as Parquet
//! - **Aggregate**: collisions enriched with holiday impact tiers and
//!   weather flags, grouped per day, borough and zip code
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use collision_etl::{load_config, run_pipeline, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("config/config.yaml")?;
//!     let summary = run_pipeline(&config).await?;
//!     println!("wrote {}", summary.gold.parquet_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Pipeline                               │
//! │   ingest (raw) → standardize (silver) → aggregate (gold)         │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌───────────┬──────────────┬────┴─────────┬───────────┬───────────┐
//! │   HTTP    │   Engine     │   Dataset    │  Output   │  Config   │
//! ├───────────┼──────────────┼──────────────┼───────────┼───────────┤
//! │ Retry     │ DuckDB       │ Table        │ Parquet   │ YAML      │
//! │ Backoff   │ CSV / JSON   │ Persisted    │ CSV       │ .env      │
//! │ Timeouts  │ Partitions   │ Handoff      │ Hive dirs │           │
//! └───────────┴──────────────┴──────────────┴───────────┴───────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pipeline
pub mod error;

/// Common types and type aliases
pub mod types;

/// In-memory and persisted dataset handles
pub mod dataset;

/// Pipeline configuration
pub mod config;

/// HTTP client with retry and backoff
pub mod http;

/// DuckDB query engine
pub mod engine;

/// Arrow/Parquet/CSV output
pub mod output;

/// Raw layer ingestion
pub mod ingest;

/// Standardized layer
pub mod standardize;

/// Aggregate layer
pub mod aggregate;

/// Layer orchestration
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use aggregate::{GoldOutput, GoldProcessor};
pub use config::{load_config, load_config_from_str, PipelineConfig};
pub use dataset::{Dataset, DatasetInput, Table};
pub use ingest::RawExtractor;
pub use pipeline::{run_pipeline, PipelineSummary};
pub use standardize::{SilverProcessor, StandardizeOutcome, StandardizeReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
