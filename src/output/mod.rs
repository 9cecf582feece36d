//! Output module
//!
//! Handles Arrow RecordBatch creation and file writing.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Converting JSON to Arrow RecordBatches and back
//! - Writing Parquet and CSV files
//! - Writing Hive-style partitioned snapshots with replace semantics

mod partition;
mod schema;
mod writer;

pub use partition::{
    list_parquet_files, replace_directory, write_partitioned, PartitionSummary,
    DEFAULT_PARTITION, PARTITION_FILE,
};
pub use schema::{arrow_to_json, infer_schema, json_to_arrow};
pub use writer::{write_table_to_csv, write_table_to_parquet, ParquetWriterConfig};

#[cfg(test)]
mod tests;
