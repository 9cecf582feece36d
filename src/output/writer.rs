//! Parquet and CSV file writers
//!
//! Provides utilities for writing Arrow tables to Parquet and delimited
//! text files.

use crate::dataset::Table;
use crate::error::{Error, Result};
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Parquet encoding settings shared by every layer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable compression
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    fn properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Write a whole table to one Parquet file, returning the row count
///
/// An empty table still produces a valid file carrying the schema.
pub fn write_table_to_parquet(
    path: impl AsRef<Path>,
    table: &Table,
    config: Option<&ParquetWriterConfig>,
) -> Result<usize> {
    let path = path.as_ref();
    let props = config.cloned().unwrap_or_default().properties();
    let file = File::create(path)
        .map_err(|e| Error::output(format!("Failed to create file '{}': {e}", path.display())))?;

    let mut writer = ArrowWriter::try_new(file, table.schema(), Some(props))
        .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;
    for batch in table.batches() {
        writer
            .write(batch)
            .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
    }
    writer
        .close()
        .map_err(|e| Error::output(format!("Failed to close '{}': {e}", path.display())))?;

    debug!("Wrote {} rows to {}", table.num_rows(), path.display());
    Ok(table.num_rows())
}

/// Write a whole table to one CSV file with a header row
///
/// Dates are written as `YYYY-MM-DD`.
pub fn write_table_to_csv(path: impl AsRef<Path>, table: &Table) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|e| Error::output(format!("Failed to create file '{}': {e}", path.display())))?;

    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_date_format("%Y-%m-%d".to_string())
        .build(file);

    if table.batches().is_empty() {
        // The header is emitted with the first batch
        writer.write(&RecordBatch::new_empty(table.schema()))?;
    }
    for batch in table.batches() {
        writer.write(batch)?;
    }

    debug!("Wrote {} rows to {}", table.num_rows(), path.display());
    Ok(table.num_rows())
}
