//! Query engine module
//!
//! DuckDB-backed lazy query engine used by every transform layer.
//!
//! # Overview
//!
//! The engine module provides:
//! - `QueryEngine` - in-process DuckDB connection with one normalization
//!   entry point, [`QueryEngine::register_input`], that turns either form
//!   of [`DatasetInput`] into the same named relation
//! - `InputFormat` / `CsvOptions` - how persisted inputs are read
//! - `InputReport` - row and rejected-line counts of a registration
//! - SQL helpers shared by the layer processors
//!
//! Transformations are composed as SQL over registered relations and only
//! materialized when [`QueryEngine::query_table`] collects the result into
//! Arrow record batches.

pub mod sql;
mod types;

pub use types::{CsvOptions, InputFormat, InputReport, CSV_SAMPLE_SIZE};

use crate::dataset::{DatasetInput, Table};
use crate::error::{Error, Result};
use crate::output::{list_parquet_files, write_table_to_parquet, ParquetWriterConfig};
use crate::types::ParsePolicy;
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use sql::{path_literal, quote_ident, quote_literal};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};

/// In-process query engine
pub struct QueryEngine {
    /// DuckDB connection
    conn: Connection,
    /// Scratch space for in-memory tables handed to DuckDB
    scratch: TempDir,
}

impl QueryEngine {
    /// Create an engine backed by a fresh in-memory database
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let scratch = tempfile::Builder::new()
            .prefix("collision-etl-")
            .tempdir()?;

        Ok(Self { conn, scratch })
    }

    /// Register an input under `name`
    ///
    /// An in-memory table is scanned as is and `format` is ignored. A
    /// persisted reference is read according to `format`; a path that does
    /// not exist or has the wrong kind for the format is an
    /// [`Error::UnsupportedInput`].
    pub fn register_input(
        &self,
        name: &str,
        input: &DatasetInput,
        format: &InputFormat,
    ) -> Result<InputReport> {
        debug!("Registering '{}' from {}", name, input.describe());
        match input {
            DatasetInput::Table(table) => self.register_table(name, table),
            DatasetInput::Persisted(path) => self.register_path(name, path, format),
        }
    }

    /// Register an in-memory table under `name`
    pub fn register_table(&self, name: &str, table: &Table) -> Result<InputReport> {
        if table.schema().fields().is_empty() {
            return Err(Error::unsupported_input(name, "table has no columns"));
        }

        let table = scan_ready(table)?;
        let path = self.scratch.path().join(format!("{name}.parquet"));
        write_table_to_parquet(&path, &table, Some(&ParquetWriterConfig::new().uncompressed()))?;

        self.execute(&format!(
            "CREATE OR REPLACE VIEW {} AS SELECT * FROM read_parquet({})",
            quote_ident(name),
            path_literal(&path)
        ))?;

        Ok(InputReport {
            rows: table.num_rows(),
            rejected_rows: 0,
        })
    }

    fn register_path(&self, name: &str, path: &Path, format: &InputFormat) -> Result<InputReport> {
        let kind_ok = if format.is_directory() {
            path.is_dir()
        } else {
            path.is_file()
        };
        if !kind_ok {
            let expected = if format.is_directory() {
                "a partition directory"
            } else {
                "a file"
            };
            return Err(Error::unsupported_input(
                name,
                format!(
                    "expected {expected} of {} data at '{}'",
                    format.label(),
                    path.display()
                ),
            ));
        }

        match format {
            InputFormat::Csv(options) => self.register_csv(name, path, options),
            InputFormat::JsonArray => {
                self.execute(&format!(
                    "CREATE OR REPLACE VIEW {} AS SELECT * FROM read_json({}, format = 'array')",
                    quote_ident(name),
                    path_literal(path)
                ))
                .map_err(|e| Error::load(name, e.to_string()))?;
                Ok(InputReport {
                    rows: self.count(name)?,
                    rejected_rows: 0,
                })
            }
            InputFormat::Partitioned => {
                let files = list_parquet_files(path)?;
                if files.is_empty() {
                    return Err(Error::unsupported_input(
                        name,
                        format!("no Parquet files under '{}'", path.display()),
                    ));
                }
                let list = files
                    .iter()
                    .map(|f| path_literal(f))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.execute(&format!(
                    "CREATE OR REPLACE VIEW {} AS SELECT * FROM read_parquet([{list}], hive_partitioning = false)",
                    quote_ident(name)
                ))?;
                Ok(InputReport {
                    rows: self.count(name)?,
                    rejected_rows: 0,
                })
            }
        }
    }

    fn register_csv(&self, name: &str, path: &Path, options: &CsvOptions) -> Result<InputReport> {
        let rejects_table = format!("rejects_{name}");
        let rejects_scan = format!("rejects_scan_{name}");
        let permissive = options.policy == ParsePolicy::Permissive;

        let mut args = vec![
            path_literal(path),
            "header = true".to_string(),
            format!("sample_size = {CSV_SAMPLE_SIZE}"),
        ];
        if options.all_varchar {
            args.push("all_varchar = true".to_string());
        } else if !options.text_columns.is_empty() {
            let header = self
                .describe(&format!("SELECT * FROM read_csv({})", args.join(", ")))
                .map_err(|e| Error::load(name, e.to_string()))?;
            let types = options
                .text_columns
                .iter()
                .filter(|column| header.iter().any(|h| h == *column))
                .map(|column| format!("{}: 'VARCHAR'", quote_literal(column)))
                .collect::<Vec<_>>();
            if !types.is_empty() {
                args.push(format!("types = {{{}}}", types.join(", ")));
            }
        }
        if permissive {
            self.execute(&format!(
                "DROP TABLE IF EXISTS {}; DROP TABLE IF EXISTS {};",
                quote_ident(&rejects_table),
                quote_ident(&rejects_scan)
            ))?;
            args.push("ignore_errors = true".to_string());
            args.push("store_rejects = true".to_string());
            args.push(format!("rejects_table = {}", quote_literal(&rejects_table)));
            args.push(format!("rejects_scan = {}", quote_literal(&rejects_scan)));
        }

        self.execute(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv({})",
            quote_ident(name),
            args.join(", ")
        ))
        .map_err(|e| Error::load(name, e.to_string()))?;

        let rows = self.count(name)?;
        let rejected_rows = if permissive {
            let rejected: i64 = self.conn.query_row(
                &format!(
                    "SELECT COUNT(DISTINCT line) FROM {}",
                    quote_ident(&rejects_table)
                ),
                [],
                |row| row.get(0),
            )?;
            rejected as usize
        } else {
            0
        };

        if rejected_rows > 0 {
            warn!(
                "Dropped {} malformed rows while reading {}",
                rejected_rows,
                path.display()
            );
        }
        debug!("Loaded {} rows from {}", rows, path.display());

        Ok(InputReport {
            rows,
            rejected_rows,
        })
    }

    /// Column names of a registered relation, in order
    pub fn columns(&self, name: &str) -> Result<Vec<String>> {
        self.describe(&quote_ident(name))
    }

    fn describe(&self, relation: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!("DESCRIBE {relation}"))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Fail with [`Error::SchemaMismatch`] naming every absent column
    ///
    /// `dataset` labels the error; `relation` is the registered name.
    pub fn require_columns(&self, relation: &str, dataset: &str, required: &[&str]) -> Result<()> {
        let present = self.columns(relation)?;
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !present.iter().any(|p| p == *name))
            .map(|name| (*name).to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                dataset: dataset.to_string(),
                missing,
            })
        }
    }

    /// Number of rows in a registered relation
    pub fn count(&self, name: &str) -> Result<usize> {
        let rows: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(rows as usize)
    }

    /// Execute one or more statements without collecting results
    pub fn execute(&self, sql: &str) -> Result<()> {
        debug!("Executing: {}", sql);
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a query and collect the result as a table
    pub fn query_table(&self, sql: &str) -> Result<Table> {
        debug!("Executing query: {}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let arrow = stmt.query_arrow([])?;
        let schema = arrow.get_schema();
        let batches: Vec<RecordBatch> = arrow.collect();
        Ok(Table::new(schema, batches))
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("scratch", &self.scratch.path())
            .finish_non_exhaustive()
    }
}

/// Retype columns DuckDB cannot scan from Parquet (all-null columns)
fn scan_ready(table: &Table) -> Result<Table> {
    let source = table.schema();
    let fields: Vec<Field> = source
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_data_type(scan_type(f.data_type())))
        .collect();
    if fields
        .iter()
        .zip(source.fields())
        .all(|(a, b)| a.data_type() == b.data_type())
    {
        return Ok(table.clone());
    }

    let schema = Arc::new(Schema::new(fields));
    let batches = table
        .batches()
        .iter()
        .map(|batch| {
            let columns = batch
                .columns()
                .iter()
                .zip(schema.fields())
                .map(|(column, field)| cast(column, field.data_type()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(RecordBatch::try_new(Arc::clone(&schema), columns)?)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Table::new(schema, batches))
}

fn scan_type(data_type: &DataType) -> DataType {
    match data_type {
        DataType::Null => DataType::Utf8,
        DataType::List(item) => DataType::List(Arc::new(
            item.as_ref()
                .clone()
                .with_data_type(scan_type(item.data_type())),
        )),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests;
