//! Dataset handles passed between pipeline layers
//!
//! A [`Table`] is a columnar in-memory table (Arrow schema plus record
//! batches). A [`Dataset`] pairs a table with the location it was
//! persisted to. Every processor accepts a [`DatasetInput`], which is
//! either the in-memory table or a reference to the persisted files; the
//! query engine resolves both variants into the same queryable relation.

use crate::types::Handoff;
use arrow::record_batch::RecordBatch;
use arrow::datatypes::{Schema, SchemaRef};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Columnar in-memory table
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Create a table from a schema and batches sharing that schema
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Create a table from a single batch
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }

    /// Create an empty table with the given schema
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    /// Table schema
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Record batches backing the table
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows across all batches
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Whether the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Column names in schema order
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Concatenate all batches into one
    pub fn concat(&self) -> crate::Result<RecordBatch> {
        Ok(arrow::compute::concat_batches(&self.schema, &self.batches)?)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty(Arc::new(Schema::empty()))
    }
}

/// A table together with the location it was persisted to
#[derive(Debug, Clone)]
pub struct Dataset {
    /// The materialized table
    pub table: Table,
    /// Origin (raw file) or persisted root (partition directory)
    pub path: Option<PathBuf>,
}

impl Dataset {
    /// Create a dataset backed by a persisted location
    pub fn new(table: Table, path: impl Into<PathBuf>) -> Self {
        Self {
            table,
            path: Some(path.into()),
        }
    }

    /// Create a dataset that only lives in memory
    pub fn in_memory(table: Table) -> Self {
        Self { table, path: None }
    }

    /// Persisted location, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Build the input the next layer receives
    ///
    /// `Handoff::Disk` falls back to the in-memory table when the
    /// dataset was never persisted.
    pub fn to_input(&self, handoff: Handoff) -> DatasetInput {
        match (handoff, &self.path) {
            (Handoff::Disk, Some(path)) => DatasetInput::Persisted(path.clone()),
            _ => DatasetInput::Table(self.table.clone()),
        }
    }
}

/// Input accepted by every processor
#[derive(Debug, Clone)]
pub enum DatasetInput {
    /// Freshly computed in-memory table
    Table(Table),
    /// Previously persisted file or partition root
    Persisted(PathBuf),
}

impl DatasetInput {
    /// Short description used in log lines
    pub fn describe(&self) -> String {
        match self {
            DatasetInput::Table(table) => format!("in-memory table ({} rows)", table.num_rows()),
            DatasetInput::Persisted(path) => format!("persisted data at {}", path.display()),
        }
    }
}

impl From<Table> for DatasetInput {
    fn from(table: Table) -> Self {
        DatasetInput::Table(table)
    }
}

impl From<PathBuf> for DatasetInput {
    fn from(path: PathBuf) -> Self {
        DatasetInput::Persisted(path)
    }
}

impl From<&Path> for DatasetInput {
    fn from(path: &Path) -> Self {
        DatasetInput::Persisted(path.to_path_buf())
    }
}
