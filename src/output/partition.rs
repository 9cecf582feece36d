//! Hive-style partitioned snapshots
//!
//! A partitioned dataset is a directory tree
//! `<root>/<k1>=<v1>/[<k2>=<v2>/]data_0.parquet`. Every write replaces the
//! whole tree, so no stale partition survives a rerun.

use super::writer::{write_table_to_parquet, ParquetWriterConfig};
use crate::dataset::Table;
use crate::error::{Error, Result};
use arrow::array::{Array, AsArray, UInt32Array};
use arrow::compute::{cast, take_record_batch};
use arrow::datatypes::{DataType, Int64Type};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name used for rows whose partition key is null
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// File name of the single data file inside each partition
pub const PARTITION_FILE: &str = "data_0.parquet";

/// Outcome of a partitioned write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionSummary {
    /// Files written, in ascending partition order
    pub files: Vec<PathBuf>,
    /// Total rows written
    pub rows: usize,
}

/// Replace a directory with an empty one
///
/// Deletes the directory and everything under it, then recreates it.
pub fn replace_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| {
            Error::output(format!("Failed to clear '{}': {e}", path.display()))
        })?;
    }
    fs::create_dir_all(path)
        .map_err(|e| Error::output(format!("Failed to create '{}': {e}", path.display())))?;
    Ok(())
}

/// Write a table as a partitioned snapshot under `root`
///
/// Partitions are emitted in ascending key order and rows keep their
/// relative order inside a partition. Partition columns stay in the file
/// contents. An empty table leaves a single schema-only file at the root
/// so readers still see the columns.
pub fn write_partitioned(
    table: &Table,
    root: impl AsRef<Path>,
    partition_by: &[&str],
    config: &ParquetWriterConfig,
) -> Result<PartitionSummary> {
    let root = root.as_ref();
    let schema = table.schema();
    for key in partition_by {
        if schema.index_of(key).is_err() {
            return Err(Error::output(format!(
                "Partition column '{key}' not found in table"
            )));
        }
    }

    replace_directory(root)?;

    if table.is_empty() {
        let path = root.join(PARTITION_FILE);
        write_table_to_parquet(&path, table, Some(config))?;
        return Ok(PartitionSummary {
            files: vec![path],
            rows: 0,
        });
    }

    let batch = table.concat()?;
    let keys = partition_by
        .iter()
        .map(|name| {
            let column = batch.column(schema.index_of(name)?);
            Ok(cast(column, &DataType::Int64)?)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut groups: BTreeMap<Vec<Option<i64>>, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let key = keys
            .iter()
            .map(|column| {
                let values = column.as_primitive::<Int64Type>();
                values.is_valid(row).then(|| values.value(row))
            })
            .collect();
        let index =
            u32::try_from(row).map_err(|_| Error::output("Too many rows for one partition write"))?;
        groups.entry(key).or_default().push(index);
    }

    let mut summary = PartitionSummary::default();
    for (key, indices) in groups {
        let dir = partition_by
            .iter()
            .zip(&key)
            .fold(root.to_path_buf(), |dir, (name, value)| {
                dir.join(partition_segment(name, *value))
            });
        fs::create_dir_all(&dir)?;

        let part = take_record_batch(&batch, &UInt32Array::from(indices))?;
        let path = dir.join(PARTITION_FILE);
        summary.rows += write_table_to_parquet(&path, &Table::from_batch(part), Some(config))?;
        debug!("Wrote partition {}", path.display());
        summary.files.push(path);
    }

    info!(
        "Wrote {} rows in {} partitions under {}",
        summary.rows,
        summary.files.len(),
        root.display()
    );
    Ok(summary)
}

fn partition_segment(name: &str, value: Option<i64>) -> String {
    match value {
        Some(v) => format!("{name}={v}"),
        None => format!("{name}={DEFAULT_PARTITION}"),
    }
}

/// List the Parquet files under a partition root, recursively and sorted
pub fn list_parquet_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.as_ref().to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "parquet") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
