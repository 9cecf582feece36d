//! Tests for output module

use super::*;
use crate::dataset::Table;
use arrow::array::{Array, AsArray, Date32Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn read_parquet(path: &Path) -> Vec<RecordBatch> {
    let file = File::open(path).unwrap();
    ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap()
        .map(|b| b.unwrap())
        .collect()
}

fn monthly_table(rows: &[(i32, Option<i32>, &str)]) -> Table {
    let schema = Arc::new(Schema::new(vec![
        Field::new("year", DataType::Int32, true),
        Field::new("month", DataType::Int32, true),
        Field::new("borough", DataType::Utf8, true),
    ]));
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(Int32Array::from(
                rows.iter().map(|r| Some(r.0)).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            )),
        ],
    )
    .unwrap();
    Table::new(schema, vec![batch])
}

// ============================================================================
// Schema Inference Tests
// ============================================================================

#[test]
fn test_infer_schema_empty() {
    let schema = infer_schema(&[]).unwrap();
    assert!(schema.fields().is_empty());
}

#[test]
fn test_infer_schema_simple() {
    let records = vec![
        json!({"date": "2021-07-04", "name": "Independence Day", "fixed": false}),
        json!({"date": "2021-12-25", "name": "Christmas Day", "fixed": false}),
    ];

    let schema = infer_schema(&records).unwrap();
    assert_eq!(schema.fields().len(), 3);
    assert_eq!(
        schema.field_with_name("fixed").unwrap().data_type(),
        &DataType::Boolean
    );
}

#[test]
fn test_infer_schema_null_then_value() {
    let records = vec![
        json!({"launchYear": null}),
        json!({"launchYear": 1983}),
    ];
    let schema = infer_schema(&records).unwrap();
    assert_eq!(
        schema.field_with_name("launchYear").unwrap().data_type(),
        &DataType::Int64
    );
}

#[test]
fn test_infer_schema_mixed_numbers() {
    let records = vec![json!({"value": 42}), json!({"value": 3.5})];
    let schema = infer_schema(&records).unwrap();
    assert_eq!(
        schema.field_with_name("value").unwrap().data_type(),
        &DataType::Float64
    );
}

#[test]
fn test_infer_schema_rejects_non_objects() {
    let err = infer_schema(&[json!([1, 2, 3])]).unwrap_err();
    assert!(err.to_string().contains("Expected JSON objects"));
}

// ============================================================================
// JSON <-> Arrow Tests
// ============================================================================

#[test]
fn test_json_to_arrow_string_lists() {
    let records = vec![
        json!({"name": "New Year's Day", "types": ["Public"]}),
        json!({"name": "Columbus Day", "types": ["Public", "Optional"]}),
        json!({"name": "Flag Day", "types": null}),
    ];

    let batch = json_to_arrow(&records, None).unwrap();
    assert_eq!(batch.num_rows(), 3);

    let types = batch.column(batch.schema().index_of("types").unwrap());
    assert!(matches!(types.data_type(), DataType::List(_)));
    let lists = types.as_list::<i32>();
    assert_eq!(lists.value(1).len(), 2);
    assert!(lists.is_null(2));
}

#[test]
fn test_json_to_arrow_empty_records_keeps_schema() {
    let schema = Schema::new(vec![Field::new("name", DataType::Utf8, true)]);
    let batch = json_to_arrow(&[], Some(&schema)).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 1);
}

#[test]
fn test_arrow_to_json_renders_rows() {
    let records = vec![
        json!({"name": "Labor Day", "types": ["Public"], "year": 2021}),
        json!({"name": "Halloween", "types": [], "year": null}),
    ];
    let batch = json_to_arrow(&records, None).unwrap();
    let rows = arrow_to_json(&batch).unwrap();

    assert_eq!(rows[0], json!({"name": "Labor Day", "types": ["Public"], "year": 2021}));
    assert_eq!(rows[1], json!({"name": "Halloween", "types": [], "year": null}));
}

#[test]
fn test_arrow_to_json_formats_dates() {
    let schema = Arc::new(Schema::new(vec![Field::new("date", DataType::Date32, true)]));
    // 18812 days after the epoch is 2021-07-04
    let batch = RecordBatch::try_new(schema, vec![Arc::new(Date32Array::from(vec![18812]))])
        .unwrap();
    let rows = arrow_to_json(&batch).unwrap();
    assert_eq!(rows[0], json!({"date": "2021-07-04"}));
}

// ============================================================================
// Writer Tests
// ============================================================================

#[test]
fn test_write_table_to_parquet_roundtrip_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("table.parquet");
    let table = monthly_table(&[(2021, Some(1), "BK"), (2021, Some(2), "QN")]);

    let rows = write_table_to_parquet(&path, &table, None).unwrap();
    assert_eq!(rows, 2);

    let batches = read_parquet(&path);
    let total: usize = batches.iter().map(RecordBatch::num_rows).sum();
    assert_eq!(total, 2);
}

#[test]
fn test_write_empty_table_to_parquet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.parquet");
    let table = Table::empty(monthly_table(&[]).schema());

    let rows = write_table_to_parquet(&path, &table, None).unwrap();
    assert_eq!(rows, 0);
    assert!(path.exists());
}

#[test]
fn test_write_table_to_csv_has_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("table.csv");
    let table = monthly_table(&[(2021, Some(7), "BK")]);

    write_table_to_csv(&path, &table).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "year,month,borough\n2021,7,BK\n");
}

#[test]
fn test_write_empty_table_to_csv_still_has_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    let table = Table::empty(monthly_table(&[]).schema());

    write_table_to_csv(&path, &table).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "year,month,borough\n");
}

// ============================================================================
// Partition Tests
// ============================================================================

#[test]
fn test_replace_directory_removes_stale_files() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("snapshot");
    std::fs::create_dir_all(root.join("year=1999")).unwrap();
    std::fs::write(root.join("year=1999").join("data_0.parquet"), b"stale").unwrap();

    replace_directory(&root).unwrap();

    assert!(root.is_dir());
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
}

#[test]
fn test_write_partitioned_layout() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("collisions");
    let table = monthly_table(&[
        (2021, Some(2), "BK"),
        (2020, Some(12), "QN"),
        (2021, Some(2), "MN"),
        (2021, None, "SI"),
    ]);

    let summary =
        write_partitioned(&table, &root, &["year", "month"], &ParquetWriterConfig::default())
            .unwrap();

    assert_eq!(summary.rows, 4);
    assert_eq!(
        summary.files,
        vec![
            root.join("year=2020/month=12/data_0.parquet"),
            root.join(format!("year=2021/month={DEFAULT_PARTITION}/data_0.parquet")),
            root.join("year=2021/month=2/data_0.parquet"),
        ]
    );

    // Row order inside a partition is preserved and partition columns are kept
    let batches = read_parquet(&root.join("year=2021/month=2/data_0.parquet"));
    let batch = &batches[0];
    assert_eq!(batch.num_columns(), 3);
    let boroughs = batch.column(2).as_string::<i32>();
    assert_eq!(boroughs.value(0), "BK");
    assert_eq!(boroughs.value(1), "MN");
    let months = batch.column(1).as_primitive::<Int32Type>();
    assert_eq!(months.value(0), 2);
}

#[test]
fn test_write_partitioned_replaces_previous_snapshot() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("holidays");
    let config = ParquetWriterConfig::default();

    write_partitioned(&monthly_table(&[(2019, Some(1), "BK")]), &root, &["year"], &config)
        .unwrap();
    write_partitioned(&monthly_table(&[(2021, Some(1), "BK")]), &root, &["year"], &config)
        .unwrap();

    assert!(!root.join("year=2019").exists());
    assert_eq!(
        list_parquet_files(&root).unwrap(),
        vec![root.join("year=2021/data_0.parquet")]
    );
}

#[test]
fn test_write_partitioned_empty_table_leaves_schema_file() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("weather");
    let table = Table::empty(monthly_table(&[]).schema());

    let summary =
        write_partitioned(&table, &root, &["year", "month"], &ParquetWriterConfig::default())
            .unwrap();

    assert_eq!(summary.rows, 0);
    assert_eq!(summary.files, vec![root.join(PARTITION_FILE)]);
}

#[test]
fn test_write_partitioned_unknown_column() {
    let dir = tempdir().unwrap();
    let err = write_partitioned(
        &monthly_table(&[(2021, Some(1), "BK")]),
        dir.path(),
        &["day"],
        &ParquetWriterConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Partition column 'day'"));
}
