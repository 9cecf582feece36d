//! Tests for engine module

use super::*;
use crate::output::{arrow_to_json, json_to_arrow, write_partitioned};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

fn rows(engine: &QueryEngine, sql: &str) -> Vec<Value> {
    let table = engine.query_table(sql).unwrap();
    table
        .batches()
        .iter()
        .flat_map(|b| arrow_to_json(b).unwrap())
        .collect()
}

fn holiday_table() -> Table {
    Table::from_batch(
        json_to_arrow(
            &[
                json!({"date": "2021-07-04", "name": "Independence Day", "types": ["Public"], "counties": null}),
                json!({"date": "2021-12-25", "name": "Christmas Day", "types": ["Public"], "counties": null}),
            ],
            None,
        )
        .unwrap(),
    )
}

// ============================================================================
// In-memory tables
// ============================================================================

#[test]
fn test_register_table() {
    let engine = QueryEngine::new().unwrap();
    let report = engine
        .register_input("holidays", &DatasetInput::Table(holiday_table()), &InputFormat::JsonArray)
        .unwrap();

    assert_eq!(report, InputReport { rows: 2, rejected_rows: 0 });
    assert_eq!(engine.count("holidays").unwrap(), 2);

    let mut columns = engine.columns("holidays").unwrap();
    columns.sort();
    assert_eq!(columns, vec!["counties", "date", "name", "types"]);
}

#[test]
fn test_register_table_all_null_column_is_text() {
    let engine = QueryEngine::new().unwrap();
    engine.register_table("holidays", &holiday_table()).unwrap();

    let result = rows(
        &engine,
        "SELECT counties IS NULL AS missing, list_contains(types, 'Public') AS public FROM holidays ORDER BY name",
    );
    assert_eq!(
        result,
        vec![
            json!({"missing": true, "public": true}),
            json!({"missing": true, "public": true}),
        ]
    );
}

#[test]
fn test_register_table_without_columns_is_rejected() {
    let engine = QueryEngine::new().unwrap();
    let err = engine.register_table("empty", &Table::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedInput { .. }));
}

#[test]
fn test_require_columns_lists_every_missing_column() {
    let engine = QueryEngine::new().unwrap();
    engine.register_table("holidays", &holiday_table()).unwrap();

    engine
        .require_columns("holidays", "holidays", &["date", "name"])
        .unwrap();
    let err = engine
        .require_columns("holidays", "holidays", &["date", "holiday_name", "year"])
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Schema mismatch for 'holidays': missing required columns [holiday_name, year]"
    );
}

// ============================================================================
// Persisted inputs
// ============================================================================

fn inferred_csv() -> InputFormat {
    InputFormat::Csv(CsvOptions::new())
}

#[test]
fn test_register_csv_infers_types() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.csv");
    fs::write(&path, "id,name\n1,alpha\n2,beta\n").unwrap();

    let engine = QueryEngine::new().unwrap();
    let report = engine
        .register_input("sample", &DatasetInput::from(path), &inferred_csv())
        .unwrap();

    assert_eq!(report, InputReport { rows: 2, rejected_rows: 0 });
    assert_eq!(
        rows(&engine, "SELECT id + 1 AS next FROM sample ORDER BY id"),
        vec![json!({"next": 2}), json!({"next": 3})]
    );
}

#[test]
fn test_register_csv_all_varchar() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weather.csv");
    fs::write(&path, "DATE,TMAX\n2021-07-04,250\n").unwrap();

    let engine = QueryEngine::new().unwrap();
    engine
        .register_input(
            "weather",
            &DatasetInput::from(path),
            &InputFormat::Csv(CsvOptions::new().all_varchar()),
        )
        .unwrap();

    assert_eq!(
        rows(&engine, "SELECT TMAX FROM weather"),
        vec![json!({"TMAX": "250"})]
    );
}

#[test]
fn test_register_csv_text_columns_keep_source_spelling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("collisions.csv");
    fs::write(
        &path,
        "CRASH TIME,ZIP CODE,INJURED\n08:15,01234,3\n23:05,10001,0\n",
    )
    .unwrap();

    let engine = QueryEngine::new().unwrap();
    engine
        .register_input(
            "collisions",
            &DatasetInput::from(path),
            &InputFormat::Csv(CsvOptions::new().text_columns(&["CRASH TIME", "ZIP CODE", "ABSENT"])),
        )
        .unwrap();

    assert_eq!(
        rows(
            &engine,
            r#"SELECT "CRASH TIME" AS t, "ZIP CODE" AS z, INJURED + 1 AS n FROM collisions ORDER BY n"#
        ),
        vec![
            json!({"t": "23:05", "z": "10001", "n": 1}),
            json!({"t": "08:15", "z": "01234", "n": 4}),
        ]
    );
}

#[test]
fn test_register_csv_permissive_counts_dropped_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    fs::write(&path, "a,b\n1,2\n3,4,5,6\n7,8\n").unwrap();

    let engine = QueryEngine::new().unwrap();
    let report = engine
        .register_input("broken", &DatasetInput::from(path), &inferred_csv())
        .unwrap();

    assert_eq!(report, InputReport { rows: 2, rejected_rows: 1 });
}

#[test]
fn test_register_csv_strict_fails_on_malformed_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    fs::write(&path, "a,b\n1,2\n3,4,5,6\n7,8\n").unwrap();

    let engine = QueryEngine::new().unwrap();
    let err = engine
        .register_input(
            "broken",
            &DatasetInput::from(path),
            &InputFormat::Csv(CsvOptions::new().policy(ParsePolicy::Strict)),
        )
        .unwrap_err();

    assert!(matches!(err, Error::Load { .. }));
}

#[test]
fn test_register_csv_twice_replaces_relation() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");
    fs::write(&first, "a\n1\n").unwrap();
    fs::write(&second, "a\n1\n2\n3\n").unwrap();

    let engine = QueryEngine::new().unwrap();
    engine
        .register_input("data", &DatasetInput::from(first), &inferred_csv())
        .unwrap();
    let report = engine
        .register_input("data", &DatasetInput::from(second), &inferred_csv())
        .unwrap();

    assert_eq!(report.rows, 3);
}

#[test]
fn test_register_json_array() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("holidays.json");
    fs::write(
        &path,
        r#"[{"date": "2021-07-04", "name": "Independence Day", "types": ["Public"]}]"#,
    )
    .unwrap();

    let engine = QueryEngine::new().unwrap();
    let report = engine
        .register_input("holidays", &DatasetInput::from(path), &InputFormat::JsonArray)
        .unwrap();

    assert_eq!(report.rows, 1);
    assert_eq!(
        rows(&engine, "SELECT name, types FROM holidays"),
        vec![json!({"name": "Independence Day", "types": ["Public"]})]
    );
}

#[test]
fn test_register_partitioned_reads_every_partition() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("holidays");
    write_partitioned(
        &Table::from_batch(
            json_to_arrow(
                &[
                    json!({"name": "a", "year": 2020}),
                    json!({"name": "b", "year": 2021}),
                    json!({"name": "c", "year": 2021}),
                ],
                None,
            )
            .unwrap(),
        ),
        &root,
        &["year"],
        &ParquetWriterConfig::default(),
    )
    .unwrap();

    let engine = QueryEngine::new().unwrap();
    let report = engine
        .register_input("holidays", &DatasetInput::from(root), &InputFormat::Partitioned)
        .unwrap();

    assert_eq!(report.rows, 3);
    assert_eq!(
        rows(&engine, "SELECT name, year FROM holidays ORDER BY name"),
        vec![
            json!({"name": "a", "year": 2020}),
            json!({"name": "b", "year": 2021}),
            json!({"name": "c", "year": 2021}),
        ]
    );
}

#[test]
fn test_missing_path_is_unsupported_input() {
    let dir = tempdir().unwrap();
    let engine = QueryEngine::new().unwrap();
    let err = engine
        .register_input(
            "collisions",
            &DatasetInput::from(dir.path().join("nope.csv")),
            &inferred_csv(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedInput { .. }));
}

#[test]
fn test_file_given_for_partition_root_is_unsupported_input() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.csv");
    fs::write(&path, "a\n1\n").unwrap();

    let engine = QueryEngine::new().unwrap();
    let err = engine
        .register_input("weather", &DatasetInput::from(path), &InputFormat::Partitioned)
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedInput { .. }));
}

#[test]
fn test_empty_partition_root_is_unsupported_input() {
    let dir = tempdir().unwrap();
    let engine = QueryEngine::new().unwrap();
    let err = engine
        .register_input(
            "weather",
            &DatasetInput::from(dir.path()),
            &InputFormat::Partitioned,
        )
        .unwrap_err();

    assert!(err.to_string().contains("no Parquet files"));
}

// ============================================================================
// SQL helpers
// ============================================================================

#[test]
fn test_parse_date_accepts_text_and_rejects_garbage() {
    let engine = QueryEngine::new().unwrap();
    let sql = format!(
        "SELECT {} AS d FROM (VALUES ('07/04/2021'), ('not a date')) t(raw) ORDER BY d NULLS LAST",
        sql::parse_date("raw", "%m/%d/%Y")
    );
    assert_eq!(
        rows(&engine, &sql),
        vec![json!({"d": "2021-07-04"}), json!({"d": null})]
    );
}

#[test]
fn test_counter_coercion() {
    let engine = QueryEngine::new().unwrap();
    let sql = format!(
        "SELECT {} AS n FROM (VALUES (1, '3'), (2, NULL), (3, 'abc'), (4, '-2')) t(i, raw) ORDER BY i",
        sql::to_counter("raw")
    );
    assert_eq!(
        rows(&engine, &sql),
        vec![json!({"n": 3}), json!({"n": 0}), json!({"n": 0}), json!({"n": 0})]
    );
}

#[test]
fn test_engine_debug() {
    let engine = QueryEngine::new().unwrap();
    assert!(format!("{engine:?}").contains("QueryEngine"));
}

#[test]
fn test_duckdb_failures_are_query_errors() {
    let engine = QueryEngine::new().unwrap();
    let err = engine.execute("SELEC 1").unwrap_err();
    assert!(matches!(err, Error::Query(_)));
}
