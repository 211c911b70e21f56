//! Integration tests for record file input and output.

use std::fs;

use polars::prelude::{Column, DataFrame};
use redcap_cli::output::{read_records, write_csv, write_json};
use redcap_model::{RawRow, TypedRow, TypedValue};
use serde_json::{Value, json};

#[test]
fn test_write_json_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.json");
    let records = vec![RawRow::from([
        ("record_id".to_string(), "1".to_string()),
        ("age".to_string(), "45".to_string()),
    ])];

    write_json(&records, Some(&path)).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, json!([{"record_id": "1", "age": "45"}]));
}

#[test]
fn test_write_json_typed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typed.json");
    let date = chrono_date();
    let rows = vec![TypedRow::from([
        ("age".to_string(), Some(TypedValue::Int(45))),
        ("visit_date".to_string(), Some(TypedValue::Date(date))),
        ("weight".to_string(), None),
    ])];

    write_json(&rows, Some(&path)).unwrap();

    let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written,
        json!([{"age": 45, "visit_date": "2024-01-15", "weight": null}])
    );
}

fn chrono_date() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

#[test]
fn test_write_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.csv");
    let mut frame = DataFrame::new(vec![
        Column::new("record_id".into(), ["1", "2"]),
        Column::new("age".into(), [Some("45"), None]),
    ])
    .unwrap();

    write_csv(&mut frame, Some(&path)).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = written.lines().collect();
    assert_eq!(lines, ["record_id,age", "1,45", "2,"]);
}

#[test]
fn test_read_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("import.json");
    fs::write(
        &path,
        r#"[{"record_id": "1", "age": "45"}, {"record_id": "2", "age": ""}]"#,
    )
    .unwrap();

    let records = read_records(&path).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["record_id"], "2");
}

#[test]
fn test_read_records_rejects_non_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("import.json");
    fs::write(&path, r#"{"record_id": "1"}"#).unwrap();

    let err = read_records(&path).unwrap_err();

    assert!(err.to_string().contains("does not hold a JSON array"));
}

#[test]
fn test_read_records_rejects_non_object_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("import.json");
    fs::write(&path, r#"[{"record_id": "1"}, 3]"#).unwrap();

    let err = read_records(&path).unwrap_err();

    assert!(err.to_string().contains("record 1"));
}
