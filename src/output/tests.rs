//! Tests for output module

use super::*;
use crate::database::{Connection, DuckDbConnection, SelectStatement};
use crate::delimiter::Delimiter;
use crate::error::ErrorKind;
use crate::schema::{InferredSchema, SchemaField};
use crate::types::{StorageType, TableName, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;

fn columns(list: &[&str]) -> Arc<[String]> {
    list.iter().map(ToString::to_string).collect::<Vec<_>>().into()
}

fn people_batch() -> RowBatch {
    RowBatch::new(
        columns(&["id", "name", "amount"]),
        vec![
            vec![
                Value::Int64(1),
                Value::String("Alice".into()),
                Value::Float64(10.5),
            ],
            vec![Value::Int64(2), Value::String("Bob".into()), Value::Null],
        ],
    )
}

fn people_schema() -> InferredSchema {
    InferredSchema::new(vec![
        SchemaField::new("id", StorageType::Int64),
        SchemaField::new("name", StorageType::String),
        SchemaField::new("amount", StorageType::Float64),
    ])
}

fn count_rows(db: &DuckDbConnection, table: &str) -> usize {
    let statement = SelectStatement::new(TableName::new(table), vec!["id".to_string()]);
    let mut total = 0;
    db.select(&statement, 1000, &mut |rows| {
        total += rows.len();
        Ok(())
    })
    .unwrap();
    total
}

// ============================================================================
// File Writer Tests
// ============================================================================

#[test]
fn test_file_writer_header_and_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.csv");

    let mut writer =
        FileWriter::create(&path, columns(&["id", "name", "amount"]), &Delimiter::default())
            .unwrap();
    assert_eq!(writer.write(&people_batch()).unwrap(), 2);
    writer.finalize().unwrap();

    assert_eq!(writer.records_written(), 2);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "id,name,amount\n1,Alice,10.5\n2,Bob,\n");
}

#[test]
fn test_file_writer_header_once_across_batches() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tsv");

    let mut writer = FileWriter::create(
        &path,
        columns(&["id", "name", "amount"]),
        &Delimiter::new("tab"),
    )
    .unwrap();
    writer.write(&people_batch()).unwrap();
    writer.write(&people_batch()).unwrap();
    writer.finalize().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches("id\tname\tamount").count(), 1);
    assert_eq!(content.lines().count(), 5);
    assert_eq!(writer.records_written(), 4);
}

#[test]
fn test_file_writer_empty_source_writes_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.csv");

    let mut writer =
        FileWriter::create(&path, columns(&["a", "b"]), &Delimiter::default()).unwrap();
    writer.finalize().unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    assert_eq!(writer.records_written(), 0);
}

#[test]
fn test_file_writer_quotes_embedded_delimiters() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("quoted.csv");

    let batch = RowBatch::new(
        columns(&["note"]),
        vec![vec![Value::String("a,b".into())], vec![Value::String("line\nbreak".into())]],
    );
    let mut writer = FileWriter::create(&path, columns(&["note"]), &Delimiter::default()).unwrap();
    writer.write(&batch).unwrap();
    writer.finalize().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "note\n\"a,b\"\n\"line\nbreak\"\n");
}

#[test]
fn test_file_writer_rejects_other_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.csv");

    let mut writer = FileWriter::create(&path, columns(&["name", "id", "amount"]), &Delimiter::default())
        .unwrap();
    let err = writer.write(&people_batch()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unexpected);
    assert_eq!(writer.records_written(), 0);
}

#[test]
fn test_file_writer_bad_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("x.csv");
    assert!(FileWriter::create(&path, columns(&["a"]), &Delimiter::default()).is_err());
}

// ============================================================================
// Table Writer Tests
// ============================================================================

#[test]
fn test_table_writer_creates_and_inserts() {
    let db = DuckDbConnection::open_in_memory().unwrap();
    let mut writer = TableWriter::new(&db, TableName::new("people"));

    assert_eq!(writer.prepare(&people_schema()).unwrap(), TablePreparation::Created);
    writer.write(&people_batch()).unwrap();
    writer.finalize().unwrap();

    assert_eq!(writer.records_written(), 2);
    assert_eq!(count_rows(&db, "people"), 2);

    let described = db.describe_table(&TableName::new("people")).unwrap();
    let types: Vec<_> = described.iter().map(|c| c.data_type.as_str()).collect();
    assert_eq!(types, vec!["BIGINT", "VARCHAR", "DOUBLE"]);
}

#[test]
fn test_table_writer_keeps_existing_table() {
    let db = DuckDbConnection::open_in_memory().unwrap();
    db.command("CREATE TABLE people (id BIGINT, name VARCHAR, amount DOUBLE, extra VARCHAR)")
        .unwrap();
    let writer = TableWriter::new(&db, TableName::new("people"));

    assert_eq!(writer.prepare(&people_schema()).unwrap(), TablePreparation::Existing);
    assert_eq!(db.describe_table(&TableName::new("people")).unwrap().len(), 4);
}

#[test]
fn test_table_writer_schema_mismatch() {
    let db = DuckDbConnection::open_in_memory().unwrap();
    let mut writer = TableWriter::new(&db, TableName::new("people"));
    writer.prepare(&people_schema()).unwrap();
    writer.write(&people_batch()).unwrap();

    let bad = RowBatch::new(
        columns(&["id", "name", "amount"]),
        vec![vec![
            Value::String("not a number".into()),
            Value::String("Eve".into()),
            Value::Null,
        ]],
    );
    let err = writer.write(&bad).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    assert_eq!(err.identifier().as_deref(), Some("people"));
    assert_eq!(writer.records_written(), 2);
    assert_eq!(count_rows(&db, "people"), 2);
}

#[test]
fn test_table_writer_unknown_column() {
    let db = DuckDbConnection::open_in_memory().unwrap();
    db.command("CREATE TABLE people (id BIGINT)").unwrap();
    let mut writer = TableWriter::new(&db, TableName::new("people"));

    let err = writer.write(&people_batch()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}

#[test]
fn test_table_writer_empty_batch() {
    let db = DuckDbConnection::open_in_memory().unwrap();
    let mut writer = TableWriter::new(&db, TableName::new("nothing"));
    let empty = RowBatch::new(columns(&["id"]), Vec::new());

    assert_eq!(writer.write(&empty).unwrap(), 0);
    assert_eq!(writer.destination(), "nothing");
}
