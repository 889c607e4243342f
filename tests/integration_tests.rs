//! End-to-end transfer tests
//!
//! Tests the full flow: table → delimited file → table, through the public
//! engine API and through the CLI runner.

use clap::Parser;
use flatbridge::cli::{Cli, Runner};
use flatbridge::database::{Connection, DuckDbConnection, SelectStatement};
use flatbridge::engine::{
    IngestionEngine, SourceDescriptor, TargetDescriptor, TransferPhase, TransferRequest,
};
use flatbridge::{Delimiter, EngineConfig, ErrorKind, Row, StorageType, TableName, Value};
use pretty_assertions::assert_eq;
use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;

fn engine_in(dir: &TempDir) -> IngestionEngine {
    let config = EngineConfig::new()
        .with_upload_dir(dir.path().join("uploads"))
        .with_download_dir(dir.path().join("downloads"))
        .with_batch_size(1_000);
    let engine = IngestionEngine::new(config);
    engine.store().ensure_dirs().unwrap();
    engine
}

fn select_all(db: &DuckDbConnection, table: &str, columns: &[&str]) -> Vec<Row> {
    let statement = SelectStatement::new(
        TableName::new(table),
        columns.iter().map(ToString::to_string).collect(),
    );
    let mut rows = Vec::new();
    db.select(&statement, 500, &mut |batch| {
        rows.extend(batch);
        Ok(())
    })
    .unwrap();
    rows
}

fn seed_orders(db: &DuckDbConnection, rows: usize) {
    db.command(&format!(
        "CREATE TABLE orders AS
         SELECT range AS id,
                'customer ' || (range % 17) AS customer,
                CASE WHEN range % 5 = 0 THEN NULL ELSE (range * 1.25)::DOUBLE END AS amount,
                TIMESTAMP '2024-01-01 00:00:00' + INTERVAL (range) MINUTE AS placed_at
         FROM range({rows})"
    ))
    .unwrap();
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn test_round_trip_table_file_table() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let db = DuckDbConnection::open_in_memory().unwrap();
    seed_orders(&db, 2_500);
    let columns = ["id", "customer", "amount", "placed_at"];

    let exported = engine.ingest(&TransferRequest::new(
        SourceDescriptor::database(&db, TableName::new("orders")),
        TargetDescriptor::file(None, Delimiter::new("comma")),
        columns,
    ));
    assert!(exported.success, "{exported:?}");
    assert_eq!(exported.record_count, 2_500);
    assert_eq!(exported.batches, 3);

    let path = exported.output_path.unwrap();
    let imported = engine.ingest(&TransferRequest::new(
        SourceDescriptor::file(&path, Delimiter::new("comma")),
        TargetDescriptor::database(&db, Some(TableName::new("orders_copy"))),
        columns,
    ));
    assert!(imported.success, "{imported:?}");
    assert_eq!(imported.record_count, exported.record_count);

    let types: Vec<StorageType> = db
        .describe_table(&TableName::new("orders_copy"))
        .unwrap()
        .iter()
        .map(|c| StorageType::from_sql_type(&c.data_type))
        .collect();
    assert_eq!(
        types,
        vec![
            StorageType::Int64,
            StorageType::String,
            StorageType::Float64,
            StorageType::DateTime
        ]
    );

    let original = select_all(&db, "orders", &columns);
    let copy = select_all(&db, "orders_copy", &columns);
    assert_eq!(original.len(), copy.len());
    for (a, b) in original.iter().zip(&copy) {
        assert_eq!(a[0], b[0]);
        assert_eq!(a[1], b[1]);
        assert_eq!(a[2].to_field(), b[2].to_field());
        assert_eq!(a[3], b[3]);
    }
}

#[test]
fn test_round_trip_with_projection_and_tab_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let db = DuckDbConnection::open_in_memory().unwrap();
    seed_orders(&db, 10);

    let exported = engine.ingest(&TransferRequest::new(
        SourceDescriptor::database(&db, TableName::new("orders")),
        TargetDescriptor::file(Some("orders tab".to_string()), Delimiter::new("tab")),
        ["customer", "id"],
    ));
    let path = exported.output_path.unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("customer\tid\ncustomer 0\t0\n"));

    let imported = engine.ingest(&TransferRequest::new(
        SourceDescriptor::file(&path, Delimiter::new("TAB")),
        TargetDescriptor::database(&db, Some(TableName::new("customers"))),
        ["id", "customer"],
    ));
    assert!(imported.success, "{imported:?}");
    assert_eq!(
        select_all(&db, "customers", &["id", "customer"])[3],
        vec![Value::Int64(3), Value::String("customer 3".into())]
    );
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_people_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let db = DuckDbConnection::open_in_memory().unwrap();
    let path = engine
        .store()
        .store_upload("people.csv", b"id,name,amount\n1,Alice,10.5\n2,Bob,\n")
        .unwrap();

    let result = engine.ingest(&TransferRequest::new(
        SourceDescriptor::file(&path, Delimiter::new("comma")),
        TargetDescriptor::database(&db, Some(TableName::new("people"))),
        ["id", "name", "amount"],
    ));

    assert!(result.success);
    assert_eq!(result.record_count, 2);
    assert_eq!(
        select_all(&db, "people", &["amount"]),
        vec![vec![Value::Float64(10.5)], vec![Value::Null]]
    );
}

#[test]
fn test_malformed_row_42() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let db = DuckDbConnection::open_in_memory().unwrap();

    let mut content = String::from("id,name,amount\n");
    for i in 0..100 {
        if i == 42 {
            writeln!(content, "{i},only two").unwrap();
        } else {
            writeln!(content, "{i},n{i},{i}").unwrap();
        }
    }
    let path = engine
        .store()
        .store_upload("broken.csv", content.as_bytes())
        .unwrap();

    let result = engine.ingest(&TransferRequest::new(
        SourceDescriptor::file(&path, Delimiter::default()),
        TargetDescriptor::database(&db, Some(TableName::new("broken"))),
        ["id", "name", "amount"],
    ));

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::ParseError);
    assert_eq!(error.row, Some(42));
    assert!(error.detail.contains("row 42"));
    assert_eq!(result.record_count, 42);
    assert_eq!(select_all(&db, "broken", &["id"]).len(), 42);
}

#[test]
fn test_preview_missing_column_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let path = engine.store().store_upload("ab.csv", b"a,b\n1,2\n").unwrap();

    let err = engine
        .preview(
            &SourceDescriptor::file(&path, Delimiter::default()),
            &["missing_col".to_string()],
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingColumn);
    assert!(err.report().detail.contains("missing_col"));
}

#[test]
fn test_missing_column_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let db = DuckDbConnection::open_in_memory().unwrap();
    seed_orders(&db, 5);

    let result = engine.ingest(&TransferRequest::new(
        SourceDescriptor::database(&db, TableName::new("orders")),
        TargetDescriptor::file(None, Delimiter::default()),
        ["id", "missing_col"],
    ));

    assert_eq!(result.error.unwrap().kind, ErrorKind::MissingColumn);
    assert_eq!(result.failed_phase, Some(TransferPhase::Validating));
    let downloads = std::fs::read_dir(dir.path().join("downloads")).unwrap();
    assert_eq!(downloads.count(), 0);
}

// ============================================================================
// CLI
// ============================================================================

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("flatbridge.yaml");
    std::fs::write(
        &path,
        format!(
            "upload_dir: {}\ndownload_dir: {}\nbatch_size: 2\n",
            dir.join("uploads").display(),
            dir.join("downloads").display()
        ),
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_cli_import_then_export() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let database = dir.path().join("warehouse.duckdb");
    std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
    std::fs::write(
        dir.path().join("uploads").join("people.csv"),
        "id;name;amount\n1;Alice;10.5\n2;Bob;\n3;Carol;7\n",
    )
    .unwrap();

    let args = |extra: &[&str]| {
        let mut args = vec![
            "flatbridge".to_string(),
            "--database".to_string(),
            database.display().to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        args.extend(extra.iter().map(ToString::to_string));
        Cli::try_parse_from(args).unwrap()
    };

    Runner::new(args(&[
        "import",
        "--file",
        "people.csv",
        "--table",
        "people",
        "--delimiter",
        "semicolon",
    ]))
    .run()
    .await
    .unwrap();

    Runner::new(args(&[
        "export",
        "--table",
        "people",
        "--columns",
        "name,amount",
        "--output",
        "people",
    ]))
    .run()
    .await
    .unwrap();

    let exports: Vec<_> = std::fs::read_dir(dir.path().join("downloads"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(exports.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&exports[0]).unwrap(),
        "name,amount\nAlice,10.5\nBob,\nCarol,7\n"
    );

    let failed = Runner::new(args(&[
        "export",
        "--table",
        "ghosts",
        "--columns",
        "id",
    ]))
    .run()
    .await;
    assert!(failed.is_err());
}

#[tokio::test]
async fn test_cli_upload_and_download() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let database = dir.path().join("warehouse.duckdb");
    let local = dir.path().join("local people.csv");
    std::fs::write(&local, "id,name\n1,Alice\n2,Bob\n").unwrap();

    let run = |extra: &[&str]| {
        let mut args = vec![
            "flatbridge".to_string(),
            "--database".to_string(),
            database.display().to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        args.extend(extra.iter().map(ToString::to_string));
        Runner::new(Cli::try_parse_from(args).unwrap())
    };

    let local_arg = local.display().to_string();
    run(&["upload", "--path", local_arg.as_str()])
        .run()
        .await
        .unwrap();
    let stored = dir.path().join("uploads").join("local_people.csv");
    assert_eq!(
        std::fs::read_to_string(&stored).unwrap(),
        "id,name\n1,Alice\n2,Bob\n"
    );

    run(&["import", "--file", "local_people.csv", "--table", "people"])
        .run()
        .await
        .unwrap();
    run(&["export", "--table", "people", "--columns", "name", "--output", "names"])
        .run()
        .await
        .unwrap();

    let export_name = std::fs::read_dir(dir.path().join("downloads"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .next()
        .unwrap();
    let copy = dir.path().join("names.csv");
    let copy_arg = copy.display().to_string();
    run(&[
        "download",
        "--file",
        export_name.as_str(),
        "--to",
        copy_arg.as_str(),
    ])
    .run()
    .await
    .unwrap();
    assert_eq!(
        std::fs::read_to_string(&copy).unwrap(),
        "name\nAlice\nBob\n"
    );

    let missing = run(&["download", "--file", "nope.csv", "--to", "x.csv"])
        .run()
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let escaped = run(&["download", "--file", "../warehouse.duckdb", "--to", "x.csv"])
        .run()
        .await
        .unwrap_err();
    assert_eq!(escaped.kind(), ErrorKind::InvalidRequest);
}
