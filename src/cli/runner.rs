//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, SourceArgs};
use crate::config::EngineConfig;
use crate::database::{Connection, DuckDbConnection};
use crate::delimiter::Delimiter;
use crate::engine::{
    CancelFlag, IngestionEngine, IngestionResult, SourceDescriptor, TargetDescriptor,
    TransferRequest,
};
use crate::error::{Error, Result, ResultExt};
use crate::projection::ColumnSelection;
use crate::types::{RowBatch, TableName};
use serde_json::{json, Value};
use std::path::Path;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let cancel = CancelFlag::new();
        let engine = IngestionEngine::new(config).with_cancel_flag(cancel.clone());

        match &self.cli.command {
            Commands::Check => self.check(&engine),
            Commands::Tables { schema } => self.tables(schema.as_deref()),
            Commands::Columns { source } => self.columns(&engine, source),
            Commands::Preview { source, columns } => self.preview(&engine, source, columns),
            Commands::Export { .. } | Commands::Import { .. } => {
                self.transfer(engine, cancel).await
            }
            Commands::Upload { path, name } => self.upload(&engine, path, name.as_deref()),
            Commands::Download { file, to } => self.download(&engine, file, to),
        }
    }

    /// Load engine configuration, falling back to defaults
    fn load_config(&self) -> Result<EngineConfig> {
        match &self.cli.config {
            Some(path) => EngineConfig::from_file(path),
            None => Ok(EngineConfig::default()),
        }
    }

    fn open_database(&self) -> Result<DuckDbConnection> {
        DuckDbConnection::open(&self.cli.database)
    }

    fn delimiter(engine: &IngestionEngine, name: Option<&str>) -> Delimiter {
        name.map_or_else(|| engine.config().default_delimiter.clone(), Delimiter::new)
    }

    /// Check the database connection
    fn check(&self, engine: &IngestionEngine) -> Result<()> {
        let status = self
            .open_database()
            .and_then(|db| engine.check(&db).and_then(|()| engine.list_tables(&db)));

        match status {
            Ok(tables) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED",
                        "message": format!("Connection successful. Found {} tables.", tables.len())
                    }
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "kind": e.kind(),
                        "message": e.to_string()
                    }
                }));
                Err(e)
            }
        }
    }

    /// List tables
    fn tables(&self, schema: Option<&str>) -> Result<()> {
        let db = self.open_database()?;
        let tables = db.list_tables(schema)?;
        self.output_message(&json!({
            "type": "TABLES",
            "database": db.location(),
            "tables": tables
        }));
        Ok(())
    }

    /// List the columns of a table or file
    fn columns(&self, engine: &IngestionEngine, args: &SourceArgs) -> Result<()> {
        let db = self.open_database()?;
        let source = Self::source(engine, &db, args)?;
        let columns = engine.discover_columns(&source)?;
        self.output_message(&json!({
            "type": "COLUMNS",
            "source": format!("{source:?}"),
            "columns": columns
        }));
        Ok(())
    }

    /// Show the first rows of a table or file
    fn preview(&self, engine: &IngestionEngine, args: &SourceArgs, columns: &str) -> Result<()> {
        let db = self.open_database()?;
        let source = Self::source(engine, &db, args)?;
        let selection = ColumnSelection::parse(columns)?;
        let batch = engine.preview(&source, selection.columns())?;
        self.output_message(&batch_to_json(&batch));
        Ok(())
    }

    /// Copy a local file into the upload directory
    fn upload(&self, engine: &IngestionEngine, path: &Path, name: Option<&str>) -> Result<()> {
        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| Error::missing_parameter("file name"))?,
        };
        let contents = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        let stored = engine.store().store_upload(&name, &contents)?;
        self.output_message(&json!({
            "type": "UPLOAD",
            "file": stored.file_name().and_then(|n| n.to_str()),
            "path": stored.display().to_string(),
            "bytes": contents.len()
        }));
        Ok(())
    }

    /// Copy an exported file out of the download directory
    fn download(&self, engine: &IngestionEngine, file: &str, to: &Path) -> Result<()> {
        let source = engine.store().resolve_export(file)?;
        let bytes = std::fs::copy(&source, to)
            .with_context(|| format!("Failed to copy {} to {}", source.display(), to.display()))?;
        self.output_message(&json!({
            "type": "DOWNLOAD",
            "source": source.display().to_string(),
            "destination": to.display().to_string(),
            "bytes": bytes
        }));
        Ok(())
    }

    /// Build a source descriptor from `--table` / `--file`
    fn source<'a>(
        engine: &IngestionEngine,
        db: &'a DuckDbConnection,
        args: &SourceArgs,
    ) -> Result<SourceDescriptor<'a>> {
        match (&args.table, &args.file) {
            (Some(table), None) => Ok(SourceDescriptor::database(db, TableName::parse(table))),
            (None, Some(file)) => Ok(SourceDescriptor::file(
                engine.store().resolve_source(file)?,
                Self::delimiter(engine, args.delimiter.as_deref()),
            )),
            _ => Err(Error::invalid_request("give exactly one of --table or --file")),
        }
    }

    /// Run an export or import on a blocking thread, cancelling on Ctrl-C
    async fn transfer(&self, engine: IngestionEngine, cancel: CancelFlag) -> Result<()> {
        engine
            .store()
            .ensure_dirs()
            .context("Failed to create data directories")?;

        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; stopping after the current batch");
                cancel.cancel();
            }
        });

        let command = self.cli.command.clone();
        let database = self.cli.database.clone();
        let outcome = tokio::task::spawn_blocking(move || -> Result<IngestionResult> {
            let db = DuckDbConnection::open(&database)?;
            let request = transfer_request(&engine, &db, &command)?;
            Ok(engine.ingest(&request))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Transfer task failed: {e}"))?;
        watcher.abort();

        let result = outcome?;
        self.output_message(&serde_json::to_value(&result)?);
        if result.success {
            Ok(())
        } else {
            Err(Error::Other(result.message))
        }
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Turn an `export` / `import` command into a transfer request
fn transfer_request<'a>(
    engine: &IngestionEngine,
    db: &'a DuckDbConnection,
    command: &Commands,
) -> Result<TransferRequest<'a>> {
    match command {
        Commands::Export {
            table,
            columns,
            output,
            delimiter,
        } => Ok(TransferRequest::new(
            SourceDescriptor::database(db, TableName::parse(table)),
            TargetDescriptor::file(
                output.clone(),
                Runner::delimiter(engine, delimiter.as_deref()),
            ),
            ColumnSelection::parse(columns)?.columns().iter().cloned(),
        )),
        Commands::Import {
            file,
            table,
            columns,
            delimiter,
        } => {
            let source = SourceDescriptor::file(
                engine.store().resolve_source(file)?,
                Runner::delimiter(engine, delimiter.as_deref()),
            );
            let columns = match columns {
                Some(list) => ColumnSelection::parse(list)?.columns().to_vec(),
                None => engine.discover_columns(&source)?,
            };
            Ok(TransferRequest::new(
                source,
                TargetDescriptor::database(db, Some(TableName::parse(table))),
                columns,
            ))
        }
        other => Err(Error::invalid_request(format!(
            "{other:?} is not a transfer"
        ))),
    }
}

/// Render a batch as `{"columns": [...], "rows": [[...], ...]}`
fn batch_to_json(batch: &RowBatch) -> Value {
    json!({
        "type": "PREVIEW",
        "columns": batch.columns(),
        "row_count": batch.len(),
        "rows": batch.rows()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value as FieldValue;
    use clap::Parser;
    use std::sync::Arc;

    #[test]
    fn test_batch_to_json() {
        let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
        let batch = RowBatch::new(
            columns,
            vec![
                vec![FieldValue::Int64(1), FieldValue::String("Alice".into())],
                vec![FieldValue::Int64(2), FieldValue::Null],
            ],
        );

        let value = batch_to_json(&batch);

        assert_eq!(value["columns"], json!(["id", "name"]));
        assert_eq!(value["row_count"], 2);
        assert_eq!(value["rows"][0], json!([1, "Alice"]));
        assert_eq!(value["rows"][1][1], Value::Null);
    }

    #[test]
    fn test_transfer_request_from_export() {
        let engine = IngestionEngine::new(EngineConfig::default());
        let db = DuckDbConnection::open_in_memory().unwrap();
        let cli = Cli::try_parse_from([
            "flatbridge",
            "export",
            "--table",
            "analytics.events",
            "--columns",
            "b, a",
        ])
        .unwrap();

        let request = transfer_request(&engine, &db, &cli.command).unwrap();

        assert_eq!(request.columns, vec!["b", "a"]);
        match request.source {
            SourceDescriptor::Database { table, .. } => {
                assert_eq!(table, TableName::qualified("analytics", "events"));
            }
            other => panic!("Expected database source, got {other:?}"),
        }
    }

    #[test]
    fn test_transfer_request_rejects_traversal() {
        let engine = IngestionEngine::new(EngineConfig::default());
        let db = DuckDbConnection::open_in_memory().unwrap();
        let cli = Cli::try_parse_from([
            "flatbridge",
            "import",
            "--file",
            "../secret.csv",
            "--table",
            "t",
        ])
        .unwrap();

        let err = transfer_request(&engine, &db, &cli.command).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidRequest);
    }
}
