//! Ingestion engine module
//!
//! Wires the readers, the schema inferrer and the destination writers into
//! the two transfer directions.
//!
//! # Overview
//!
//! The engine module provides:
//! - `IngestionEngine` - Validates requests and runs transfers
//! - `TransferRequest` - Source, target and column selection for one transfer
//! - `IngestionResult` - Record count, statistics and the classified error
//!
//! Every transfer walks `Validating -> (SchemaPreparing) -> Transferring ->
//! Completed | Failed`. Nothing is written to the destination before
//! validation passes. A failure in schema preparation is downgraded to a
//! warning; any failure while transferring stops the transfer, and the rows
//! written up to that point stay written and are counted.

mod types;

pub use types::{
    CancelFlag, IngestionResult, SourceDescriptor, TargetDescriptor, TransferPhase,
    TransferRequest, TransferStats,
};

use crate::config::EngineConfig;
use crate::database::Connection;
use crate::delimiter::Delimiter;
use crate::error::{Error, Result};
use crate::output::{DestinationWriter, FileWriter, TableWriter};
use crate::projection::{self, ColumnSelection, Projection};
use crate::reader::{BatchSource, ReadOptions};
use crate::schema::{InferredSchema, SchemaInferrer};
use crate::storage::FileStore;
use crate::types::{RowBatch, TableName};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use types::Progress;

/// Ingestion engine
#[derive(Debug, Clone)]
pub struct IngestionEngine {
    /// Engine configuration
    config: EngineConfig,
    /// Upload/download directories
    store: FileStore,
    /// Cancellation, shared with whoever may stop the transfer
    cancel: CancelFlag,
}

impl IngestionEngine {
    /// Create a new engine
    pub fn new(config: EngineConfig) -> Self {
        let store = FileStore::from_config(&config);
        Self {
            config,
            store,
            cancel: CancelFlag::new(),
        }
    }

    /// Share a cancellation flag with the caller
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the file store
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Get the cancellation flag
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Check that the database answers
    pub fn check(&self, connection: &dyn Connection) -> Result<()> {
        connection.ping()?;
        info!("Connection check succeeded");
        Ok(())
    }

    /// Tables visible to the connection
    pub fn list_tables(&self, connection: &dyn Connection) -> Result<Vec<String>> {
        connection.list_tables(None)
    }

    /// Columns a source exposes
    pub fn discover_columns(&self, source: &SourceDescriptor<'_>) -> Result<Vec<String>> {
        source.batch_source().columns()
    }

    /// First `preview_limit` rows of a source under a validated selection
    pub fn preview(&self, source: &SourceDescriptor<'_>, columns: &[String]) -> Result<RowBatch> {
        let selection = ColumnSelection::new(columns.iter().cloned())?;
        let reader = source.batch_source();
        let projection = projection::project(&selection, &reader.columns()?)?;

        let limit = self.config.preview_limit;
        let mut options = ReadOptions::new(self.config.batch_size.min(limit)).with_limit(limit);
        if let SourceDescriptor::File { path, delimiter } = source {
            let schema = self.inferrer().infer_file(path, delimiter, &selection)?;
            options = options.with_types(schema.storage_types());
        }

        let mut preview = RowBatch::with_capacity(selection.column_list(), limit);
        reader.for_each_batch(&projection, &options, &mut |batch| {
            for row in batch.into_rows() {
                preview.push(row);
            }
            Ok(())
        })?;

        debug!("Previewed {} rows from {}", preview.len(), reader.describe());
        Ok(preview)
    }

    /// Run one transfer to completion or failure
    pub fn ingest(&self, request: &TransferRequest<'_>) -> IngestionResult {
        let start = Instant::now();
        let mut progress = Progress::new();
        info!(
            "Starting transfer {:?} -> {:?} ({} columns)",
            request.source,
            request.target,
            request.columns.len()
        );

        let outcome = self.run(request, &mut progress);
        progress
            .stats
            .set_duration(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX));

        match outcome {
            Ok(message) => {
                progress.enter(TransferPhase::Completed);
                info!(
                    "{} ({} batches, {} ms)",
                    message, progress.stats.batches, progress.stats.duration_ms
                );
                IngestionResult::completed(progress, message)
            }
            Err(e) => {
                error!(
                    "Transfer failed during {} after {} records: {}",
                    progress.phase, progress.stats.record_count, e
                );
                let failed_in = progress.phase;
                progress.enter(TransferPhase::Failed);
                IngestionResult::failed(progress, failed_in, &e)
            }
        }
    }

    fn run(&self, request: &TransferRequest<'_>, progress: &mut Progress) -> Result<String> {
        let selection = ColumnSelection::new(request.columns.iter().cloned())?;

        match (&request.source, &request.target) {
            (
                SourceDescriptor::Database { connection, table },
                TargetDescriptor::File {
                    base_name,
                    delimiter,
                },
            ) => self.export(
                *connection,
                table,
                &selection,
                base_name.as_deref(),
                delimiter,
                progress,
            ),
            (
                SourceDescriptor::File { path, delimiter },
                TargetDescriptor::Database { connection, table },
            ) => {
                let table = table
                    .clone()
                    .filter(|t| !t.is_blank())
                    .ok_or_else(|| Error::missing_parameter("target table"))?;
                self.import(path, delimiter, *connection, table, &selection, progress)
            }
            (source, target) => Err(Error::invalid_request(format!(
                "unsupported transfer direction: {source:?} -> {target:?}"
            ))),
        }
    }

    /// Database table to a new delimited file
    fn export(
        &self,
        connection: &dyn Connection,
        table: &TableName,
        selection: &ColumnSelection,
        base_name: Option<&str>,
        delimiter: &Delimiter,
        progress: &mut Progress,
    ) -> Result<String> {
        delimiter.as_byte()?;
        let source = BatchSource::table(connection, table.clone());
        let projection = projection::project(selection, &source.columns()?)?;

        progress.enter(TransferPhase::Transferring);
        std::fs::create_dir_all(self.store.download_dir())?;
        let base = base_name.map_or_else(|| format!("{}_export", table.name), str::to_string);
        let path = self.store.export_path(&base);
        progress.output_path = Some(path.clone());

        let mut writer = FileWriter::create(&path, selection.column_list(), delimiter)?;
        let options = ReadOptions::new(self.config.batch_size);
        self.transfer(&source, &projection, &options, &mut writer, progress)?;

        Ok(format!(
            "Exported {} records from {} to {}",
            progress.stats.record_count,
            table,
            path.display()
        ))
    }

    /// Delimited file into a database table, created if absent
    fn import(
        &self,
        path: &Path,
        delimiter: &Delimiter,
        connection: &dyn Connection,
        table: TableName,
        selection: &ColumnSelection,
        progress: &mut Progress,
    ) -> Result<String> {
        delimiter.as_byte()?;
        let source = BatchSource::file(path, delimiter.clone());
        let projection = projection::project(selection, &source.columns()?)?;
        connection.ping()?;
        progress.target_table = Some(table.clone());

        progress.enter(TransferPhase::SchemaPreparing);
        let mut writer = TableWriter::new(connection, table);
        let plan = self.prepare_schema(&writer, connection, path, delimiter, selection, progress);

        progress.enter(TransferPhase::Transferring);
        let options = ReadOptions::new(self.config.batch_size)
            .with_types(plan.storage_types())
            .with_strict(self.config.strict_values);
        self.transfer(&source, &projection, &options, &mut writer, progress)?;

        Ok(format!(
            "Ingested {} records from {} into {}",
            progress.stats.record_count,
            path.display(),
            writer.table()
        ))
    }

    /// Decide the per-column type plan and create the table when absent.
    ///
    /// Never fails: problems are logged, recorded on the result, and the
    /// transfer carries on against whatever table exists.
    fn prepare_schema(
        &self,
        writer: &TableWriter<'_>,
        connection: &dyn Connection,
        path: &Path,
        delimiter: &Delimiter,
        selection: &ColumnSelection,
        progress: &mut Progress,
    ) -> InferredSchema {
        let described = match connection.describe_table(writer.table()) {
            Ok(described) => described,
            Err(e) => {
                warn!("Could not describe {}: {}", writer.table(), e);
                Vec::new()
            }
        };
        if !described.is_empty() {
            debug!(
                "Table {} exists; using its column types",
                writer.table()
            );
            return InferredSchema::from_table(selection.columns(), &described);
        }

        let schema = match self.inferrer().infer_file(path, delimiter, selection) {
            Ok(schema) => schema,
            Err(e) => {
                warn!("Schema inference failed, typing every column as text: {}", e);
                progress.schema_warning = Some(e.to_string());
                InferredSchema::all_strings(selection.columns())
            }
        };

        if let Err(e) = writer.prepare(&schema) {
            warn!(
                "Could not create table {}; assuming it already matches: {}",
                writer.table(),
                e
            );
            progress.schema_warning = Some(e.to_string());
        }
        schema
    }

    /// Pull batches from `source` and push each to `writer` until the source
    /// is exhausted or something fails
    fn transfer(
        &self,
        source: &BatchSource<'_>,
        projection: &Projection,
        options: &ReadOptions,
        writer: &mut dyn DestinationWriter,
        progress: &mut Progress,
    ) -> Result<()> {
        let cancel = &self.cancel;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        source.for_each_batch(projection, options, &mut |batch| {
            if cancel.is_cancelled() {
                warn!(
                    "Transfer cancelled after {} records",
                    writer.records_written()
                );
                return Err(Error::Cancelled);
            }

            let written = writer.write(&batch)?;
            progress.stats.add_batch(writer.records_written());
            info!(
                "Batch {}: wrote {} rows to {} ({} total)",
                progress.stats.batches,
                written,
                writer.destination(),
                progress.stats.record_count
            );
            Ok(())
        })?;

        writer.finalize()
    }

    fn inferrer(&self) -> SchemaInferrer {
        SchemaInferrer::new().with_sample_rows(self.config.sample_rows)
    }
}
