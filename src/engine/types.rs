//! Engine types
//!
//! Transfer requests, phases, statistics and results for the ingestion
//! engine.

use crate::database::Connection;
use crate::delimiter::Delimiter;
use crate::error::{Error, ErrorReport};
use crate::reader::BatchSource;
use crate::types::TableName;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Descriptors
// ============================================================================

/// Where a transfer reads rows from
pub enum SourceDescriptor<'a> {
    /// A table behind an open connection
    Database {
        /// Open database handle
        connection: &'a dyn Connection,
        /// Source table
        table: TableName,
    },
    /// A delimited file with a header row
    File {
        /// File path
        path: PathBuf,
        /// Field separator
        delimiter: Delimiter,
    },
}

impl<'a> SourceDescriptor<'a> {
    /// Table source
    pub fn database(connection: &'a dyn Connection, table: TableName) -> Self {
        SourceDescriptor::Database { connection, table }
    }

    /// File source
    pub fn file(path: impl Into<PathBuf>, delimiter: Delimiter) -> Self {
        SourceDescriptor::File {
            path: path.into(),
            delimiter,
        }
    }

    /// Reader over this source
    pub fn batch_source(&self) -> BatchSource<'a> {
        match self {
            SourceDescriptor::Database { connection, table } => {
                BatchSource::table(*connection, table.clone())
            }
            SourceDescriptor::File { path, delimiter } => {
                BatchSource::file(path.clone(), delimiter.clone())
            }
        }
    }
}

impl std::fmt::Debug for SourceDescriptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceDescriptor::Database { table, .. } => f
                .debug_struct("Database")
                .field("table", table)
                .finish_non_exhaustive(),
            SourceDescriptor::File { path, delimiter } => f
                .debug_struct("File")
                .field("path", path)
                .field("delimiter", delimiter)
                .finish(),
        }
    }
}

/// Where a transfer writes rows to
pub enum TargetDescriptor<'a> {
    /// A table behind an open connection, created if absent
    Database {
        /// Open database handle
        connection: &'a dyn Connection,
        /// Destination table; required
        table: Option<TableName>,
    },
    /// A new delimited file in the export directory
    File {
        /// File name base; a unique suffix is always appended
        base_name: Option<String>,
        /// Field separator
        delimiter: Delimiter,
    },
}

impl<'a> TargetDescriptor<'a> {
    /// Table target
    pub fn database(connection: &'a dyn Connection, table: Option<TableName>) -> Self {
        TargetDescriptor::Database { connection, table }
    }

    /// File target
    pub fn file(base_name: Option<String>, delimiter: Delimiter) -> Self {
        TargetDescriptor::File {
            base_name,
            delimiter,
        }
    }
}

impl std::fmt::Debug for TargetDescriptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetDescriptor::Database { table, .. } => f
                .debug_struct("Database")
                .field("table", table)
                .finish_non_exhaustive(),
            TargetDescriptor::File {
                base_name,
                delimiter,
            } => f
                .debug_struct("File")
                .field("base_name", base_name)
                .field("delimiter", delimiter)
                .finish(),
        }
    }
}

/// One transfer: source, target and the ordered column selection
#[derive(Debug)]
pub struct TransferRequest<'a> {
    /// Where rows come from
    pub source: SourceDescriptor<'a>,
    /// Where rows go
    pub target: TargetDescriptor<'a>,
    /// Selected columns, in output order
    pub columns: Vec<String>,
}

impl<'a> TransferRequest<'a> {
    /// Create a request
    pub fn new(
        source: SourceDescriptor<'a>,
        target: TargetDescriptor<'a>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            source,
            target,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Phases and Cancellation
// ============================================================================

/// Transfer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    /// Checking the request and the source
    Validating,
    /// Creating the destination table (file to database only)
    SchemaPreparing,
    /// Moving batches
    Transferring,
    /// Finished successfully
    Completed,
    /// Stopped on an error
    Failed,
}

impl std::fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransferPhase::Validating => "validating",
            TransferPhase::SchemaPreparing => "schema_preparing",
            TransferPhase::Transferring => "transferring",
            TransferPhase::Completed => "completed",
            TransferPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation, checked between batches
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Statistics and Results
// ============================================================================

/// Statistics from a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Rows durably written
    pub record_count: u64,
    /// Batches written
    pub batches: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl TransferStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a written batch and the writer's new running total
    pub fn add_batch(&mut self, total_written: u64) {
        self.batches += 1;
        self.record_count = total_written;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Outcome of one transfer, produced exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    /// Whether the transfer completed
    pub success: bool,
    /// Rows durably written, also on failure
    pub record_count: u64,
    /// Batches written
    pub batches: u64,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// Summary line
    pub message: String,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    /// Phase the transfer failed in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<TransferPhase>,
    /// Exported file, for database to file transfers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Destination table, for file to database transfers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    /// Schema preparation problem that did not stop the transfer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_warning: Option<String>,
}

/// What the engine tracked while a transfer ran
#[derive(Debug, Clone)]
pub(crate) struct Progress {
    pub phase: TransferPhase,
    pub stats: TransferStats,
    pub output_path: Option<PathBuf>,
    pub target_table: Option<TableName>,
    pub schema_warning: Option<String>,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            phase: TransferPhase::Validating,
            stats: TransferStats::new(),
            output_path: None,
            target_table: None,
            schema_warning: None,
        }
    }

    pub fn enter(&mut self, phase: TransferPhase) {
        tracing::info!("Transfer phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}

impl IngestionResult {
    pub(crate) fn completed(progress: Progress, message: String) -> Self {
        Self {
            success: true,
            record_count: progress.stats.record_count,
            batches: progress.stats.batches,
            duration_ms: progress.stats.duration_ms,
            message,
            error: None,
            failed_phase: None,
            output_path: progress.output_path,
            target_table: progress.target_table.map(|t| t.to_string()),
            schema_warning: progress.schema_warning,
        }
    }

    pub(crate) fn failed(progress: Progress, phase: TransferPhase, error: &Error) -> Self {
        let report = error.report();
        Self {
            success: false,
            record_count: progress.stats.record_count,
            batches: progress.stats.batches,
            duration_ms: progress.stats.duration_ms,
            message: format!(
                "{} after {} records: {}",
                report.kind, progress.stats.record_count, report.detail
            ),
            error: Some(report),
            failed_phase: Some(phase),
            output_path: progress.output_path,
            target_table: progress.target_table.map(|t| t.to_string()),
            schema_warning: progress.schema_warning,
        }
    }

    /// Error classification, when failed
    pub fn error_kind(&self) -> Option<crate::error::ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
