//! Error types for Flatbridge
//!
//! This module defines the error hierarchy for the whole engine.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! Every error maps onto one [`ErrorKind`], which is what callers see in an
//! [`IngestionResult`](crate::engine::IngestionResult).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for Flatbridge
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Request / Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to serialize JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    #[error("Column(s) not found in source: {}", .columns.join(", "))]
    MissingColumn { columns: Vec<String> },

    #[error("Parse error at row {row}: {message}")]
    Parse { row: u64, message: String },

    #[error("Parse error: {message}")]
    Malformed { message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // ============================================================================
    // Destination Errors
    // ============================================================================
    #[error("Schema mismatch writing to '{table}': {message}")]
    SchemaMismatch { table: String, message: String },

    #[error("Insert into '{table}' failed: {message}")]
    Insert { table: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // Control Errors
    // ============================================================================
    #[error("Transfer cancelled")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Caller-facing classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The database could not be reached or opened
    ConnectionFailure,
    /// Missing source file or table
    NotFound,
    /// A selected column is absent from the source
    MissingColumn,
    /// Malformed row or file
    ParseError,
    /// Insert-time type or identifier conflict
    SchemaMismatch,
    /// Any other database write failure
    InsertError,
    /// Empty selection, missing parameter, bad delimiter or config
    InvalidRequest,
    /// The transfer was cancelled between batches
    Cancelled,
    /// Catch-all
    Unexpected,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::ConnectionFailure => "connection_failure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MissingColumn => "missing_column",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::InsertError => "insert_error",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

/// Serializable description of a failure, carried by results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable detail
    pub detail: String,
    /// Offending data row index (0-based, header excluded), when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
    /// Offending identifier (column, table or path), when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

/// Substrings in database error text that point at an identifier or a
/// value conversion problem rather than a generic write failure.
const SCHEMA_MISMATCH_MARKERS: &[&str] = &[
    "Unknown identifier",
    "Cannot parse input",
    "Binder Error",
    "Conversion Error",
    "Could not convert",
    "does not have a column",
];

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a parse error for a data row
    pub fn parse(row: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            row,
            message: message.into(),
        }
    }

    /// Create a parse error not tied to a data row
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Classify a failed insert by the text the database returned
    pub fn insert_failure(table: impl Into<String>, message: impl Into<String>) -> Self {
        let table = table.into();
        let message = message.into();
        if SCHEMA_MISMATCH_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
        {
            Self::SchemaMismatch { table, message }
        } else {
            Self::Insert { table, message }
        }
    }

    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. }
            | Error::MissingParameter { .. }
            | Error::InvalidRequest { .. }
            | Error::YamlParse(_) => ErrorKind::InvalidRequest,
            Error::Connection { .. } => ErrorKind::ConnectionFailure,
            Error::FileNotFound { .. } | Error::TableNotFound { .. } => ErrorKind::NotFound,
            Error::MissingColumn { .. } => ErrorKind::MissingColumn,
            Error::Parse { .. } | Error::Malformed { .. } | Error::Csv(_) => ErrorKind::ParseError,
            Error::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Error::Insert { .. } => ErrorKind::InsertError,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::JsonParse(_)
            | Error::Database { .. }
            | Error::Output { .. }
            | Error::Io(_)
            | Error::Other(_)
            | Error::Anyhow(_) => ErrorKind::Unexpected,
        }
    }

    /// Data row implicated by this error, if any
    pub fn row(&self) -> Option<u64> {
        match self {
            Error::Parse { row, .. } => Some(*row),
            Error::Csv(e) => e.position().map(|p| p.record().saturating_sub(1)),
            _ => None,
        }
    }

    /// Identifier implicated by this error, if any
    pub fn identifier(&self) -> Option<String> {
        match self {
            Error::MissingParameter { name } => Some(name.clone()),
            Error::FileNotFound { path } => Some(path.clone()),
            Error::TableNotFound { table }
            | Error::SchemaMismatch { table, .. }
            | Error::Insert { table, .. } => Some(table.clone()),
            Error::MissingColumn { columns } => Some(columns.join(", ")),
            _ => None,
        }
    }

    /// Build the caller-facing report for this error
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            detail: self.to_string(),
            row: self.row(),
            identifier: self.identifier(),
        }
    }
}

/// Result type alias for Flatbridge
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
