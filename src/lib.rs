// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Flatbridge
//!
//! A bounded-memory ingestion engine that moves tabular data between a
//! columnar analytical database (DuckDB) and delimited flat files, in either
//! direction, under a user-selected column projection.
//!
//! ## Features
//!
//! - **Column Projection**: selection order is the output order, missing
//!   columns fail before any I/O
//! - **Chunked Reads**: at most one batch of rows in memory (10,000 by default)
//! - **Schema Inference**: best-effort column types from a small file sample
//! - **Create If Absent**: destination tables are created from the inferred
//!   schema; a failed create is a warning, not a failure
//! - **Classified Errors**: every failure carries a kind, a detail and the
//!   row or identifier involved, plus the count of rows already written
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flatbridge::database::DuckDbConnection;
//! use flatbridge::engine::{IngestionEngine, SourceDescriptor, TargetDescriptor, TransferRequest};
//! use flatbridge::{Delimiter, EngineConfig, TableName};
//!
//! let db = DuckDbConnection::open("warehouse.duckdb")?;
//! let engine = IngestionEngine::new(EngineConfig::default());
//!
//! let request = TransferRequest::new(
//!     SourceDescriptor::file("uploads/people.csv", Delimiter::new("comma")),
//!     TargetDescriptor::database(&db, Some(TableName::new("people"))),
//!     ["id", "name", "amount"],
//! );
//! let result = engine.ingest(&request);
//! println!("{} records", result.record_count);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      IngestionEngine                         │
//! │   Validating → SchemaPreparing → Transferring → Completed    │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────┬────────────┬────┴───────┬─────────────┬─────────┐
//! │ Delimiter │ Projection │   Schema   │   Reader    │ Output  │
//! ├───────────┼────────────┼────────────┼─────────────┼─────────┤
//! │ comma/tab │ validate   │ sample 5   │ CSV batches │ CSV     │
//! │ pipe/...  │ reorder    │ rows       │ SELECT      │ INSERT  │
//! └───────────┴────────────┴────────────┴─────────────┴─────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and error classification
pub mod error;

/// Scalar values, storage types and row batches
pub mod types;

/// Delimiter name resolution
pub mod delimiter;

/// Column selection and projection
pub mod projection;

/// Engine configuration
pub mod config;

/// Database connector support via DuckDB
pub mod database;

/// Schema inference from flat-file samples
pub mod schema;

/// Chunked readers for files and tables
pub mod reader;

/// Destination writers for files and tables
pub mod output;

/// Upload and download directories
pub mod storage;

/// Ingestion engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, ErrorReport, Result};
pub use types::*;

// Re-export commonly used types
pub use config::EngineConfig;
pub use delimiter::Delimiter;
pub use engine::{IngestionEngine, IngestionResult};
pub use projection::ColumnSelection;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
