//! Chunked readers
//!
//! Turns a source (a delimited file or a database table) into a finite
//! sequence of [`RowBatch`]es restricted to a validated projection. No more
//! than one batch of rows is held in memory at a time, and every call to
//! [`BatchSource::for_each_batch`] starts again from the beginning of the
//! source.
//!
//! # Example
//!
//! ```rust,ignore
//! let source = BatchSource::file("uploads/people.csv", Delimiter::new("comma"));
//! let projection = projection::project(&selection, &source.columns()?)?;
//! source.for_each_batch(&projection, &ReadOptions::new(10_000), &mut |batch| {
//!     println!("{} rows", batch.len());
//!     Ok(())
//! })?;
//! ```

mod file;
mod table;

pub use file::{open_csv, read_header, CsvBatches, FileSource};
pub use table::TableSource;

use crate::database::Connection;
use crate::delimiter::Delimiter;
use crate::error::Result;
use crate::projection::Projection;
use crate::types::{RowBatch, StorageType, TableName};
use std::path::PathBuf;

/// Default number of rows per batch
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Options for one pass over a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum rows per batch
    pub batch_size: usize,
    /// Stop after this many rows
    pub limit: Option<usize>,
    /// Storage type of each projected column, in selection order. File
    /// fields are coerced to these types; `None` reads every field as text.
    pub types: Option<Vec<StorageType>>,
    /// Fail on fields that do not parse as their planned type instead of
    /// passing the raw text through
    pub strict: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl ReadOptions {
    /// Read in batches of at most `batch_size` rows
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            limit: None,
            types: None,
            strict: false,
        }
    }

    /// Stop after `limit` rows
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Coerce fields to the given per-column types
    #[must_use]
    pub fn with_types(mut self, types: Vec<StorageType>) -> Self {
        self.types = Some(types);
        self
    }

    /// Enable/disable strict value parsing
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Where rows are read from
#[derive(Debug)]
pub enum BatchSource<'a> {
    /// Delimited file with a header row
    File(FileSource),
    /// Database table
    Table(TableSource<'a>),
}

impl<'a> BatchSource<'a> {
    /// File source
    pub fn file(path: impl Into<PathBuf>, delimiter: Delimiter) -> Self {
        BatchSource::File(FileSource::new(path, delimiter))
    }

    /// Table source
    pub fn table(connection: &'a dyn Connection, table: TableName) -> Self {
        BatchSource::Table(TableSource::new(connection, table))
    }

    /// Columns the source exposes. Fails with `NotFound` when the file or
    /// table does not exist.
    pub fn columns(&self) -> Result<Vec<String>> {
        match self {
            BatchSource::File(source) => source.columns(),
            BatchSource::Table(source) => source.columns(),
        }
    }

    /// Stream every projected row to `visit`, one batch at a time, in
    /// source order. Stops at the first error from the source or `visit`.
    pub fn for_each_batch(
        &self,
        projection: &Projection,
        options: &ReadOptions,
        visit: &mut dyn FnMut(RowBatch) -> Result<()>,
    ) -> Result<()> {
        match self {
            BatchSource::File(source) => {
                for batch in source.batches(projection, options)? {
                    visit(batch?)?;
                }
                Ok(())
            }
            BatchSource::Table(source) => source.for_each_batch(projection, options, visit),
        }
    }

    /// Human-readable name of the source
    pub fn describe(&self) -> String {
        match self {
            BatchSource::File(source) => source.path().display().to_string(),
            BatchSource::Table(source) => source.table().to_string(),
        }
    }
}
