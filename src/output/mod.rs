//! Output module
//!
//! Destination writers consume row batches in order and keep a running
//! count of the rows they have durably written.
//!
//! # Overview
//!
//! - [`FileWriter`]: delimited file with a header row derived from the
//!   selection
//! - [`TableWriter`]: database table, created from an inferred schema when
//!   absent, one insert per batch

mod table;
mod writer;

pub use table::{TablePreparation, TableWriter};
pub use writer::FileWriter;

use crate::error::Result;
use crate::types::RowBatch;

/// A sink for row batches
pub trait DestinationWriter {
    /// Write one batch, returning the number of rows written
    fn write(&mut self, batch: &RowBatch) -> Result<usize>;

    /// Flush and release anything still pending
    fn finalize(&mut self) -> Result<()>;

    /// Rows durably written so far
    fn records_written(&self) -> u64;

    /// Human-readable destination (path or table)
    fn destination(&self) -> String;
}

#[cfg(test)]
mod tests;
