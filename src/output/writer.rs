//! Delimited file writer
//!
//! Writes row batches to a delimited file with a fixed header.

use super::DestinationWriter;
use crate::delimiter::Delimiter;
use crate::error::{Error, Result};
use crate::types::{RowBatch, Value};
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Delimited file writer
pub struct FileWriter {
    /// CSV writer
    writer: Writer<File>,
    /// Destination path
    path: PathBuf,
    /// Header, in selection order
    columns: Arc<[String]>,
    /// Whether the header row is out
    header_written: bool,
    /// Number of rows written
    rows_written: u64,
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("path", &self.path)
            .field("columns", &self.columns)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl FileWriter {
    /// Create the destination file. An existing file at `path` is
    /// truncated; callers pick unique paths.
    pub fn create(
        path: impl AsRef<Path>,
        columns: Arc<[String]>,
        delimiter: &Delimiter,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let delimiter = delimiter.as_byte()?;
        let file = File::create(&path).map_err(|e| {
            Error::output(format!("Failed to create file {}: {e}", path.display()))
        })?;

        Ok(Self {
            writer: WriterBuilder::new().delimiter(delimiter).from_writer(file),
            path,
            columns,
            header_written: false,
            rows_written: 0,
        })
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.writer
            .write_record(self.columns.iter())
            .map_err(|e| Error::output(format!("Failed to write header: {e}")))?;
        self.header_written = true;
        Ok(())
    }
}

impl DestinationWriter for FileWriter {
    fn write(&mut self, batch: &RowBatch) -> Result<usize> {
        if batch.columns() != &*self.columns {
            return Err(Error::output(format!(
                "batch columns [{}] do not match file header [{}]",
                batch.columns().join(", "),
                self.columns.join(", ")
            )));
        }

        self.write_header()?;
        for row in batch.rows() {
            self.writer
                .write_record(row.iter().map(Value::to_field))
                .map_err(|e| Error::output(format!("Failed to write row: {e}")))?;
        }
        self.writer
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush {}: {e}", self.path.display())))?;

        self.rows_written += batch.len() as u64;
        Ok(batch.len())
    }

    fn finalize(&mut self) -> Result<()> {
        // An empty source still produces a header-only file
        self.write_header()?;
        self.writer
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush {}: {e}", self.path.display())))?;
        tracing::debug!(
            "Finalized {} with {} rows",
            self.path.display(),
            self.rows_written
        );
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.rows_written
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}
