//! Delimited file reader

use super::ReadOptions;
use crate::delimiter::Delimiter;
use crate::error::{Error, Result};
use crate::projection::Projection;
use crate::types::{RowBatch, StorageType, Value};
use csv::{Reader, ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Open a delimited file for reading, header row included.
///
/// Field-count checking is left to the caller so that short and long rows
/// can be reported with their data row index.
pub fn open_csv(path: &Path, delimiter: &Delimiter) -> Result<Reader<File>> {
    let delimiter = delimiter.as_byte()?;
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.display().to_string(),
        },
        _ => Error::Io(e),
    })?;

    Ok(ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file))
}

/// Read the header row. An empty file has no header and is a parse error.
pub fn read_header(reader: &mut Reader<File>) -> Result<Vec<String>> {
    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if header.is_empty() || header.iter().all(String::is_empty) {
        return Err(Error::malformed("file is empty or has no header row"));
    }
    Ok(header)
}

/// A delimited file with a header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
    delimiter: Delimiter,
}

impl FileSource {
    /// Create a file source
    pub fn new(path: impl Into<PathBuf>, delimiter: Delimiter) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Field separator
    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    /// The header row
    pub fn columns(&self) -> Result<Vec<String>> {
        let mut reader = open_csv(&self.path, &self.delimiter)?;
        read_header(&mut reader)
    }

    /// Open a fresh pass over the file.
    ///
    /// `projection` must have been validated against this file's header.
    pub fn batches(&self, projection: &Projection, options: &ReadOptions) -> Result<CsvBatches> {
        let mut reader = open_csv(&self.path, &self.delimiter)?;
        let header = read_header(&mut reader)?;

        let types = match &options.types {
            Some(types) if types.len() == projection.columns().len() => types.clone(),
            Some(types) => {
                return Err(Error::invalid_request(format!(
                    "{} column types given for {} selected columns",
                    types.len(),
                    projection.columns().len()
                )))
            }
            None => vec![StorageType::String; projection.columns().len()],
        };

        Ok(CsvBatches {
            records: reader.into_records(),
            columns: projection.selection().column_list(),
            indices: projection.source_indices().to_vec(),
            types,
            header_len: header.len(),
            batch_size: options.batch_size.max(1),
            remaining: options.limit,
            strict: options.strict,
            row: 0,
            pending: None,
            done: false,
        })
    }
}

/// Lazy batches over one pass of a delimited file.
///
/// A malformed row ends the sequence: the rows before it in the current
/// batch are yielded first, then the error.
pub struct CsvBatches {
    records: StringRecordsIntoIter<File>,
    columns: Arc<[String]>,
    indices: Vec<usize>,
    types: Vec<StorageType>,
    header_len: usize,
    batch_size: usize,
    remaining: Option<usize>,
    strict: bool,
    /// Index of the next data row (header excluded)
    row: u64,
    pending: Option<Error>,
    done: bool,
}

impl std::fmt::Debug for CsvBatches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvBatches")
            .field("columns", &self.columns)
            .field("batch_size", &self.batch_size)
            .field("row", &self.row)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl CsvBatches {
    /// Data rows read so far
    pub fn rows_read(&self) -> u64 {
        self.row
    }

    fn convert(&self, record: &StringRecord) -> Result<Vec<Value>> {
        if record.len() != self.header_len {
            return Err(Error::parse(
                self.row,
                format!(
                    "expected {} fields, found {}",
                    self.header_len,
                    record.len()
                ),
            ));
        }

        self.indices
            .iter()
            .zip(&self.types)
            .zip(self.columns.iter())
            .map(|((&idx, &storage), column)| {
                let text = record.get(idx).unwrap_or_default();
                match Value::parse_as(text, storage) {
                    Some(value) => Ok(value),
                    None if self.strict => Err(Error::parse(
                        self.row,
                        format!("column '{column}': {text:?} is not a valid {storage}"),
                    )),
                    None => Ok(Value::String(text.to_string())),
                }
            })
            .collect()
    }

    fn next_batch(&mut self) -> RowBatch {
        let mut capacity = self.batch_size;
        if let Some(remaining) = self.remaining {
            capacity = capacity.min(remaining);
        }
        let mut batch = RowBatch::with_capacity(Arc::clone(&self.columns), capacity);

        while batch.len() < capacity {
            match self.records.next() {
                None => {
                    self.done = true;
                    break;
                }
                Some(Ok(record)) => match self.convert(&record) {
                    Ok(row) => {
                        batch.push(row);
                        self.row += 1;
                    }
                    Err(e) => {
                        self.pending = Some(e);
                        break;
                    }
                },
                Some(Err(e)) => {
                    self.pending = Some(Error::parse(self.row, e.to_string()));
                    break;
                }
            }
        }

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= batch.len();
            if *remaining == 0 {
                self.done = true;
            }
        }
        batch
    }
}

impl Iterator for CsvBatches {
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending.take() {
            self.done = true;
            return Some(Err(error));
        }
        if self.done {
            return None;
        }

        let batch = self.next_batch();
        if !batch.is_empty() {
            return Some(Ok(batch));
        }

        self.done = true;
        self.pending.take().map(Err)
    }
}
