//! Schema inference from a flat-file sample
//!
//! Best effort by construction: only the first few data rows are looked
//! at, so a column that looks numeric in the sample may still hold text
//! further down. Such conflicts surface at insert time.

use super::types::{InferredSchema, ObservedType, SchemaField};
use crate::delimiter::Delimiter;
use crate::error::Result;
use crate::projection::{self, ColumnSelection};
use crate::reader::{open_csv, read_header};
use std::path::Path;

/// Schema inferrer with configuration options
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Data rows sampled after the header
    sample_rows: usize,
    /// Detect date-time values
    detect_datetime: bool,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferrer {
    /// Create a new schema inferrer with default settings
    pub fn new() -> Self {
        Self {
            sample_rows: 5,
            detect_datetime: true,
        }
    }

    /// Set the number of sampled rows
    #[must_use]
    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows.max(1);
        self
    }

    /// Enable/disable datetime detection
    #[must_use]
    pub fn with_datetime_detection(mut self, enabled: bool) -> Self {
        self.detect_datetime = enabled;
        self
    }

    /// Number of rows sampled
    pub fn sample_rows(&self) -> usize {
        self.sample_rows
    }

    /// Infer one storage type from a column's sampled values
    pub fn infer_column<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> ObservedType {
        values
            .into_iter()
            .map(|v| ObservedType::of(v, self.detect_datetime))
            .fold(ObservedType::Empty, ObservedType::merge_with)
    }

    /// Infer a schema from rows already split into fields.
    ///
    /// `samples` rows are positional over `columns`; short rows count as
    /// empty for the missing positions.
    pub fn infer_from_samples(&self, columns: &[String], samples: &[Vec<String>]) -> InferredSchema {
        let sampled = &samples[..samples.len().min(self.sample_rows)];
        let fields = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let observed = self.infer_column(
                    sampled
                        .iter()
                        .map(|row| row.get(idx).map_or("", String::as_str)),
                );
                SchemaField::new(name.clone(), observed.storage())
            })
            .collect();
        InferredSchema::new(fields)
    }

    /// Sample a delimited file and infer a type for every selected column,
    /// in selection order
    pub fn infer_file(
        &self,
        path: &Path,
        delimiter: &Delimiter,
        selection: &ColumnSelection,
    ) -> Result<InferredSchema> {
        let mut reader = open_csv(path, delimiter)?;
        let header = read_header(&mut reader)?;
        let projection = projection::project(selection, &header)?;

        let mut samples = Vec::with_capacity(self.sample_rows);
        for record in reader.records().take(self.sample_rows) {
            let record = record?;
            samples.push(
                projection
                    .source_indices()
                    .iter()
                    .map(|&idx| record.get(idx).unwrap_or_default().to_string())
                    .collect(),
            );
        }

        let schema = self.infer_from_samples(projection.columns(), &samples);
        tracing::debug!(
            "Inferred schema {} from {} sampled rows of {}",
            schema,
            samples.len(),
            path.display()
        );
        Ok(schema)
    }
}

/// Infer a schema from a delimited file with default settings
pub fn infer_schema(
    path: &Path,
    delimiter: &Delimiter,
    selection: &ColumnSelection,
) -> Result<InferredSchema> {
    SchemaInferrer::new().infer_file(path, delimiter, selection)
}
