//! Column projection
//!
//! Validates a requested column list against the columns a source exposes.
//! The requested order is authoritative for both reads and writes; nothing
//! is ever dropped or reordered.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// An ordered, non-empty, duplicate-free list of column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    columns: Arc<[String]>,
}

impl ColumnSelection {
    /// Build a selection, rejecting empty lists and duplicate names
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::invalid_request(
                "select at least one column to transfer",
            ));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(Error::invalid_request(format!(
                    "column '{column}' is selected more than once"
                )));
            }
        }

        Ok(Self {
            columns: columns.into(),
        })
    }

    /// Parse a comma-separated list (`id,name,amount`)
    pub fn parse(list: &str) -> Result<Self> {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty()),
        )
    }

    /// Column names in selection order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the column names
    pub fn column_list(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    /// Number of selected columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns (never true once constructed)
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A selection validated against a source, with each selected column's
/// position in the source's column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    selection: ColumnSelection,
    source_indices: Vec<usize>,
}

impl Projection {
    /// The validated selection, unchanged
    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    /// Source position of each selected column, in selection order
    pub fn source_indices(&self) -> &[usize] {
        &self.source_indices
    }

    /// Column names in selection order
    pub fn columns(&self) -> &[String] {
        self.selection.columns()
    }
}

/// Validate `selection` against `available`.
///
/// Fails with `MissingColumn` naming every requested column the source does
/// not expose.
pub fn project(selection: &ColumnSelection, available: &[String]) -> Result<Projection> {
    let mut source_indices = Vec::with_capacity(selection.len());
    let mut missing = Vec::new();

    for column in selection.columns() {
        match available.iter().position(|a| a == column) {
            Some(idx) => source_indices.push(idx),
            None => missing.push(column.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(Error::MissingColumn { columns: missing });
    }

    Ok(Projection {
        selection: selection.clone(),
        source_indices,
    })
}
