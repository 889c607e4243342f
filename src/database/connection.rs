//! Connection trait
//!
//! The contract the ingestion core needs from an already-open,
//! authenticated database handle.

use super::sql;
use crate::error::Result;
use crate::types::{Row, RowBatch, TableName};
use serde::{Deserialize, Serialize};

/// One column as reported by the database catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Database type name (e.g. `BIGINT`, `VARCHAR`)
    pub data_type: String,
}

impl ColumnInfo {
    /// Create a column description
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A projected read of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    /// Table to read
    pub table: TableName,
    /// Columns to read, in output order
    pub columns: Vec<String>,
    /// Optional row limit
    pub limit: Option<usize>,
}

impl SelectStatement {
    /// Read every row of `columns` from `table`
    pub fn new(table: TableName, columns: Vec<String>) -> Self {
        Self {
            table,
            columns,
            limit: None,
        }
    }

    /// Cap the number of rows returned
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the statement with every identifier quoted
    pub fn to_sql(&self) -> String {
        sql::select(&self.table, &self.columns, self.limit)
    }
}

/// An open database handle.
///
/// Dropping the handle closes it. Implementations must report an
/// unreachable or unopenable database as
/// [`Error::Connection`](crate::error::Error::Connection).
pub trait Connection {
    /// Cheap liveness probe
    fn ping(&self) -> Result<()>;

    /// Tables visible to this handle, optionally restricted to one schema
    fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>>;

    /// Columns of `table` in declaration order; empty when the table does
    /// not exist
    fn describe_table(&self, table: &TableName) -> Result<Vec<ColumnInfo>>;

    /// Run `statement` once and hand its rows to `visit` in groups of at
    /// most `batch_size`, in result order
    fn select(
        &self,
        statement: &SelectStatement,
        batch_size: usize,
        visit: &mut dyn FnMut(Vec<Row>) -> Result<()>,
    ) -> Result<()>;

    /// Execute a statement that returns no rows
    fn command(&self, sql: &str) -> Result<()>;

    /// Insert all rows of `batch` into `table` as one unit
    fn insert_batch(&self, table: &TableName, batch: &RowBatch) -> Result<()>;

    /// Whether `table` exists
    fn table_exists(&self, table: &TableName) -> Result<bool> {
        Ok(!self.describe_table(table)?.is_empty())
    }
}
