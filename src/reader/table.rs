//! Database table reader

use super::ReadOptions;
use crate::database::{Connection, SelectStatement};
use crate::error::{Error, Result};
use crate::projection::Projection;
use crate::types::{RowBatch, TableName};

/// A table behind an open connection
pub struct TableSource<'a> {
    connection: &'a dyn Connection,
    table: TableName,
}

impl std::fmt::Debug for TableSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSource")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<'a> TableSource<'a> {
    /// Create a table source
    pub fn new(connection: &'a dyn Connection, table: TableName) -> Self {
        Self { connection, table }
    }

    /// Table name
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Described column names; `NotFound` when the table does not exist
    pub fn columns(&self) -> Result<Vec<String>> {
        let described = self.connection.describe_table(&self.table)?;
        if described.is_empty() {
            return Err(Error::TableNotFound {
                table: self.table.to_string(),
            });
        }
        Ok(described.into_iter().map(|c| c.name).collect())
    }

    /// Issue one projected query and regroup its rows into batches
    pub fn for_each_batch(
        &self,
        projection: &Projection,
        options: &ReadOptions,
        visit: &mut dyn FnMut(RowBatch) -> Result<()>,
    ) -> Result<()> {
        let columns = projection.selection().column_list();
        let mut statement = SelectStatement::new(self.table.clone(), columns.to_vec());
        if let Some(limit) = options.limit {
            statement = statement.with_limit(limit);
        }

        self.connection
            .select(&statement, options.batch_size.max(1), &mut |rows| {
                visit(RowBatch::new(columns.clone(), rows))
            })
    }
}
