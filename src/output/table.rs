//! Database table writer

use super::DestinationWriter;
use crate::database::{sql, Connection};
use crate::error::{Error, Result};
use crate::schema::InferredSchema;
use crate::types::{RowBatch, TableName};

/// What happened when the destination table was prepared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePreparation {
    /// The table was already there and was left alone
    Existing,
    /// The table was created from the inferred schema
    Created,
}

/// Inserts row batches into one table
pub struct TableWriter<'a> {
    connection: &'a dyn Connection,
    table: TableName,
    rows_written: u64,
}

impl std::fmt::Debug for TableWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableWriter")
            .field("table", &self.table)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl<'a> TableWriter<'a> {
    /// Create a writer for `table`
    pub fn new(connection: &'a dyn Connection, table: TableName) -> Self {
        Self {
            connection,
            table,
            rows_written: 0,
        }
    }

    /// Destination table
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create the table from `schema` unless it already exists.
    ///
    /// An existing table's shape is not compared with `schema`.
    pub fn prepare(&self, schema: &InferredSchema) -> Result<TablePreparation> {
        if self.connection.table_exists(&self.table)? {
            tracing::debug!("Table {} exists; skipping create", self.table);
            return Ok(TablePreparation::Existing);
        }

        self.connection
            .command(&sql::create_table(&self.table, schema))?;
        tracing::info!("Created table {} {}", self.table, schema);
        Ok(TablePreparation::Created)
    }
}

impl DestinationWriter for TableWriter<'_> {
    fn write(&mut self, batch: &RowBatch) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        self.connection
            .insert_batch(&self.table, batch)
            .map_err(|e| match e {
                Error::Database { message } => Error::insert_failure(self.table.to_string(), message),
                other => other,
            })?;

        self.rows_written += batch.len() as u64;
        Ok(batch.len())
    }

    fn finalize(&mut self) -> Result<()> {
        tracing::debug!(
            "Finished writing {} rows into {}",
            self.rows_written,
            self.table
        );
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.rows_written
    }

    fn destination(&self) -> String {
        self.table.to_string()
    }
}
