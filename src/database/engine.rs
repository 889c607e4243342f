//! DuckDB-backed connection
//!
//! Wraps an embedded DuckDB database (file-backed or in-memory) behind the
//! [`Connection`] trait. Statements are prepared per call; inserts run one
//! transaction per batch.

use super::connection::{ColumnInfo, Connection, SelectStatement};
use super::sql;
use crate::error::{Error, Result};
use crate::types::{Row, RowBatch, TableName, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, ToSqlOutput, Value as DuckValue};
use duckdb::ToSql;
use std::path::Path;

/// Location string DuckDB understands as a private in-memory database
const IN_MEMORY: &str = ":memory:";

/// Days from 0001-01-01 (CE day 1) to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Database connection backed by DuckDB
pub struct DuckDbConnection {
    /// DuckDB connection
    conn: duckdb::Connection,
    /// Database file path or `:memory:` (for logging)
    location: String,
}

impl std::fmt::Debug for DuckDbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbConnection")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl DuckDbConnection {
    /// Open a database file, creating it if needed. `:memory:` opens a
    /// private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();
        if location == IN_MEMORY {
            return Self::open_in_memory();
        }

        let conn = duckdb::Connection::open(path).map_err(|e| {
            Error::connection(format!("Failed to open DuckDB database '{location}': {e}"))
        })?;

        tracing::debug!("Opened DuckDB database at {}", location);
        Ok(Self { conn, location })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| Error::connection(format!("Failed to create DuckDB connection: {e}")))?;

        Ok(Self {
            conn,
            location: IN_MEMORY.to_string(),
        })
    }

    /// Where this database lives
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Prepare and run every row of `batch` through one INSERT statement
    fn insert_rows(&self, insert_sql: &str, batch: &RowBatch) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(insert_sql)
            .map_err(|e| Error::database(e.to_string()))?;

        for row in batch.rows() {
            let params: Vec<&dyn ToSql> = row.iter().map(|v| v as &dyn ToSql).collect();
            stmt.execute(params.as_slice())
                .map_err(|e| Error::database(e.to_string()))?;
        }

        Ok(())
    }
}

impl Connection for DuckDbConnection {
    fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
            .map_err(|e| Error::connection(format!("Connection check failed: {e}")))?;
        Ok(())
    }

    fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>> {
        let collect = |query: &str, params: &[&dyn ToSql]| -> Result<Vec<String>> {
            let mut stmt = self
                .conn
                .prepare(query)
                .map_err(|e| Error::database(format!("Failed to prepare query: {e}")))?;

            let tables = stmt
                .query_map(params, |row| row.get(0))
                .map_err(|e| Error::database(format!("Failed to query tables: {e}")))?
                .collect::<std::result::Result<Vec<String>, _>>()
                .map_err(|e| Error::database(format!("Failed to read table names: {e}")))?;
            Ok(tables)
        };

        match schema.map(str::to_string) {
            Some(schema) => collect(
                "SELECT table_name FROM information_schema.tables
                 WHERE table_schema = ?
                 ORDER BY table_name",
                &[&schema],
            ),
            None => collect(
                "SELECT table_name FROM information_schema.tables
                 WHERE table_schema = current_schema()
                 ORDER BY table_name",
                &[],
            ),
        }
    }

    fn describe_table(&self, table: &TableName) -> Result<Vec<ColumnInfo>> {
        let read_columns = |query: &str, params: &[&dyn ToSql]| -> Result<Vec<ColumnInfo>> {
            let mut stmt = self
                .conn
                .prepare(query)
                .map_err(|e| Error::database(format!("Failed to prepare query: {e}")))?;

            let columns = stmt
                .query_map(params, |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                    })
                })
                .map_err(|e| Error::database(format!("Failed to describe '{table}': {e}")))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::database(format!("Failed to describe '{table}': {e}")))?;
            Ok(columns)
        };

        match &table.schema {
            Some(schema) => read_columns(
                "SELECT column_name, data_type FROM information_schema.columns
                 WHERE table_schema = ? AND table_name = ?
                 ORDER BY ordinal_position",
                &[schema, &table.name],
            ),
            None => read_columns(
                "SELECT column_name, data_type FROM information_schema.columns
                 WHERE table_schema = current_schema() AND table_name = ?
                 ORDER BY ordinal_position",
                &[&table.name],
            ),
        }
    }

    fn select(
        &self,
        statement: &SelectStatement,
        batch_size: usize,
        visit: &mut dyn FnMut(Vec<Row>) -> Result<()>,
    ) -> Result<()> {
        let query = statement.to_sql();
        let width = statement.columns.len();
        let batch_size = batch_size.max(1);

        tracing::debug!("Executing query: {}", query);

        let mut stmt = self
            .conn
            .prepare(&query)
            .map_err(|e| Error::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| Error::database(format!("Query failed: {e}")))?;

        let mut chunk: Vec<Row> = Vec::with_capacity(batch_size);
        while let Some(row) = rows
            .next()
            .map_err(|e| Error::database(format!("Failed to fetch row: {e}")))?
        {
            let mut record = Vec::with_capacity(width);
            for idx in 0..width {
                let value: DuckValue = row
                    .get(idx)
                    .map_err(|e| Error::database(format!("Failed to read column {idx}: {e}")))?;
                record.push(duckdb_value_to_value(value));
            }
            chunk.push(record);

            if chunk.len() == batch_size {
                visit(std::mem::replace(
                    &mut chunk,
                    Vec::with_capacity(batch_size),
                ))?;
            }
        }

        if !chunk.is_empty() {
            visit(chunk)?;
        }

        Ok(())
    }

    fn command(&self, sql: &str) -> Result<()> {
        tracing::debug!("Executing statement: {}", sql);
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::database(e.to_string()))
    }

    fn insert_batch(&self, table: &TableName, batch: &RowBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let insert_sql = sql::insert(table, batch.columns());
        tracing::debug!("Inserting {} rows: {}", batch.len(), insert_sql);

        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| Error::database(e.to_string()))?;

        match self.insert_rows(&insert_sql, batch) {
            Ok(()) => self
                .conn
                .execute_batch("COMMIT")
                .map_err(|e| Error::database(e.to_string())),
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!("Rollback after failed insert also failed: {}", rollback);
                }
                Err(e)
            }
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => DuckValue::Null,
            Value::String(s) => DuckValue::Text(s.clone()),
            Value::Int64(i) => DuckValue::BigInt(*i),
            Value::Float64(f) => DuckValue::Double(*f),
            Value::DateTime(dt) => {
                DuckValue::Timestamp(TimeUnit::Microsecond, dt.and_utc().timestamp_micros())
            }
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// Convert a DuckDB value into the engine's scalar model
fn duckdb_value_to_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::String(b.to_string()),
        DuckValue::TinyInt(i) => Value::Int64(i.into()),
        DuckValue::SmallInt(i) => Value::Int64(i.into()),
        DuckValue::Int(i) => Value::Int64(i.into()),
        DuckValue::BigInt(i) => Value::Int64(i),
        DuckValue::HugeInt(i) => {
            i64::try_from(i).map_or_else(|_| Value::String(i.to_string()), Value::Int64)
        }
        DuckValue::UTinyInt(i) => Value::Int64(i.into()),
        DuckValue::USmallInt(i) => Value::Int64(i.into()),
        DuckValue::UInt(i) => Value::Int64(i.into()),
        DuckValue::UBigInt(i) => {
            i64::try_from(i).map_or_else(|_| Value::String(i.to_string()), Value::Int64)
        }
        DuckValue::Float(f) => Value::Float64(f64::from(f)),
        DuckValue::Double(f) => Value::Float64(f),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(b) => Value::String(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b,
        )),
        DuckValue::Timestamp(unit, t) => {
            timestamp_to_datetime(unit, t).map_or(Value::Int64(t), Value::DateTime)
        }
        DuckValue::Date32(d) => d
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map_or(Value::Int64(d.into()), Value::DateTime),
        DuckValue::Time64(_, t) => {
            // Microseconds since midnight
            let secs = t / 1_000_000;
            let micros = t % 1_000_000;
            Value::String(format!(
                "{:02}:{:02}:{:02}.{:06}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                micros
            ))
        }
        other => debug_fallback(&other),
    }
}

/// Convert a timestamp in `unit` since the Unix epoch
fn timestamp_to_datetime(unit: TimeUnit, value: i64) -> Option<NaiveDateTime> {
    let (secs, nanos) = match unit {
        TimeUnit::Second => (value, 0),
        TimeUnit::Millisecond => (value.div_euclid(1_000), value.rem_euclid(1_000) * 1_000_000),
        TimeUnit::Microsecond => (
            value.div_euclid(1_000_000),
            value.rem_euclid(1_000_000) * 1_000,
        ),
        TimeUnit::Nanosecond => (
            value.div_euclid(1_000_000_000),
            value.rem_euclid(1_000_000_000),
        ),
    };
    DateTime::from_timestamp(secs, nanos as u32).map(|dt| dt.naive_utc())
}

/// Render values without a dedicated mapping. Decimals debug-print as
/// `Decimal(12.50)` and are recovered as floats.
fn debug_fallback(value: &DuckValue) -> Value {
    let text = format!("{value:?}");
    text.strip_prefix("Decimal(")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|inner| inner.parse::<f64>().ok())
        .map_or(Value::String(text.clone()), Value::Float64)
}
