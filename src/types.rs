//! Common types used throughout Flatbridge
//!
//! This module contains the scalar model shared by the reader, the
//! inferencer and both writers, plus the batch container that moves rows
//! between them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Storage Types
// ============================================================================

/// Column storage type, as inferred from a file sample or mapped from a
/// described database column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageType {
    /// Free text (the fallback)
    #[default]
    String,
    /// 64-bit signed integer
    Int64,
    /// 64-bit float
    Float64,
    /// Timestamp without time zone
    DateTime,
}

impl StorageType {
    /// SQL type name used in generated DDL
    pub fn sql_type(self) -> &'static str {
        match self {
            StorageType::String => "VARCHAR",
            StorageType::Int64 => "BIGINT",
            StorageType::Float64 => "DOUBLE",
            StorageType::DateTime => "TIMESTAMP",
        }
    }

    /// Map a described database column type onto a storage type
    pub fn from_sql_type(data_type: &str) -> Self {
        let upper = data_type.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        match base {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" | "UTINYINT" | "USMALLINT"
            | "UINTEGER" | "INT8" | "INT16" | "INT32" | "INT64" | "LONG" => StorageType::Int64,
            "FLOAT" | "REAL" | "DOUBLE" | "DECIMAL" | "NUMERIC" | "FLOAT4" | "FLOAT8"
            | "FLOAT32" | "FLOAT64" => StorageType::Float64,
            "TIMESTAMP" | "DATETIME" | "DATE" | "TIMESTAMP_S" | "TIMESTAMP_MS"
            | "TIMESTAMP_NS" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => StorageType::DateTime,
            _ => StorageType::String,
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::String => write!(f, "String"),
            StorageType::Int64 => write!(f, "Int64"),
            StorageType::Float64 => write!(f, "Float64"),
            StorageType::DateTime => write!(f, "DateTime"),
        }
    }
}

// ============================================================================
// Scalar Values
// ============================================================================

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value (empty field or SQL NULL)
    Null,
    /// Text
    String(String),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit float
    Float64(f64),
    /// Timestamp without time zone
    DateTime(NaiveDateTime),
}

/// Output format for timestamps written to files
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

static DATETIME_SHAPE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([ T]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?)?$").ok()
});

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerce a raw text field to the given storage type.
    ///
    /// Empty text is always `Null`; whitespace-only text is `Null` for every
    /// type but `String`, matching how inference treats it. Returns `None`
    /// when the text is not a valid literal of the requested type.
    pub fn parse_as(text: &str, storage: StorageType) -> Option<Value> {
        if text.is_empty() {
            return Some(Value::Null);
        }
        if storage == StorageType::String {
            return Some(Value::String(text.to_string()));
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Some(Value::Null);
        }
        match storage {
            StorageType::String => Some(Value::String(text.to_string())),
            StorageType::Int64 => trimmed.parse::<i64>().ok().map(Value::Int64),
            StorageType::Float64 => trimmed.parse::<f64>().ok().map(Value::Float64),
            StorageType::DateTime => parse_datetime(trimmed).map(Value::DateTime),
        }
    }

    /// Render this value as a delimited-file field
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Int64(i) => i.to_string(),
            Value::Float64(f) => f.to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.to_field()),
        }
    }
}

/// Parse the timestamp shapes accepted in flat files
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if !DATETIME_SHAPE
        .as_ref()
        .is_some_and(|re| re.is_match(text))
    {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ============================================================================
// Rows and Batches
// ============================================================================

/// One record; positions follow the batch's column list
pub type Row = Vec<Value>;

/// A bounded group of records sharing one ordered column list
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl RowBatch {
    /// Create a batch from its column list and rows
    pub fn new(columns: Arc<[String]>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Create an empty batch with room for `capacity` rows
    pub fn with_capacity(columns: Arc<[String]>, capacity: usize) -> Self {
        Self {
            columns,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Column names, in selection order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the column list
    pub fn column_list(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    /// All rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Append a row
    pub fn push(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the batch has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a field by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Consume the batch, returning its rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

// ============================================================================
// Table Names
// ============================================================================

/// A possibly schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    /// Schema (or attached database) qualifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table name
    pub name: String,
}

impl TableName {
    /// Unqualified table name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Whether the name or a given schema is empty or only whitespace
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            || self.schema.as_deref().is_some_and(|s| s.trim().is_empty())
    }

    /// Schema-qualified table name
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse `schema.table` or `table`
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((schema, name)) if !schema.is_empty() && !name.is_empty() => {
                Self::qualified(schema, name)
            }
            _ => Self::new(text),
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("12", StorageType::Int64, Value::Int64(12))]
    #[test_case("-7", StorageType::Int64, Value::Int64(-7))]
    #[test_case("10.5", StorageType::Float64, Value::Float64(10.5))]
    #[test_case("3", StorageType::Float64, Value::Float64(3.0))]
    #[test_case("Alice", StorageType::String, Value::String("Alice".into()))]
    #[test_case("", StorageType::Int64, Value::Null)]
    #[test_case("", StorageType::String, Value::Null)]
    #[test_case("  ", StorageType::Int64, Value::Null)]
    #[test_case("\t", StorageType::Float64, Value::Null)]
    #[test_case(" ", StorageType::DateTime, Value::Null)]
    #[test_case(" ", StorageType::String, Value::String(" ".into()))]
    fn test_parse_as(text: &str, storage: StorageType, expected: Value) {
        assert_eq!(Value::parse_as(text, storage), Some(expected));
    }

    #[test]
    fn test_parse_as_rejects() {
        assert_eq!(Value::parse_as("abc", StorageType::Int64), None);
        assert_eq!(Value::parse_as("10.5", StorageType::Int64), None);
        assert_eq!(Value::parse_as("yesterday", StorageType::DateTime), None);
    }

    #[test]
    fn test_parse_datetime_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2024-01-15T12:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime("15/01/2024"), None);
    }

    #[test]
    fn test_to_field() {
        assert_eq!(Value::Null.to_field(), "");
        assert_eq!(Value::Int64(5).to_field(), "5");
        assert_eq!(Value::Float64(10.5).to_field(), "10.5");
        let dt = parse_datetime("2024-01-15 10:30:00").unwrap();
        assert_eq!(Value::DateTime(dt).to_field(), "2024-01-15 10:30:00");
        let dt = parse_datetime("2024-01-15 10:30:00.250").unwrap();
        assert_eq!(Value::DateTime(dt).to_field(), "2024-01-15 10:30:00.250");
    }

    #[test_case("BIGINT", StorageType::Int64)]
    #[test_case("INTEGER", StorageType::Int64)]
    #[test_case("DECIMAL(18,3)", StorageType::Float64)]
    #[test_case("double", StorageType::Float64)]
    #[test_case("TIMESTAMP", StorageType::DateTime)]
    #[test_case("DATE", StorageType::DateTime)]
    #[test_case("VARCHAR", StorageType::String)]
    #[test_case("BOOLEAN", StorageType::String)]
    fn test_from_sql_type(data_type: &str, expected: StorageType) {
        assert_eq!(StorageType::from_sql_type(data_type), expected);
    }

    #[test]
    fn test_batch_lookup() {
        let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
        let mut batch = RowBatch::with_capacity(columns, 2);
        batch.push(vec![Value::Int64(1), Value::String("Alice".into())]);
        batch.push(vec![Value::Int64(2), Value::Null]);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.get(0, "name"), Some(&Value::String("Alice".into())));
        assert_eq!(batch.get(1, "name"), Some(&Value::Null));
        assert_eq!(batch.get(0, "missing"), None);
    }

    #[test]
    fn test_table_name_parse() {
        assert_eq!(TableName::parse("events"), TableName::new("events"));
        assert_eq!(
            TableName::parse("analytics.events"),
            TableName::qualified("analytics", "events")
        );
        assert_eq!(
            TableName::qualified("analytics", "events").to_string(),
            "analytics.events"
        );
    }

    #[test]
    fn test_table_name_is_blank() {
        assert!(TableName::new("").is_blank());
        assert!(TableName::new("   ").is_blank());
        assert!(TableName::qualified("", "events").is_blank());
        assert!(!TableName::new("events").is_blank());
        assert!(!TableName::qualified("analytics", "events").is_blank());
    }
}
