//! Schema types

use crate::database::ColumnInfo;
use crate::types::StorageType;
use serde::{Deserialize, Serialize};

/// Type observed for a single sampled field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedType {
    /// Empty field; carries no type information
    Empty,
    /// Parses as `i64`
    Int64,
    /// Parses as `f64`
    Float64,
    /// Parses as a timestamp or date
    DateTime,
    /// Anything else
    String,
}

impl ObservedType {
    /// Classify one raw field
    pub fn of(text: &str, detect_datetime: bool) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            ObservedType::Empty
        } else if trimmed.parse::<i64>().is_ok() {
            ObservedType::Int64
        } else if trimmed.parse::<f64>().is_ok() {
            ObservedType::Float64
        } else if detect_datetime && crate::types::parse_datetime(trimmed).is_some() {
            ObservedType::DateTime
        } else {
            ObservedType::String
        }
    }

    /// Merge two observations, returning the more general type
    pub fn merge_with(self, other: ObservedType) -> ObservedType {
        match (self, other) {
            (a, b) if a == b => a,
            (ObservedType::Empty, other) | (other, ObservedType::Empty) => other,
            // Integer can be promoted to Float
            (ObservedType::Int64, ObservedType::Float64)
            | (ObservedType::Float64, ObservedType::Int64) => ObservedType::Float64,
            // Incompatible types - fall back to string
            _ => ObservedType::String,
        }
    }

    /// Storage type for a fully merged observation
    pub fn storage(self) -> StorageType {
        match self {
            ObservedType::Int64 => StorageType::Int64,
            ObservedType::Float64 => StorageType::Float64,
            ObservedType::DateTime => StorageType::DateTime,
            ObservedType::Empty | ObservedType::String => StorageType::String,
        }
    }
}

/// One column of an inferred schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Column name
    pub name: String,
    /// Storage type
    pub storage: StorageType,
}

impl SchemaField {
    /// Create a field
    pub fn new(name: impl Into<String>, storage: StorageType) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }
}

/// Ordered `(column, storage type)` pairs, in selection order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InferredSchema {
    fields: Vec<SchemaField>,
}

impl InferredSchema {
    /// Create a schema from its fields
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Every column typed as String
    pub fn all_strings(columns: &[String]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|c| SchemaField::new(c.clone(), StorageType::String))
                .collect(),
        )
    }

    /// Types of `columns` as declared by an existing table. Columns the
    /// table does not declare are typed as String.
    pub fn from_table(columns: &[String], described: &[ColumnInfo]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|column| {
                    let storage = described
                        .iter()
                        .find(|info| &info.name == column)
                        .map_or(StorageType::String, |info| {
                            StorageType::from_sql_type(&info.data_type)
                        });
                    SchemaField::new(column.clone(), storage)
                })
                .collect(),
        )
    }

    /// All fields
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Storage type of a column, if present
    pub fn storage_of(&self, column: &str) -> Option<StorageType> {
        self.fields
            .iter()
            .find(|f| f.name == column)
            .map(|f| f.storage)
    }

    /// Storage types in field order
    pub fn storage_types(&self) -> Vec<StorageType> {
        self.fields.iter().map(|f| f.storage).collect()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::fmt::Display for InferredSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{} {}", field.name, field.storage))
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}
