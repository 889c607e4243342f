//! SQL statement builders
//!
//! Only identifiers are ever spliced into generated statements, and every
//! identifier goes through [`quote_ident`]. Values travel as bound
//! parameters.

use crate::schema::InferredSchema;
use crate::types::TableName;

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name
pub fn quote_table(table: &TableName) -> String {
    match &table.schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&table.name)),
        None => quote_ident(&table.name),
    }
}

/// Quoted, comma-separated column list
pub fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <columns> FROM <table> [LIMIT n]`
pub fn select(table: &TableName, columns: &[String], limit: Option<usize>) -> String {
    let mut query = format!("SELECT {} FROM {}", column_list(columns), quote_table(table));
    if let Some(limit) = limit {
        query = format!("{query} LIMIT {limit}");
    }
    query
}

/// `INSERT INTO <table> (<columns>) VALUES (?, ...)`
pub fn insert(table: &TableName, columns: &[String]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_table(table),
        column_list(columns)
    )
}

/// `CREATE TABLE IF NOT EXISTS` with one column per inferred field.
///
/// The table gets no ordering or primary key.
pub fn create_table(table: &TableName, schema: &InferredSchema) -> String {
    let definitions = schema
        .fields()
        .iter()
        .map(|field| format!("{} {}", quote_ident(&field.name), field.storage.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({definitions})",
        quote_table(table)
    )
}
