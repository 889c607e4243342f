//! Database connector support via DuckDB
//!
//! The engine talks to the analytical database only through the
//! [`Connection`] trait. [`DuckDbConnection`] is the shipped implementation;
//! it owns an embedded DuckDB handle that is closed when dropped.

mod connection;
mod engine;
pub mod sql;

pub use connection::{ColumnInfo, Connection, SelectStatement};
pub use engine::DuckDbConnection;
