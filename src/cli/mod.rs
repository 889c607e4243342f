//! CLI module
//!
//! Command-line interface for moving data between DuckDB and flat files.
//!
//! # Commands
//!
//! - `check` - Test the database connection
//! - `tables` - List tables
//! - `columns` - List the columns of a table or uploaded file
//! - `preview` - Show the first rows of a source
//! - `export` - Table to delimited file
//! - `import` - Delimited file to table
//! - `upload` - Copy a local file into the upload directory
//! - `download` - Copy an exported file out of the download directory

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, SourceArgs};
pub use runner::Runner;
