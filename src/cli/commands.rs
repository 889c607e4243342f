//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Flatbridge CLI
#[derive(Parser, Debug)]
#[command(name = "flatbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// DuckDB database file (`:memory:` for a throwaway database)
    #[arg(short, long, global = true, default_value = "flatbridge.duckdb")]
    pub database: PathBuf,

    /// Engine configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Test the database connection
    Check,

    /// List tables in the database
    Tables {
        /// Only tables in this schema
        #[arg(long)]
        schema: Option<String>,
    },

    /// List the columns of a table or an uploaded file
    Columns {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the first rows of a table or an uploaded file
    Preview {
        #[command(flatten)]
        source: SourceArgs,

        /// Columns to show (comma-separated)
        #[arg(long)]
        columns: String,
    },

    /// Export a table to a delimited file in the download directory
    Export {
        /// Source table (`table` or `schema.table`)
        #[arg(long)]
        table: String,

        /// Columns to export, in output order (comma-separated)
        #[arg(long)]
        columns: String,

        /// Output file name base; a unique suffix is appended
        #[arg(short, long)]
        output: Option<String>,

        /// Field delimiter: comma, tab, semicolon, pipe, space or a literal
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Import an uploaded delimited file into a table
    Import {
        /// Source file name inside the upload directory
        #[arg(long)]
        file: String,

        /// Destination table, created if absent
        #[arg(long)]
        table: String,

        /// Columns to import (comma-separated, default: every header column)
        #[arg(long)]
        columns: Option<String>,

        /// Field delimiter: comma, tab, semicolon, pipe, space or a literal
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Copy a local delimited file into the upload directory
    Upload {
        /// File to copy
        #[arg(long)]
        path: PathBuf,

        /// Name to store it under (default: the file's own name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Copy an exported file out of the download directory
    Download {
        /// Export file name inside the download directory
        #[arg(long)]
        file: String,

        /// Destination path
        #[arg(long)]
        to: PathBuf,
    },
}

/// Either a table or an uploaded file
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Table (`table` or `schema.table`)
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub table: Option<String>,

    /// File name inside the upload directory
    #[arg(long)]
    pub file: Option<String>,

    /// Field delimiter for files
    #[arg(long)]
    pub delimiter: Option<String>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Human-readable output
    Pretty,
}
