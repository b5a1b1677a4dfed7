//! File system and database storage operations
//!
//! This module handles all sink and source I/O including:
//! - CSV file reading/writing
//! - SQLite table replacement
//! - The append-only progress log

mod csv_file;
mod progress_log;
pub mod schema;
mod sqlite;

pub use csv_file::{CsvReader, CsvWriter};
pub use progress_log::{ProgressLog, TIMESTAMP_FORMAT};
pub use schema::{Cell, Column, ColumnType, Tabular};
pub use sqlite::SqliteWriter;
