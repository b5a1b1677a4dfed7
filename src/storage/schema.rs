//! Typed table schemas
//!
//! Records that can be written to a relational store describe their columns
//! through [`Tabular`]. The store loader builds `CREATE TABLE` statements and
//! row bindings from it, so the table schema always follows the record type.

/// SQL storage class of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }
}

/// Named, typed column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self { name, kind }
    }
}

/// A single typed value in a row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn kind(&self) -> ColumnType {
        match self {
            Self::Integer(_) => ColumnType::Integer,
            Self::Real(_) => ColumnType::Real,
            Self::Text(_) => ColumnType::Text,
        }
    }
}

/// A record with a fixed column layout
///
/// `cells()` must return one cell per column, in column order, each of the
/// column's declared type.
pub trait Tabular {
    /// Column layout shared by every record of this type
    fn columns() -> &'static [Column];

    /// Values of this record, in column order
    fn cells(&self) -> Vec<Cell>;

    /// Column headers, in column order
    fn headers() -> Vec<&'static str> {
        Self::columns().iter().map(|c| c.name).collect()
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
