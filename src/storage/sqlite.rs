//! SQLite table storage
//!
//! [`SqliteWriter`] replaces a whole table with a batch of records. The
//! connection is opened inside each load and closed when the load returns,
//! whether it succeeded or not; nothing holds a connection between runs.

use super::schema::{Cell, Tabular, quote_identifier};
use crate::etl::Loader;

use eyre::{Context, Result, eyre};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, params_from_iter};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Cell::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            Cell::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

/// Write records into a named SQLite table, replacing the table each time
pub struct SqliteWriter<T> {
    database: PathBuf,
    table: String,
    _record: PhantomData<fn(T)>,
}

impl<T: Tabular> SqliteWriter<T> {
    /// Create a writer for `table` in the database file at `database`
    ///
    /// # Errors
    /// Returns an error if the table name is empty
    pub fn try_new(database: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if table.trim().is_empty() {
            eyre::bail!("Table name must not be empty");
        }
        Ok(Self {
            database: database.as_ref().to_path_buf(),
            table,
            _record: PhantomData,
        })
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `CREATE TABLE` statement for the record schema
    pub fn create_statement(&self) -> String {
        let columns = T::columns()
            .iter()
            .map(|c| format!("{} {}", quote_identifier(c.name), c.kind.sql_name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", quote_identifier(&self.table), columns)
    }

    fn insert_statement(&self) -> String {
        let columns = T::columns();
        let names = columns
            .iter()
            .map(|c| quote_identifier(c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table),
            names,
            placeholders
        )
    }

    /// Replace the table with `items` in a single transaction
    pub fn write(&self, items: &[T]) -> Result<usize> {
        let mut conn = Connection::open(&self.database).with_context(|| {
            format!("Failed to open SQLite database: {}", self.database.display())
        })?;

        let tx = conn
            .transaction()
            .with_context(|| "Failed to start SQLite transaction")?;

        tx.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.table)),
            [],
        )
        .with_context(|| format!("Failed to drop table {}", self.table))?;

        tx.execute(&self.create_statement(), [])
            .with_context(|| format!("Failed to create table {}", self.table))?;

        {
            let mut stmt = tx
                .prepare(&self.insert_statement())
                .with_context(|| format!("Failed to prepare insert into {}", self.table))?;

            let width = T::columns().len();
            for (i, item) in items.iter().enumerate() {
                let cells = item.cells();
                if cells.len() != width {
                    eyre::bail!(
                        "Row {} has {} values but table {} has {} columns",
                        i + 1,
                        cells.len(),
                        self.table,
                        width
                    );
                }
                stmt.execute(params_from_iter(cells.iter()))
                    .with_context(|| format!("Failed to insert row {} into {}", i + 1, self.table))?;
            }
        }

        tx.commit()
            .with_context(|| format!("Failed to commit table {}", self.table))?;

        Ok(items.len())
    }
}

impl<T> Loader for SqliteWriter<T>
where
    T: Tabular + Send + 'static,
{
    type Item = T;

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        let writer = SqliteWriter::<T> {
            database: self.database.clone(),
            table: self.table.clone(),
            _record: PhantomData,
        };

        let count = tokio::task::spawn_blocking(move || writer.write(&items))
            .await
            .map_err(|e| eyre!("SQLite writer task failed: {}", e))??;

        log::info!(
            "Data loaded into table {} in {}",
            self.table,
            self.database.display()
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{Column, ColumnType};
    use tempfile::TempDir;

    struct Point {
        label: String,
        x: i64,
        y: f64,
    }

    impl Tabular for Point {
        fn columns() -> &'static [Column] {
            const COLUMNS: &[Column] = &[
                Column::new("Label name", ColumnType::Text),
                Column::new("X", ColumnType::Integer),
                Column::new("Y", ColumnType::Real),
            ];
            COLUMNS
        }

        fn cells(&self) -> Vec<Cell> {
            vec![
                Cell::Text(self.label.clone()),
                Cell::Integer(self.x),
                Cell::Real(self.y),
            ]
        }
    }

    fn points() -> Vec<Point> {
        vec![
            Point {
                label: "origin".to_string(),
                x: 0,
                y: 0.0,
            },
            Point {
                label: "far".to_string(),
                x: 10,
                y: 2.5,
            },
        ]
    }

    fn count_rows(db: &Path, table: &str) -> i64 {
        let conn = Connection::open(db).unwrap();
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_create_statement() {
        let writer = SqliteWriter::<Point>::try_new("unused.db", "Points").unwrap();
        assert_eq!(
            writer.create_statement(),
            "CREATE TABLE \"Points\" (\"Label name\" TEXT, \"X\" INTEGER, \"Y\" REAL)"
        );
    }

    #[test]
    fn test_empty_table_name_rejected() {
        assert!(SqliteWriter::<Point>::try_new("unused.db", "  ").is_err());
    }

    #[test]
    fn test_write_replaces_table() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("points.db");
        let writer = SqliteWriter::<Point>::try_new(&db, "Points").unwrap();

        assert_eq!(writer.write(&points()).unwrap(), 2);
        assert_eq!(writer.write(&points()).unwrap(), 2);

        assert_eq!(count_rows(&db, "Points"), 2);

        let conn = Connection::open(&db).unwrap();
        let (label, y): (String, f64) = conn
            .query_row(
                "SELECT \"Label name\", \"Y\" FROM \"Points\" WHERE \"X\" = 10",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(label, "far");
        assert_eq!(y, 2.5);
    }

    #[test]
    fn test_write_empty_batch_creates_empty_table() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("points.db");
        let writer = SqliteWriter::<Point>::try_new(&db, "Points").unwrap();

        writer.write(&points()).unwrap();
        assert_eq!(writer.write(&[]).unwrap(), 0);
        assert_eq!(count_rows(&db, "Points"), 0);
    }

    #[test]
    fn test_unopenable_database_fails() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("missing").join("points.db");
        let writer = SqliteWriter::<Point>::try_new(&db, "Points").unwrap();

        let err = writer.write(&points()).unwrap_err();
        assert!(err.to_string().contains("Failed to open SQLite database"));
    }

    #[tokio::test]
    async fn test_loader() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("points.db");
        let writer = SqliteWriter::<Point>::try_new(&db, "Points").unwrap();

        let count = writer.load(points()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(count_rows(&db, "Points"), 2);
    }
}
