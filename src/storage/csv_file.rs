//! CSV file operations

use crate::etl::{Extractor, Loader};

use eyre::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Read typed records from a CSV file with a header row
pub struct CsvReader<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> CsvReader<T> {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column headers of the file
    pub fn headers(&self) -> Result<Vec<String>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header: {}", self.path.display()))?;
        Ok(headers.iter().map(String::from).collect())
    }

    /// Read all records
    pub fn read(&self) -> Result<Vec<T>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        reader
            .deserialize()
            .enumerate()
            .map(|(i, row)| {
                row.with_context(|| {
                    format!("Failed to parse row {} of {}", i + 1, self.path.display())
                })
            })
            .collect()
    }
}

impl<T: DeserializeOwned + Send> Extractor for CsvReader<T> {
    type Item = T;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        self.read()
    }
}

/// Write typed records to a CSV file, replacing its content
///
/// The header row comes from the record's serde field names; no index
/// column is written. An empty batch writes only the headers given to
/// [`CsvWriter::with_headers`], if any.
pub struct CsvWriter<T> {
    path: PathBuf,
    headers: Option<Vec<String>>,
    _record: PhantomData<fn(T)>,
}

impl<T: Serialize> CsvWriter<T> {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            headers: None,
            _record: PhantomData,
        }
    }

    /// Header row to write when there are no records
    pub fn with_headers(mut self, headers: &[&str]) -> Self {
        self.headers = Some(headers.iter().map(|h| h.to_string()).collect());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write records, overwriting any existing file
    pub fn write(&self, items: &[T]) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to create CSV file: {}", self.path.display()))?;

        if let (true, Some(headers)) = (items.is_empty(), &self.headers) {
            writer
                .write_record(headers)
                .with_context(|| format!("Failed to write CSV header: {}", self.path.display()))?;
        }

        for item in items {
            writer
                .serialize(item)
                .with_context(|| format!("Failed to write CSV row: {}", self.path.display()))?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to write CSV file: {}", self.path.display()))?;

        Ok(())
    }
}

impl<T: Serialize + Send> Loader for CsvWriter<T> {
    type Item = T;

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        self.write(&items)?;
        log::info!("Data saved to {}", self.path.display());
        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Value")]
        value: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "alpha".to_string(),
                value: 1.25,
            },
            Row {
                name: "beta, with comma".to_string(),
                value: 40000.0,
            },
        ]
    }

    #[test]
    fn test_read_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rows.csv");

        CsvWriter::new(&path).write(&rows()).unwrap();

        let reader = CsvReader::<Row>::new(&path);
        assert_eq!(reader.headers().unwrap(), vec!["Name", "Value"]);
        assert_eq!(reader.read().unwrap(), rows());
    }

    #[test]
    fn test_write_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rows.csv");
        let writer = CsvWriter::new(&path);

        writer.write(&rows()).unwrap();
        writer.write(&rows()[..1]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Name,Value\nalpha,1.25\n");
    }

    #[test]
    fn test_empty_write_keeps_headers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rows.csv");

        CsvWriter::<Row>::new(&path)
            .with_headers(&["Name", "Value"])
            .write(&[])
            .unwrap();

        let reader = CsvReader::<Row>::new(&path);
        assert_eq!(reader.headers().unwrap(), vec!["Name", "Value"]);
        assert!(reader.read().unwrap().is_empty());
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("rows.csv");

        let err = CsvWriter::new(&path).write(&rows()).unwrap_err();
        assert!(err.to_string().contains("Failed to create CSV file"));
    }

    #[tokio::test]
    async fn test_loader_and_extractor() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rows.csv");

        let count = CsvWriter::new(&path).load(rows()).await.unwrap();
        assert_eq!(count, 2);

        let read = CsvReader::<Row>::new(&path).extract().await.unwrap();
        assert_eq!(read, rows());
    }
}
