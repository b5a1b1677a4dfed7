//! Append-only progress log
//!
//! Each entry is one line: `<timestamp> : <message>`, with the timestamp
//! formatted as `YYYY-Mon-DD-HH:MM:SS` in local time.

use chrono::{Local, NaiveDateTime};
use eyre::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// chrono pattern for progress log timestamps, e.g. `2024-Oct-08-14:03:59`
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

/// Appends timestamped status lines to a text file
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format a single log line (without the trailing newline)
    pub fn format_entry(timestamp: NaiveDateTime, message: &str) -> String {
        format!("{} : {}", timestamp.format(TIMESTAMP_FORMAT), message)
    }

    /// Append `message` stamped with the current local time
    ///
    /// Creates the parent directory if needed.
    pub fn append(&self, message: &str) -> Result<()> {
        self.append_at(Local::now().naive_local(), message)
    }

    /// Append `message` with an explicit timestamp
    pub fn append_at(&self, timestamp: NaiveDateTime, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open progress log: {}", self.path.display()))?;

        // Whole entry in one write; loaders append concurrently
        let line = format!("{}\n", Self::format_entry(timestamp, message));
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write progress log: {}", self.path.display()))?;

        Ok(())
    }
}
