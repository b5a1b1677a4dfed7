//! Pipeline configuration
//!
//! Settings are fixed at deploy time. They come from an optional YAML file,
//! then environment variables override individual fields. Every field has a
//! default, so an empty file (or none at all) is a valid configuration.
//!
//! Example format:
//! ```yaml
//! url: https://en.wikipedia.org/wiki/List_of_largest_banks
//! csv_path: /opt/etl/largest_banks.csv
//! log_path: /opt/etl/etl_project_log.txt
//! exchange_rate_path: /opt/etl/exchange_rate.csv
//! store_identifier: /opt/etl/Banks.db
//! table_name: Largest_banks
//! retries: 1
//! ```

use crate::etl::RetryPolicy;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";

pub const ENV_URL: &str = "BANKETL_URL";
pub const ENV_CSV_PATH: &str = "BANKETL_CSV_PATH";
pub const ENV_LOG_PATH: &str = "BANKETL_LOG_PATH";
pub const ENV_EXCHANGE_RATE_PATH: &str = "BANKETL_EXCHANGE_RATE_PATH";
pub const ENV_STORE: &str = "BANKETL_STORE";
pub const ENV_TABLE: &str = "BANKETL_TABLE";
pub const ENV_RETRIES: &str = "BANKETL_RETRIES";

/// Everything a pipeline run needs to know
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the task graph, used in logs
    pub dag_id: String,
    /// Page holding the market capitalization table
    pub url: String,
    /// CSV output file, overwritten each run
    pub csv_path: PathBuf,
    /// Append-only progress log
    pub log_path: PathBuf,
    /// One-row CSV of GBP/EUR/INR rates
    pub exchange_rate_path: PathBuf,
    /// SQLite database file
    pub store_identifier: PathBuf,
    /// Table replaced in the store each run
    pub table_name: String,
    /// Extra attempts for a failed task
    pub retries: u32,
    pub retry_delay_secs: u64,
    pub request_timeout_secs: u64,
    /// Automatic schedule; `None` means the pipeline only runs when triggered
    pub schedule: Option<String>,
    pub tags: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dag_id: "bank_data_dag".to_string(),
            url: DEFAULT_URL.to_string(),
            csv_path: PathBuf::from("largest_banks.csv"),
            log_path: PathBuf::from("etl_project_log.txt"),
            exchange_rate_path: PathBuf::from("exchange_rate.csv"),
            store_identifier: PathBuf::from("Banks.db"),
            table_name: "Largest_banks".to_string(),
            retries: 1,
            retry_delay_secs: 0,
            request_timeout_secs: 30,
            schedule: None,
            tags: vec!["manual".to_string()],
        }
    }
}

impl PipelineConfig {
    /// Load configuration for a run
    ///
    /// Reads `path` if it exists (defaults otherwise), applies environment
    /// overrides and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            log::debug!("Loading configuration from {}", path.display());
            Self::read(path)?
        } else {
            log::debug!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read configuration: {}", path.as_ref().display())
        })?;

        // An empty file deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse configuration YAML: {}",
                path.as_ref().display()
            )
        })
    }

    /// Write configuration to a YAML file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .with_context(|| "Failed to serialize configuration to YAML")?;

        std::fs::write(path.as_ref(), yaml).with_context(|| {
            format!("Failed to write configuration: {}", path.as_ref().display())
        })?;

        Ok(())
    }

    /// Override fields from `BANKETL_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_URL) {
            self.url = url;
        }
        if let Ok(path) = std::env::var(ENV_CSV_PATH) {
            self.csv_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(ENV_LOG_PATH) {
            self.log_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(ENV_EXCHANGE_RATE_PATH) {
            self.exchange_rate_path = PathBuf::from(path);
        }
        if let Ok(store) = std::env::var(ENV_STORE) {
            self.store_identifier = PathBuf::from(store);
        }
        if let Ok(table) = std::env::var(ENV_TABLE) {
            self.table_name = table;
        }
        if let Ok(retries) = std::env::var(ENV_RETRIES) {
            self.retries = retries
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_RETRIES, retries))?;
        }
        Ok(())
    }

    /// Check the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        self.source_url()?;
        if self.table_name.trim().is_empty() {
            eyre::bail!("table_name must not be empty");
        }
        if self.request_timeout_secs == 0 {
            eyre::bail!("request_timeout_secs must be greater than zero");
        }
        for (name, path) in [
            ("csv_path", &self.csv_path),
            ("log_path", &self.log_path),
            ("exchange_rate_path", &self.exchange_rate_path),
            ("store_identifier", &self.store_identifier),
        ] {
            if path.as_os_str().is_empty() {
                eyre::bail!("{} must not be empty", name);
            }
        }
        Ok(())
    }

    /// Parsed source URL
    pub fn source_url(&self) -> Result<Url> {
        Url::parse(&self.url).with_context(|| format!("Invalid source url: {}", self.url))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// True when no automatic schedule is configured
    pub fn is_manual(&self) -> bool {
        self.schedule
            .as_deref()
            .is_none_or(|s| s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn clear_env() {
        unsafe {
            for var in [
                ENV_URL,
                ENV_CSV_PATH,
                ENV_LOG_PATH,
                ENV_EXCHANGE_RATE_PATH,
                ENV_STORE,
                ENV_TABLE,
                ENV_RETRIES,
            ] {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.dag_id, "bank_data_dag");
        assert_eq!(config.table_name, "Largest_banks");
        assert_eq!(config.store_identifier, PathBuf::from("Banks.db"));
        assert_eq!(config.retries, 1);
        assert!(config.is_manual());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("banketl.yml");
        std::fs::write(&path, "table_name: Top_banks\nretries: 3\n").unwrap();

        let config = PipelineConfig::read(&path).unwrap();
        assert_eq!(config.table_name, "Top_banks");
        assert_eq!(config.retries, 3);
        assert_eq!(config.csv_path, PathBuf::from("largest_banks.csv"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("banketl.yml");
        std::fs::write(&path, "\n").unwrap();

        assert_eq!(
            PipelineConfig::read(&path).unwrap(),
            PipelineConfig::default()
        );
    }

    #[test]
    fn test_write_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("banketl.yml");
        let config = PipelineConfig {
            retries: 2,
            schedule: Some("@daily".to_string()),
            ..PipelineConfig::default()
        };

        config.write(&path).unwrap();
        let read = PipelineConfig::read(&path).unwrap();
        assert_eq!(read, config);
        assert!(!read.is_manual());
    }

    #[test]
    fn test_invalid_url() {
        let config = PipelineConfig {
            url: "not a url".to_string(),
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid source url"));
    }

    #[test]
    fn test_empty_table_name() {
        let config = PipelineConfig {
            table_name: " ".to_string(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy() {
        let config = PipelineConfig {
            retries: 2,
            retry_delay_secs: 5,
            ..PipelineConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_TABLE, "From_env");
            std::env::set_var(ENV_RETRIES, "4");
            std::env::set_var(ENV_STORE, "/tmp/env.db");
        }

        let temp_dir = TempDir::new().unwrap();
        let config = PipelineConfig::load(temp_dir.path().join("missing.yml")).unwrap();
        assert_eq!(config.table_name, "From_env");
        assert_eq!(config.retries, 4);
        assert_eq!(config.store_identifier, PathBuf::from("/tmp/env.db"));

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_env_retries() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_RETRIES, "many");
        }

        let temp_dir = TempDir::new().unwrap();
        let err = PipelineConfig::load(temp_dir.path().join("missing.yml")).unwrap_err();
        assert!(err.to_string().contains(ENV_RETRIES));

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_file() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("banketl.yml");
        std::fs::write(&path, "url: http://localhost:8080/banks\ntable_name: File_table\n")
            .unwrap();
        unsafe {
            std::env::set_var(ENV_URL, "http://localhost:9090/banks");
        }

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.url, "http://localhost:9090/banks");
        assert_eq!(config.table_name, "File_table");

        clear_env();
    }
}
