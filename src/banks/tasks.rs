//! Bank pipeline tasks
//!
//! The pipeline is five tasks:
//!
//! ```text
//! log_progress → extract_data → transform_data ─┬→ load_to_csv
//!                                               └→ load_to_db
//! ```
//!
//! [`bank_task_graph`] describes the dependencies; [`BankPipeline`] runs the
//! individual tasks and carries the tables between them for a single run.

use super::extractor::MarketCapExtractor;
use super::record::{BankRecord, EnrichedBankRecord};
use crate::client::PageClient;
use crate::config::PipelineConfig;
use crate::etl::{Extractor, Loader, TaskExecutor, TaskGraph, Transformer};
use crate::storage::{CsvWriter, ProgressLog, SqliteWriter, Tabular};
use crate::transform::CurrencyConverter;

use eyre::{Result, eyre};
use std::str::FromStr;
use tokio::sync::RwLock;

/// A node of the bank pipeline graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BankTask {
    LogProgress,
    ExtractData,
    TransformData,
    LoadToCsv,
    LoadToDb,
}

impl BankTask {
    pub const ALL: [BankTask; 5] = [
        BankTask::LogProgress,
        BankTask::ExtractData,
        BankTask::TransformData,
        BankTask::LoadToCsv,
        BankTask::LoadToDb,
    ];

    /// Task id used in the graph
    pub fn id(&self) -> &'static str {
        match self {
            Self::LogProgress => "log_progress",
            Self::ExtractData => "extract_data",
            Self::TransformData => "transform_data",
            Self::LoadToCsv => "load_to_csv",
            Self::LoadToDb => "load_to_db",
        }
    }
}

impl std::fmt::Display for BankTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for BankTask {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|task| task.id() == s)
            .ok_or_else(|| eyre!("Unknown bank pipeline task: {}", s))
    }
}

/// Dependency graph of the bank pipeline
pub fn bank_task_graph() -> TaskGraph {
    let mut graph = TaskGraph::new();
    for task in BankTask::ALL {
        graph.add_node(task.id());
    }
    graph.add_edge(BankTask::LogProgress.id(), BankTask::ExtractData.id());
    graph.add_edge(BankTask::ExtractData.id(), BankTask::TransformData.id());
    graph.fan_out(
        BankTask::TransformData.id(),
        &[BankTask::LoadToCsv.id(), BankTask::LoadToDb.id()],
    );
    graph
}

/// Runs bank pipeline tasks for one pipeline invocation
///
/// Tables produced by one task are kept here for the tasks downstream of it.
/// Create a new `BankPipeline` for every run.
pub struct BankPipeline<E> {
    config: PipelineConfig,
    extractor: E,
    progress: ProgressLog,
    extracted: RwLock<Option<Vec<BankRecord>>>,
    enriched: RwLock<Option<Vec<EnrichedBankRecord>>>,
}

impl BankPipeline<MarketCapExtractor> {
    /// Build a pipeline that scrapes the configured URL
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let client = PageClient::try_new(config.request_timeout())?;
        let extractor = MarketCapExtractor::new(client, config.source_url()?);
        Ok(Self::new(config, extractor))
    }
}

impl<E> BankPipeline<E>
where
    E: Extractor<Item = BankRecord>,
{
    pub fn new(config: PipelineConfig, extractor: E) -> Self {
        let progress = ProgressLog::new(&config.log_path);
        Self {
            config,
            extractor,
            progress,
            extracted: RwLock::new(None),
            enriched: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one task
    pub async fn run_task(&self, task: BankTask) -> Result<()> {
        match task {
            BankTask::LogProgress => self.log_started(),
            BankTask::ExtractData => self.extract().await.map(|_| ()),
            BankTask::TransformData => self.transform().await.map(|_| ()),
            BankTask::LoadToCsv => self.load_csv().await.map(|_| ()),
            BankTask::LoadToDb => self.load_db().await.map(|_| ()),
        }
    }

    /// Mark the start of a run in the progress log
    pub fn log_started(&self) -> Result<()> {
        self.progress.append("ETL process started")
    }

    /// Scrape the bank table
    pub async fn extract(&self) -> Result<usize> {
        let banks = self.extractor.extract().await?;
        if banks.is_empty() {
            log::warn!("Market cap table has no rows");
        }

        let count = banks.len();
        *self.extracted.write().await = Some(banks);

        self.progress.append("Data extraction complete")?;
        Ok(count)
    }

    /// Add the converted market cap columns
    pub async fn transform(&self) -> Result<usize> {
        let banks = self.extracted().await.ok_or_else(|| {
            eyre!("No extracted table; {} has not run", BankTask::ExtractData)
        })?;

        let converter = CurrencyConverter::from_path(&self.config.exchange_rate_path)?;
        let enriched = converter.transform_many(banks)?;
        log::info!("✓ Transformed {} bank(s)", enriched.len());

        let count = enriched.len();
        *self.enriched.write().await = Some(enriched);

        self.progress.append("Data transformation complete")?;
        Ok(count)
    }

    /// Write the enriched table to the CSV file
    pub async fn load_csv(&self) -> Result<usize> {
        let rows = self.enriched_copy().await?;
        let count = CsvWriter::new(&self.config.csv_path)
            .with_headers(&EnrichedBankRecord::headers())
            .load(rows)
            .await?;
        self.progress.append("Data saved to CSV file")?;
        Ok(count)
    }

    /// Replace the store table with the enriched table
    pub async fn load_db(&self) -> Result<usize> {
        let rows = self.enriched_copy().await?;
        let writer =
            SqliteWriter::try_new(&self.config.store_identifier, &self.config.table_name)?;
        let count = writer.load(rows).await?;
        self.progress.append("Data loaded to database table")?;
        Ok(count)
    }

    /// The extracted table of this run, if extraction has finished
    pub async fn extracted(&self) -> Option<Vec<BankRecord>> {
        self.extracted.read().await.clone()
    }

    /// The enriched table of this run, if transformation has finished
    pub async fn enriched(&self) -> Option<Vec<EnrichedBankRecord>> {
        self.enriched.read().await.clone()
    }

    /// Each loader gets its own copy of the enriched table
    async fn enriched_copy(&self) -> Result<Vec<EnrichedBankRecord>> {
        self.enriched().await.ok_or_else(|| {
            eyre!("No enriched table; {} has not run", BankTask::TransformData)
        })
    }
}

impl<E> TaskExecutor for BankPipeline<E>
where
    E: Extractor<Item = BankRecord> + 'static,
{
    async fn execute(&self, task_id: &str) -> Result<()> {
        let task: BankTask = task_id.parse()?;
        self.run_task(task).await
    }
}
