//! Bank ETL
//!
//! Scrapes the list of the largest banks by market capitalization, converts
//! the market caps into GBP, EUR and INR, and stores the result as a CSV file
//! and a SQLite table. The steps run as tasks of a small dependency graph.

pub mod banks;
pub mod cli;
pub mod client;
pub mod config;
pub mod etl;
pub mod storage;
pub mod transform;

// Re-exports for convenience
pub use banks::{BankPipeline, BankRecord, BankTask, EnrichedBankRecord, bank_task_graph};
pub use client::PageClient;
pub use config::PipelineConfig;
pub use etl::{DagRunner, Extractor, Loader, RunReport, TaskGraph, Transformer};
pub use storage::{CsvReader, CsvWriter, ProgressLog, SqliteWriter};
pub use transform::CurrencyConverter;
