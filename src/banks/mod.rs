//! Largest-banks ETL
//!
//! Domain types and tasks for the bank market capitalization pipeline:
//! - Scraping the market cap table from a web page
//! - Reading exchange rates
//! - The task graph and the executor that runs it

mod extractor;
mod rates;
mod record;
mod table;
mod tasks;

pub use extractor::MarketCapExtractor;
pub use rates::{Currency, ExchangeRates};
pub use record::{
    BankRecord, EUR_COLUMN, EnrichedBankRecord, GBP_COLUMN, INR_COLUMN, MARKET_CAP_COLUMN,
    NAME_COLUMN, RANK_COLUMN,
};
pub use table::{MARKET_CAP_ANCHOR, parse_bank_table, parse_market_cap, parse_market_cap_table};
pub use tasks::{BankPipeline, BankTask, bank_task_graph};
