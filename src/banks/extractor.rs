//! Largest-banks page extractor
//!
//! Fetches the source page and parses its market capitalization table.

use super::record::BankRecord;
use super::table::parse_market_cap_table;
use crate::client::PageClient;
use crate::etl::Extractor;

use eyre::{Context, Result};
use url::Url;

/// Extractor for the market capitalization table of a web page
///
/// # Example
/// ```no_run
/// use bank_etl::banks::MarketCapExtractor;
/// use bank_etl::client::PageClient;
/// use bank_etl::etl::Extractor;
/// use std::time::Duration;
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let client = PageClient::try_new(Duration::from_secs(30))?;
/// let url = Url::parse("https://en.wikipedia.org/wiki/List_of_largest_banks")?;
/// let banks = MarketCapExtractor::new(client, url).extract().await?;
/// # Ok(())
/// # }
/// ```
pub struct MarketCapExtractor {
    client: PageClient,
    url: Url,
}

impl MarketCapExtractor {
    pub fn new(client: PageClient, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Extractor for MarketCapExtractor {
    type Item = BankRecord;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let html = self.client.fetch_text(&self.url).await?;

        let banks = parse_market_cap_table(&html)
            .with_context(|| format!("Failed to parse market cap table from {}", self.url))?;

        log::info!("Extracted {} bank(s)", banks.len());
        Ok(banks)
    }
}
