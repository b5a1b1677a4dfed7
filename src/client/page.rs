//! HTML page client
//!
//! Provides `PageClient` for fetching source pages over HTTP.

use eyre::{Context, Result, eyre};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Identifies the pipeline to the sites it scrapes
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (market capitalization ETL)"
);

/// HTTP client for fetching HTML documents.
///
/// # Example
/// ```no_run
/// use bank_etl::client::PageClient;
/// use std::time::Duration;
/// use url::Url;
///
/// # async fn example() -> eyre::Result<()> {
/// let client = PageClient::try_new(Duration::from_secs(30))?;
/// let url = Url::parse("https://example.com/")?;
/// let html = client.fetch_text(&url).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PageClient {
    client: Client,
    timeout: Duration,
}

impl PageClient {
    /// Create a new client with the given per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn try_new(timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, "text/html".parse()?);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .with_context(|| "Failed to build HTTP client")?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET a page and return its body as text.
    ///
    /// # Errors
    /// Returns an error on connection failure, timeout, or a non-success status
    pub async fn fetch_text(&self, url: &Url) -> Result<String> {
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request to {}: {}", url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            eyre::bail!("Failed to fetch {} ({})", url, status);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        log::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
