//! Exchange-rate input
//!
//! The rate file is a UTF-8 CSV with a header row and a single data row. It
//! must contain `GBP`, `EUR` and `INR` columns holding multipliers relative
//! to USD; other columns are ignored.
//!
//! Example:
//! ```text
//! GBP,EUR,INR
//! 0.8,0.93,82.95
//! ```

use eyre::{Context, Result, eyre};
use std::path::Path;

/// Target currency of a market cap conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Gbp,
    Eur,
    Inr,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Gbp, Currency::Eur, Currency::Inr];

    /// Column header in the rate file
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
            Self::Inr => "INR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// USD → GBP/EUR/INR multipliers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRates {
    pub gbp: f64,
    pub eur: f64,
    pub inr: f64,
}

impl ExchangeRates {
    /// Create rates, rejecting negative or non-finite values
    pub fn try_new(gbp: f64, eur: f64, inr: f64) -> Result<Self> {
        let rates = Self { gbp, eur, inr };
        for currency in Currency::ALL {
            let rate = rates.rate(currency);
            if !rate.is_finite() || rate < 0.0 {
                eyre::bail!("Invalid {} exchange rate: {}", currency, rate);
            }
        }
        Ok(rates)
    }

    pub fn rate(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Gbp => self.gbp,
            Currency::Eur => self.eur,
            Currency::Inr => self.inr,
        }
    }

    /// Read rates from a CSV file
    ///
    /// # Errors
    /// Returns an error if the file is missing or not UTF-8, has no data row,
    /// lacks one of the currency columns, or holds a non-numeric rate.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read exchange rate file: {}", path.display()))?;
        let content = String::from_utf8(bytes)
            .with_context(|| format!("Exchange rate file is not UTF-8: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid exchange rate file: {}", path.display()))
    }

    /// Parse rates from CSV text
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .with_context(|| "Failed to read exchange rate header")?
            .clone();

        let row = reader
            .records()
            .next()
            .ok_or_else(|| eyre!("Exchange rate table has no data row"))?
            .with_context(|| "Failed to read exchange rate row")?;

        let rate = |currency: Currency| -> Result<f64> {
            let index = headers
                .iter()
                .position(|h| h == currency.code())
                .ok_or_else(|| eyre!("Exchange rate column '{}' not found", currency))?;
            let raw = row
                .get(index)
                .ok_or_else(|| eyre!("Exchange rate row has no '{}' value", currency))?;
            raw.parse::<f64>()
                .with_context(|| format!("Invalid {} exchange rate: '{}'", currency, raw))
        };

        Self::try_new(
            rate(Currency::Gbp)?,
            rate(Currency::Eur)?,
            rate(Currency::Inr)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse() {
        let rates = ExchangeRates::parse("GBP,EUR,INR\n0.8,0.9,80.0\n").unwrap();
        assert_eq!(rates, ExchangeRates::try_new(0.8, 0.9, 80.0).unwrap());
    }

    #[test]
    fn test_parse_ignores_extra_columns_and_bom() {
        let rates =
            ExchangeRates::parse("\u{feff}USD, GBP ,EUR,INR\n1.0, 0.75 ,0.93,82.95\n").unwrap();
        assert_eq!(rates.gbp, 0.75);
        assert_eq!(rates.eur, 0.93);
        assert_eq!(rates.inr, 82.95);
    }

    #[test]
    fn test_uses_first_row_only() {
        let rates = ExchangeRates::parse("GBP,EUR,INR\n0.8,0.9,80\n1,1,1\n").unwrap();
        assert_eq!(rates.rate(Currency::Inr), 80.0);
    }

    #[test]
    fn test_missing_column() {
        let err = ExchangeRates::parse("GBP,EUR\n0.8,0.9\n").unwrap_err();
        assert!(err.to_string().contains("'INR' not found"));
    }

    #[test]
    fn test_empty_table() {
        let err = ExchangeRates::parse("GBP,EUR,INR\n").unwrap_err();
        assert!(err.to_string().contains("no data row"));
    }

    #[test]
    fn test_non_numeric_rate() {
        let err = ExchangeRates::parse("GBP,EUR,INR\n0.8,abc,80\n").unwrap_err();
        assert!(err.to_string().contains("Invalid EUR exchange rate"));
    }

    #[test]
    fn test_negative_rate_rejected() {
        assert!(ExchangeRates::try_new(-0.8, 0.9, 80.0).is_err());
        assert!(ExchangeRates::try_new(0.8, f64::NAN, 80.0).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = ExchangeRates::read(temp_dir.path().join("missing.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to read exchange rate file"));
    }

    #[test]
    fn test_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("exchange_rate.csv");
        std::fs::write(&path, "GBP,EUR,INR\n0.8,0.93,82.95\n").unwrap();

        let rates = ExchangeRates::read(&path).unwrap();
        assert_eq!(rates.eur, 0.93);
    }
}
