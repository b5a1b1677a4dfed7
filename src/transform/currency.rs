//! Currency conversion transformer
//!
//! Adds GBP, EUR and INR market cap columns to bank records.

use crate::banks::{BankRecord, Currency, EnrichedBankRecord, ExchangeRates};
use crate::etl::Transformer;
use eyre::Result;
use std::path::Path;

/// Round to `decimals` places, ties to even
///
/// The value is scaled, rounded to the nearest integer with ties going to
/// the even neighbour, and scaled back.
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Transformer that converts the USD market cap into three currencies
///
/// # Example
/// ```
/// use bank_etl::banks::{BankRecord, ExchangeRates};
/// use bank_etl::etl::Transformer;
/// use bank_etl::transform::CurrencyConverter;
///
/// let rates = ExchangeRates::try_new(0.8, 0.9, 80.0).unwrap();
/// let converter = CurrencyConverter::new(rates);
///
/// let output = converter
///     .transform(BankRecord::new(1, "Example Bank", 500.0))
///     .unwrap();
/// assert_eq!(output.market_cap_gbp, 400.0);
/// assert_eq!(output.market_cap_eur, 450.0);
/// assert_eq!(output.market_cap_inr, 40000.0);
/// ```
pub struct CurrencyConverter {
    rates: ExchangeRates,
}

impl CurrencyConverter {
    pub const DECIMALS: i32 = 2;

    pub fn new(rates: ExchangeRates) -> Self {
        Self { rates }
    }

    /// Create a converter from an exchange-rate CSV file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let rates = ExchangeRates::read(path)?;
        log::debug!(
            "Exchange rates: GBP={} EUR={} INR={}",
            rates.gbp,
            rates.eur,
            rates.inr
        );
        Ok(Self::new(rates))
    }

    pub fn rates(&self) -> &ExchangeRates {
        &self.rates
    }

    /// Convert a USD amount, rounded to two decimals
    pub fn convert(&self, usd: f64, currency: Currency) -> f64 {
        round_half_even(usd * self.rates.rate(currency), Self::DECIMALS)
    }
}

impl Transformer for CurrencyConverter {
    type Input = BankRecord;
    type Output = EnrichedBankRecord;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        if !input.market_cap_usd.is_finite() {
            eyre::bail!(
                "Market cap of '{}' is not a finite number: {}",
                input.name,
                input.market_cap_usd
            );
        }

        let usd = input.market_cap_usd;
        Ok(EnrichedBankRecord {
            market_cap_gbp: self.convert(usd, Currency::Gbp),
            market_cap_eur: self.convert(usd, Currency::Eur),
            market_cap_inr: self.convert(usd, Currency::Inr),
            rank: input.rank,
            name: input.name,
            market_cap_usd: usd,
        })
    }
}
