//! Transform implementations for bank records

mod currency;

pub use currency::{CurrencyConverter, round_half_even};
