//! Bank table records
//!
//! Column headers match the source table so the CSV and SQLite outputs keep
//! the original column names, followed by the three converted columns.

use crate::storage::{Cell, Column, ColumnType, Tabular};
use serde::{Deserialize, Serialize};

pub const RANK_COLUMN: &str = "Rank";
pub const NAME_COLUMN: &str = "Bank name";
pub const MARKET_CAP_COLUMN: &str = "Market cap (US$ billion)";
pub const GBP_COLUMN: &str = "MC_GBP_Billion";
pub const EUR_COLUMN: &str = "MC_EUR_Billion";
pub const INR_COLUMN: &str = "MC_INR_Billion";

/// A bank and its market capitalization in US$ billions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRecord {
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Bank name")]
    pub name: String,
    #[serde(rename = "Market cap (US$ billion)")]
    pub market_cap_usd: f64,
}

impl BankRecord {
    pub fn new(rank: u32, name: impl Into<String>, market_cap_usd: f64) -> Self {
        Self {
            rank,
            name: name.into(),
            market_cap_usd,
        }
    }
}

impl Tabular for BankRecord {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new(RANK_COLUMN, ColumnType::Integer),
            Column::new(NAME_COLUMN, ColumnType::Text),
            Column::new(MARKET_CAP_COLUMN, ColumnType::Real),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Integer(i64::from(self.rank)),
            Cell::Text(self.name.clone()),
            Cell::Real(self.market_cap_usd),
        ]
    }
}

/// A bank record with its market capitalization converted to GBP, EUR and INR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBankRecord {
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Bank name")]
    pub name: String,
    #[serde(rename = "Market cap (US$ billion)")]
    pub market_cap_usd: f64,
    #[serde(rename = "MC_GBP_Billion")]
    pub market_cap_gbp: f64,
    #[serde(rename = "MC_EUR_Billion")]
    pub market_cap_eur: f64,
    #[serde(rename = "MC_INR_Billion")]
    pub market_cap_inr: f64,
}

impl Tabular for EnrichedBankRecord {
    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new(RANK_COLUMN, ColumnType::Integer),
            Column::new(NAME_COLUMN, ColumnType::Text),
            Column::new(MARKET_CAP_COLUMN, ColumnType::Real),
            Column::new(GBP_COLUMN, ColumnType::Real),
            Column::new(EUR_COLUMN, ColumnType::Real),
            Column::new(INR_COLUMN, ColumnType::Real),
        ];
        COLUMNS
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Integer(i64::from(self.rank)),
            Cell::Text(self.name.clone()),
            Cell::Real(self.market_cap_usd),
            Cell::Real(self.market_cap_gbp),
            Cell::Real(self.market_cap_eur),
            Cell::Real(self.market_cap_inr),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enriched() -> EnrichedBankRecord {
        EnrichedBankRecord {
            rank: 1,
            name: "JPMorgan Chase".to_string(),
            market_cap_usd: 432.92,
            market_cap_gbp: 346.34,
            market_cap_eur: 402.62,
            market_cap_inr: 35910.71,
        }
    }

    #[test]
    fn test_cells_match_column_types() {
        let record = enriched();
        let cells = record.cells();
        let columns = EnrichedBankRecord::columns();
        assert_eq!(cells.len(), columns.len());
        for (cell, column) in cells.iter().zip(columns) {
            assert_eq!(cell.kind(), column.kind, "column {}", column.name);
        }

        let base = BankRecord::new(1, "JPMorgan Chase", 432.92);
        let base_cells = base.cells();
        assert_eq!(base_cells.len(), BankRecord::columns().len());
        assert_eq!(&cells[..3], &base_cells[..]);
    }

    #[test]
    fn test_enriched_extends_base_headers() {
        let base = BankRecord::headers();
        let enriched = EnrichedBankRecord::headers();
        assert_eq!(&enriched[..base.len()], &base[..]);
        assert_eq!(&enriched[base.len()..], &[GBP_COLUMN, EUR_COLUMN, INR_COLUMN]);
    }

    #[test]
    fn test_csv_headers_match_columns() {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(enriched()).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let header = data.lines().next().unwrap();
        assert_eq!(header, EnrichedBankRecord::headers().join(","));
    }
}
