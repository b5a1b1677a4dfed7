//! Market capitalization table parsing
//!
//! The source page carries a section heading with the id
//! `By_market_capitalization`; the first `wikitable` after it lists banks by
//! rank, name and market cap. Parsing is separate from fetching so it can run
//! against saved pages.

use super::record::{BankRecord, MARKET_CAP_COLUMN, NAME_COLUMN, RANK_COLUMN};

use eyre::{Context, Result, eyre};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Id of the heading that precedes the market capitalization table
pub const MARKET_CAP_ANCHOR: &str = "By_market_capitalization";

/// Parse the market capitalization table of the largest-banks page
pub fn parse_market_cap_table(html: &str) -> Result<Vec<BankRecord>> {
    parse_bank_table(html, MARKET_CAP_ANCHOR)
}

/// Parse the first `table.wikitable` that follows the element with `anchor_id`
///
/// # Errors
/// Returns an error if the anchor or table is missing, a required column is
/// absent from the header, or a cell cannot be converted.
pub fn parse_bank_table(html: &str, anchor_id: &str) -> Result<Vec<BankRecord>> {
    let document = Html::parse_document(html);
    let selector = selector(&format!("[id=\"{}\"], table.wikitable", anchor_id))?;

    // select() yields matches in document order
    let mut matches = document.select(&selector);
    matches
        .by_ref()
        .find(|el| el.value().id() == Some(anchor_id))
        .ok_or_else(|| eyre!("Section anchor '{}' not found in page", anchor_id))?;
    let table = matches
        .find(|el| el.value().name() == "table")
        .ok_or_else(|| eyre!("No wikitable found after section anchor '{}'", anchor_id))?;

    let citation = Regex::new(r"\[[^\[\]]*\]").with_context(|| "Invalid citation pattern")?;
    let rows = table_rows(table, &citation)?;

    let header = rows
        .iter()
        .find(|row| row.is_header)
        .ok_or_else(|| eyre!("Market cap table has no header row"))?;
    let layout = ColumnLayout::from_header(&header.cells)?;

    let records = rows
        .iter()
        .filter(|row| !row.is_header)
        .enumerate()
        .map(|(i, row)| layout.record(i + 1, &row.cells))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Parsed {} bank row(s) from market cap table", records.len());
    Ok(records)
}

/// Convert a market cap cell to a number
///
/// Cells carry a trailing unit or noise character (`"123.45B"`), which is
/// stripped before parsing. Only a non-digit is stripped: a cell that already
/// ends in a digit (`"432.92"`) is parsed whole, keeping its last digit.
pub fn parse_market_cap(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let number = match trimmed.chars().last() {
        Some(last) if !last.is_ascii_digit() => trimmed[..trimmed.len() - last.len_utf8()].trim(),
        Some(_) => trimmed,
        None => eyre::bail!("Market cap cell is empty"),
    };

    let value: f64 = number
        .parse()
        .with_context(|| format!("Invalid market cap value: '{}'", raw.trim()))?;

    if !value.is_finite() {
        eyre::bail!("Market cap value is not finite: '{}'", raw.trim());
    }
    Ok(value)
}

/// Convert a rank cell to a number
///
/// Tied ranks are marked with `=` (`"=9"`). An empty cell takes the row's
/// position in the table.
fn parse_rank(raw: &str, row: usize) -> Result<u32> {
    let rank = raw.trim().trim_matches('=').trim();
    if rank.is_empty() {
        log::debug!("Row {} has no rank, using its position", row);
        return u32::try_from(row).with_context(|| format!("Row {} is out of range", row));
    }
    rank.parse()
        .with_context(|| format!("Invalid rank value: '{}'", raw.trim()))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| eyre!("Invalid selector '{}': {:?}", css, e))
}

struct TableRow {
    is_header: bool,
    cells: Vec<String>,
}

fn table_rows(table: ElementRef<'_>, citation: &Regex) -> Result<Vec<TableRow>> {
    let row_selector = selector("tr")?;

    Ok(table
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                .collect();
            if cells.is_empty() {
                return None;
            }
            let is_header = cells.iter().all(|cell| cell.value().name() == "th");
            let cells = cells
                .into_iter()
                .map(|cell| clean_text(&cell.text().collect::<String>(), citation))
                .collect();
            Some(TableRow { is_header, cells })
        })
        .collect())
}

/// Drop citation markers like `[5]` and collapse whitespace
fn clean_text(text: &str, citation: &Regex) -> String {
    citation
        .replace_all(text, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Header comparison key: case and whitespace insensitive, since line breaks
/// inside header cells leave no text behind
fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Positions of the required columns within a row
struct ColumnLayout {
    rank: usize,
    name: usize,
    market_cap: usize,
}

impl ColumnLayout {
    fn from_header(header: &[String]) -> Result<Self> {
        let position = |column: &str| {
            header
                .iter()
                .position(|h| header_key(h) == header_key(column))
                .ok_or_else(|| {
                    eyre!(
                        "Column '{}' not found in table header (found: {})",
                        column,
                        header.join(", ")
                    )
                })
        };

        Ok(Self {
            rank: position(RANK_COLUMN)?,
            name: position(NAME_COLUMN)?,
            market_cap: position(MARKET_CAP_COLUMN)?,
        })
    }

    fn width(&self) -> usize {
        self.rank.max(self.name).max(self.market_cap) + 1
    }

    fn record(&self, row: usize, cells: &[String]) -> Result<BankRecord> {
        if cells.len() < self.width() {
            eyre::bail!(
                "Row {} has {} cell(s), expected at least {}",
                row,
                cells.len(),
                self.width()
            );
        }

        let rank = parse_rank(&cells[self.rank], row)
            .with_context(|| format!("Failed to parse {} in row {}", RANK_COLUMN, row))?;

        let name = cells[self.name].clone();
        if name.is_empty() {
            eyre::bail!("Row {} has an empty bank name", row);
        }

        let market_cap_usd = parse_market_cap(&cells[self.market_cap])
            .with_context(|| format!("Failed to parse market cap in row {}", row))?;

        Ok(BankRecord {
            rank,
            name,
            market_cap_usd,
        })
    }
}
