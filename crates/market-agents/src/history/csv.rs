//! CSV Price History
//!
//! Reads one `<TICKER>.csv` per ticker from a directory of daily exports.
//! Each file has a header line and six comma-separated columns:
//! `index,date,open,high,low,close`. Prices may carry a `$` prefix and
//! dates may be `yyyy-mm-dd` or `mm/dd/yyyy`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::PriceHistory;
use crate::error::{MarketError, Result};
use crate::model::PriceBar;

const COLUMNS: usize = 6;

/// Price history backed by a directory of CSV files
#[derive(Clone, Debug)]
pub struct CsvPriceHistory {
    root: PathBuf,
}

impl CsvPriceHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from the `NASDAQ_DATA` environment variable
    pub fn from_env() -> Result<Self> {
        let root = std::env::var("NASDAQ_DATA").map_err(|_| MarketError::MissingRoot(PathBuf::from("$NASDAQ_DATA")))?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// CSV files in the root as (ticker, path)
    async fn files(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|_| MarketError::MissingRoot(self.root.clone()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path.clone()));
            }
        }
        Ok(files)
    }

    /// Ticker lookup is case-insensitive; file names keep their own case
    async fn find(&self, ticker: &str) -> Result<PathBuf> {
        self.files()
            .await?
            .into_iter()
            .find(|(stem, _)| stem.eq_ignore_ascii_case(ticker.trim()))
            .map(|(_, path)| path)
            .ok_or_else(|| MarketError::UnknownTicker(ticker.to_string()))
    }
}

#[async_trait]
impl PriceHistory for CsvPriceHistory {
    async fn range(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        if start > end {
            return Err(MarketError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let path = self.find(ticker).await?;
        let text = tokio::fs::read_to_string(&path).await?;

        let mut bars: Vec<PriceBar> = parse_bars(&text, &path)
            .into_iter()
            .filter(|bar| bar.date >= start && bar.date <= end)
            .collect();
        bars.sort_by_key(|bar| bar.date);

        tracing::debug!(ticker, rows = bars.len(), "Loaded price range");
        Ok(bars)
    }

    async fn tickers(&self) -> Result<Vec<String>> {
        let mut tickers: Vec<String> = self
            .files()
            .await?
            .into_iter()
            .map(|(stem, _)| stem.to_uppercase())
            .collect();
        tickers.sort();
        tickers.dedup();
        Ok(tickers)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Parse every well-formed data line; the header and short lines are skipped
fn parse_bars(text: &str, path: &Path) -> Vec<PriceBar> {
    text.lines()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, line)| {
            let bar = parse_line(line);
            if bar.is_none() && !line.trim().is_empty() {
                tracing::debug!(file = %path.display(), line = idx + 1, "Skipping malformed row");
            }
            bar
        })
        .collect()
}

fn parse_line(line: &str) -> Option<PriceBar> {
    let fields: Vec<&str> = line.trim_end_matches('\r').split(',').map(str::trim).collect();
    if fields.len() != COLUMNS {
        return None;
    }

    Some(PriceBar {
        date: parse_row_date(fields[1])?,
        open: parse_price(fields[2])?,
        high: parse_price(fields[3])?,
        low: parse_price(fields[4])?,
        close: parse_price(fields[5])?,
    })
}

fn parse_row_date(field: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(field, "%m/%d/%Y"))
        .ok()
}

fn parse_price(field: &str) -> Option<Decimal> {
    Decimal::from_str(field.trim_start_matches('$')).ok()
}
