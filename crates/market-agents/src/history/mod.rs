//! Price History Stores
//!
//! Abstractions and implementations for daily price data.

mod csv;
mod memory;

pub use csv::CsvPriceHistory;
pub use memory::MemoryPriceHistory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::model::PriceBar;

/// Daily price store (Strategy pattern)
///
/// Implement this for each backing store: CSV exports, a database, a market API.
#[async_trait]
pub trait PriceHistory: Send + Sync {
    /// Bars for `ticker` with `start <= date <= end`, oldest first
    async fn range(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>>;

    /// Tickers with data, sorted
    async fn tickers(&self) -> Result<Vec<String>>;

    /// Store name
    fn name(&self) -> &str;
}
