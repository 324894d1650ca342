//! In-Memory Price History
//!
//! For testing and demo purposes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::PriceHistory;
use crate::error::{MarketError, Result};
use crate::model::PriceBar;

/// Price history held in a map keyed by upper-case ticker
#[derive(Clone, Debug, Default)]
pub struct MemoryPriceHistory {
    bars: HashMap<String, Vec<PriceBar>>,
}

impl MemoryPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bars for a ticker, keeping them sorted by date
    #[must_use]
    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        let entry = self.bars.entry(ticker.to_uppercase()).or_default();
        entry.extend(bars);
        entry.sort_by_key(|bar| bar.date);
        self
    }
}

#[async_trait]
impl PriceHistory for MemoryPriceHistory {
    async fn range(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        if start > end {
            return Err(MarketError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let bars = self
            .bars
            .get(&ticker.trim().to_uppercase())
            .ok_or_else(|| MarketError::UnknownTicker(ticker.to_string()))?;

        Ok(bars
            .iter()
            .filter(|bar| bar.date >= start && bar.date <= end)
            .cloned()
            .collect())
    }

    async fn tickers(&self) -> Result<Vec<String>> {
        let mut tickers: Vec<String> = self.bars.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
