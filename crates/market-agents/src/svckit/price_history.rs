//! Price History Tools
//!
//! Date-range queries over daily price data, plus a ticker listing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use agent_core::{ParameterType, Result as CoreResult, Tool, ToolArgs, ToolDescriptor};

use crate::history::PriceHistory;
use crate::model::{parse_date, PriceBar, PriceSummary};

/// Tool for querying a ticker's daily prices over a date range
pub struct PriceHistoryTool {
    history: Arc<dyn PriceHistory>,
}

impl PriceHistoryTool {
    pub const NAME: &'static str = "query_price_history";

    pub fn new(history: Arc<dyn PriceHistory>) -> Self {
        Self { history }
    }
}

#[derive(Serialize)]
struct RangeReport<'a> {
    ticker: String,
    start_date: &'a str,
    end_date: &'a str,
    summary: Option<PriceSummary>,
    rows: &'a [PriceBar],
}

#[async_trait]
impl Tool for PriceHistoryTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Query the daily nasdaq price history (open, high, low, close) of a ticker over a date range. \
             Returns the rows plus a summary with the highest and lowest close.",
        )
        .required("ticker", ParameterType::String, "The ticker code of the company for the query")
        .required("start_date", ParameterType::String, "The start date of the range in the format yyyy-mm-dd")
        .required("end_date", ParameterType::String, "The end date of the range in the format yyyy-mm-dd")
    }

    async fn call(&self, args: &ToolArgs) -> CoreResult<String> {
        let ticker = args.require_str("ticker")?;
        let start_raw = args.require_str("start_date")?;
        let end_raw = args.require_str("end_date")?;

        tracing::info!(ticker, start = start_raw, end = end_raw, "Querying price history");

        let (start, end) = match (parse_date(start_raw), parse_date(end_raw)) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(e), _) | (_, Err(e)) => return Ok(e.to_string()),
        };

        let bars = match self.history.range(ticker, start, end).await {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!(ticker, error = %e, "Price history query failed");
                return Ok(e.to_string());
            }
        };

        if bars.is_empty() {
            return Ok(format!(
                "no trading days for {} between {start_raw} and {end_raw}",
                ticker.to_uppercase()
            ));
        }

        let report = RangeReport {
            ticker: ticker.to_uppercase(),
            start_date: start_raw,
            end_date: end_raw,
            summary: PriceSummary::from_bars(&bars),
            rows: &bars,
        };

        Ok(serde_json::to_string(&report)?)
    }
}

/// Tool listing the tickers with price data
pub struct ListTickersTool {
    history: Arc<dyn PriceHistory>,
}

impl ListTickersTool {
    pub const NAME: &'static str = "list_tickers";

    pub fn new(history: Arc<dyn PriceHistory>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl Tool for ListTickersTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "List the ticker codes that have daily price data available",
        )
    }

    async fn call(&self, _args: &ToolArgs) -> CoreResult<String> {
        match self.history.tickers().await {
            Ok(tickers) if tickers.is_empty() => Ok("no tickers are available".into()),
            Ok(tickers) => Ok(format!("{} tickers: {}", tickers.len(), tickers.join(", "))),
            Err(e) => Ok(e.to_string()),
        }
    }
}
