//! # market-agents
//!
//! Tools and instructions for the nasdaq market agents.
//!
//! ## Agent Graph
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐      ┌──────────────────┐
//! │   market-info    │─────▶│   data-combine   │─────▶│     database     │
//! │ (user requests)  │ peer │ (compound plans) │ peer │ (daily prices)   │
//! └──────────────────┘      └──────────────────┘      └──────────────────┘
//!                                    │ peer           ┌──────────────────┐
//!                                    └───────────────▶│ quarterly-results│
//!                                                     │ (release files)  │
//!                                                     └──────────────────┘
//! ```
//!
//! The two leaf agents own local tools defined here; the composing agents
//! only hold peer tools (see `agent-server`), so they get nothing but an
//! instruction from this crate.

pub mod error;
pub mod history;
pub mod model;
pub mod results;
pub mod svckit;

pub use error::{MarketError, Result};
pub use history::{CsvPriceHistory, MemoryPriceHistory, PriceHistory};
pub use model::{PriceBar, PriceSummary, Quarter};
pub use results::ResultsLibrary;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{ListTickersTool, PriceHistoryTool, QuarterlyResultsTool};
}

/// Instruction for the daily price agent
pub const DATABASE_AGENT_PROMPT: &str = r"You are an agent that answers questions about daily nasdaq stock market data.

For every ticker and date range in the request, use `query_price_history` to fetch the
open, high, low and close prices. Dates are always passed as yyyy-mm-dd. If you are not
sure a ticker is covered, use `list_tickers` first.

Prefer the figures in the returned summary over computing them yourself. Answer with the
data you retrieved and say plainly when a ticker or a range has no data.";

/// Instruction for the quarterly results agent
pub const QUARTERLY_RESULTS_AGENT_PROMPT: &str = r"You are an agent that retrieves and explains nasdaq companies' quarterly results releases.

Use `get_quarterly_results` with the ticker in lowercase, the year as yyyy and the quarter
as q-n, where n is the quarter number. Answer the request from the release text only, and
say so when a release is not available.";

/// Instruction for the agent combining price data and results releases
pub const DATA_COMBINE_AGENT_PROMPT: &str = r"You are an agent that processes and answers requests about nasdaq companies.

You can delegate to other agents that can:
* get the daily nasdaq stock market data for open, high, low and close
* get a company's quarterly results release with its financial data

Work out how to approach the request, act by calling the tools you need, then observe the
results and refine your understanding before answering. You may call any tool, including
the same tool, as many times as the request needs.

When you know the final answer, you must start the response with the words 'Final Answer:'";

/// Instruction for the user-facing market information agent
pub const MARKET_INFO_AGENT_PROMPT: &str = r"You are an agent that responds to natural language requests for stock market information.

You can delegate to an agent that takes compound requests and can get both the daily
nasdaq stock market data (open, high, low, close) and companies' quarterly results
releases.

Work out how to approach the request, act by calling the tools you need, then observe the
results and refine your understanding before answering. You may call any tool, including
the same tool, as many times as the request needs.

When you know the final answer, you must start the response with the words 'Final Answer:'";
