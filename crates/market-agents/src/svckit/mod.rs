//! Service Kit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the market agents.

mod price_history;
mod quarterly_results;

pub use price_history::{ListTickersTool, PriceHistoryTool};
pub use quarterly_results::QuarterlyResultsTool;
