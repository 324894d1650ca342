//! Error Types for Market Agents

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Failures of the market data stores.
///
/// Tools turn these into descriptive text for the engine rather than
/// propagating them; none of them is a protocol error.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("no price data for ticker {0}")]
    UnknownTicker(String),

    #[error("invalid date '{0}', expected yyyy-mm-dd")]
    InvalidDate(String),

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: String, end: String },

    #[error("unhandled quarter format: {0}")]
    InvalidQuarter(String),

    #[error("invalid year '{0}', expected yyyy")]
    InvalidYear(String),

    #[error("data directory {} is not configured or missing", .0.display())]
    MissingRoot(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
