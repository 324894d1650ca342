//! Quarterly Results Tool
//!
//! Retrieves a company's quarterly results release.

use std::sync::Arc;

use async_trait::async_trait;

use agent_core::{ParameterType, Result as CoreResult, Tool, ToolArgs, ToolDescriptor};

use crate::model::Quarter;
use crate::results::{Lookup, ResultsLibrary};

/// Longest release excerpt written to the debug log
const LOG_PREVIEW: usize = 500;

/// Tool for fetching a quarterly results release
pub struct QuarterlyResultsTool {
    library: Arc<ResultsLibrary>,
}

impl QuarterlyResultsTool {
    pub const NAME: &'static str = "get_quarterly_results";

    pub const fn new(library: Arc<ResultsLibrary>) -> Self {
        Self { library }
    }
}

#[async_trait]
impl Tool for QuarterlyResultsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, "Get a ticker's quarterly results release.")
            .required("ticker", ParameterType::String, "The ticker code of the company in lowercase")
            .required("year", ParameterType::String, "The year of the results in the format yyyy")
            .required(
                "quarter",
                ParameterType::String,
                "The quarter in the format q-n where n is the quarter number",
            )
    }

    async fn call(&self, args: &ToolArgs) -> CoreResult<String> {
        let ticker = args.require_str("ticker")?;
        let year = args.require_str("year")?;
        let quarter_raw = args.require_str("quarter")?;

        tracing::info!(ticker, year, quarter = quarter_raw, "Looking up quarterly results");

        let quarter = match Quarter::parse(quarter_raw) {
            Ok(quarter) => quarter,
            Err(e) => return Ok(e.to_string()),
        };

        let path = match self.library.find(ticker, year, quarter).await {
            Ok(Lookup::Found(path)) => path,
            Ok(Lookup::UnknownTicker) => {
                return Ok(format!("quarterly results for {ticker} are not available."));
            }
            Ok(Lookup::NotFound) => return Ok("quarterly results not found.".into()),
            Err(e) => return Ok(e.to_string()),
        };

        match self.library.read(&path).await {
            Ok(release) => {
                let preview: String = release.chars().take(LOG_PREVIEW).collect();
                tracing::debug!(ticker, %quarter, preview = %preview, "Quarterly results found");
                Ok(release)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read results file");
                Ok("failed to retrieve quarterly results.".into())
            }
        }
    }
}
