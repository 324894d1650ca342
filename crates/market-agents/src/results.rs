//! Quarterly Results Library
//!
//! Results releases are stored as
//! `<root>/<ticker>/<yyyy>-<mm>-quarterly-results.html`, where `mm` is the
//! month the release was filed in. A quarter matches the first of its three
//! months that has a file.

use std::path::{Path, PathBuf};

use crate::error::{MarketError, Result};
use crate::model::Quarter;

/// Outcome of a results lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// The ticker has no results directory at all
    UnknownTicker,
    /// The ticker exists but nothing was filed for that quarter
    NotFound,
    Found(PathBuf),
}

/// Directory of quarterly results releases
#[derive(Clone, Debug)]
pub struct ResultsLibrary {
    root: PathBuf,
}

impl ResultsLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from the `RESULTS_DATA` environment variable
    pub fn from_env() -> Result<Self> {
        std::env::var("RESULTS_DATA")
            .map(Self::new)
            .map_err(|_| MarketError::MissingRoot(PathBuf::from("$RESULTS_DATA")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate the release for `ticker` (lower-cased) in `year`/`quarter`
    pub async fn find(&self, ticker: &str, year: &str, quarter: Quarter) -> Result<Lookup> {
        let year = year.trim();
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(MarketError::InvalidYear(year.to_string()));
        }

        let dir = self.root.join(ticker.trim().to_lowercase());
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Lookup::UnknownTicker);
        }

        for month in quarter.months() {
            let path = dir.join(format!("{year}-{month:02}-quarterly-results.html"));
            if tokio::fs::try_exists(&path).await? {
                return Ok(Lookup::Found(path));
            }
        }

        Ok(Lookup::NotFound)
    }

    /// Read a release found by [`find`](Self::find)
    pub async fn read(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}
