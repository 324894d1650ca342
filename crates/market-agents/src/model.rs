//! Domain Models
//!
//! Daily price bars and quarter identifiers.
//! Uses `rust_decimal` for all prices - never use f64 for money!

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};

/// One trading day for a ticker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// A close price on a given day
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedClose {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Aggregates over a range of bars, so the engine does not have to do arithmetic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub trading_days: usize,
    pub highest_close: DatedClose,
    pub lowest_close: DatedClose,
    pub first_open: Decimal,
    pub last_close: Decimal,

    /// (last close - first open) / first open, in percent, 2 dp
    pub change_percent: Decimal,
}

impl PriceSummary {
    /// Summarize bars sorted by date; `None` for an empty range
    pub fn from_bars(bars: &[PriceBar]) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;

        // Earliest date wins ties
        let highest = bars
            .iter()
            .fold(first, |best, bar| if bar.close > best.close { bar } else { best });
        let lowest = bars
            .iter()
            .fold(first, |best, bar| if bar.close < best.close { bar } else { best });

        // Zero when the open is zero or the ratio does not fit a Decimal
        let change_percent = last
            .close
            .checked_sub(first.open)
            .and_then(|delta| delta.checked_div(first.open))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Decimal::ZERO, |pct| {
                pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            });

        Some(Self {
            trading_days: bars.len(),
            highest_close: DatedClose {
                date: highest.date,
                close: highest.close,
            },
            lowest_close: DatedClose {
                date: lowest.date,
                close: lowest.close,
            },
            first_open: first.open,
            last_close: last.close,
            change_percent,
        })
    }
}

/// Calendar quarter of a results release
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Accepts `q-1` (the advertised form) as well as `q1`, `Q1` and `1`
    pub fn parse(input: &str) -> Result<Self> {
        let digits: String = input
            .trim()
            .trim_start_matches(['q', 'Q'])
            .trim_start_matches('-')
            .to_string();
        match digits.as_str() {
            "1" => Ok(Self::Q1),
            "2" => Ok(Self::Q2),
            "3" => Ok(Self::Q3),
            "4" => Ok(Self::Q4),
            _ => Err(MarketError::InvalidQuarter(input.to_string())),
        }
    }

    /// Months in which this quarter's release may be filed
    pub const fn months(self) -> [u32; 3] {
        match self {
            Self::Q1 => [1, 2, 3],
            Self::Q2 => [4, 5, 6],
            Self::Q3 => [7, 8, 9],
            Self::Q4 => [10, 11, 12],
        }
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        };
        write!(f, "q-{n}")
    }
}

/// Parse a `yyyy-mm-dd` date argument
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| MarketError::InvalidDate(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(day: u32, open: Decimal, close: Decimal) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
            open,
            high: close.max(open),
            low: close.min(open),
            close,
        }
    }

    #[test]
    fn test_summary() {
        let bars = vec![
            bar(1, dec!(100), dec!(110)),
            bar(4, dec!(110), dec!(95)),
            bar(5, dec!(95), dec!(110)),
            bar(6, dec!(110), dec!(105)),
        ];
        let summary = PriceSummary::from_bars(&bars).unwrap();

        assert_eq!(summary.trading_days, 4);
        assert_eq!(summary.highest_close.close, dec!(110));
        assert_eq!(summary.highest_close.date.to_string(), "2024-11-01");
        assert_eq!(summary.lowest_close.close, dec!(95));
        assert_eq!(summary.change_percent, dec!(5.00));
    }

    #[test]
    fn test_summary_change_out_of_range() {
        let bars = vec![bar(1, Decimal::new(1, 28), dec!(1)), bar(4, dec!(1), Decimal::MAX)];
        let summary = PriceSummary::from_bars(&bars).unwrap();
        assert_eq!(summary.change_percent, Decimal::ZERO);
        assert_eq!(summary.highest_close.close, Decimal::MAX);

        let bars = vec![bar(1, Decimal::ZERO, dec!(10))];
        assert_eq!(PriceSummary::from_bars(&bars).unwrap().change_percent, Decimal::ZERO);
    }

    #[test]
    fn test_summary_empty() {
        assert!(PriceSummary::from_bars(&[]).is_none());
    }

    #[test]
    fn test_quarter_parse() {
        assert_eq!(Quarter::parse("q-3").unwrap(), Quarter::Q3);
        assert_eq!(Quarter::parse("Q1").unwrap(), Quarter::Q1);
        assert_eq!(Quarter::parse("4").unwrap(), Quarter::Q4);
        assert!(Quarter::parse("q-5").is_err());
        assert_eq!(Quarter::Q2.months(), [4, 5, 6]);
        assert_eq!(Quarter::Q2.to_string(), "q-2");
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2024-11-30").is_ok());
        assert!(matches!(parse_date("30/11/2024"), Err(MarketError::InvalidDate(_))));
    }
}
