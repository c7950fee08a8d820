//! Daily closing price representation.

use chrono::NaiveDate;

use super::error::MacrossError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        PricePoint { date, close }
    }
}

/// Inclusive date bounds for a backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    /// A window covering every date of `prices`.
    pub fn covering(prices: &[PricePoint]) -> Option<Self> {
        match (prices.first(), prices.last()) {
            (Some(first), Some(last)) => Some(DateWindow::new(first.date, last.date)),
            _ => None,
        }
    }
}

/// Checks that dates strictly increase and every close is finite and positive.
pub fn validate_series(prices: &[PricePoint]) -> Result<(), MacrossError> {
    for (i, point) in prices.iter().enumerate() {
        if !point.close.is_finite() || point.close <= 0.0 {
            return Err(MacrossError::InvalidPriceSeries {
                reason: format!("close {} on {} is not positive", point.close, point.date),
            });
        }
        if i > 0 && point.date <= prices[i - 1].date {
            return Err(MacrossError::InvalidPriceSeries {
                reason: format!(
                    "date {} does not follow {}",
                    point.date,
                    prices[i - 1].date
                ),
            });
        }
    }
    Ok(())
}

/// Index range of `prices` whose dates fall inside `window`.
pub fn window_range(prices: &[PricePoint], window: &DateWindow) -> std::ops::Range<usize> {
    let start = prices.partition_point(|p| p.date < window.start);
    let end = prices.partition_point(|p| p.date <= window.end);
    start..end.max(start)
}
