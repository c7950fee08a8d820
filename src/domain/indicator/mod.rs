//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series aligned one-to-one with its input prices
//! - `MovingAverage`: Selector between simple and exponential averages

pub mod ema;
pub mod sma;
pub mod volatility;

pub use ema::calculate_ema;
pub use sma::calculate_sma;
pub use volatility::calculate_rolling_volatility;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::MacrossError;
use crate::domain::price::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    /// `None` while the indicator is still warming up.
    pub value: Option<f64>,
}

impl IndicatorPoint {
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Volatility(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|p| p.value)
    }

    /// Number of leading points without a value.
    pub fn warmup(&self) -> usize {
        self.values.iter().take_while(|p| p.value.is_none()).count()
    }

    /// Defined `(date, value)` pairs, warm-up points omitted.
    pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .filter_map(|p| p.value.map(|v| (p.date, v)))
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Volatility(period) => write!(f, "VOL({})", period),
        }
    }
}

/// Which moving average a strategy uses for its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovingAverage {
    #[default]
    Simple,
    Exponential,
}

impl MovingAverage {
    pub fn calculate(
        self,
        prices: &[PricePoint],
        window: usize,
    ) -> Result<IndicatorSeries, MacrossError> {
        match self {
            MovingAverage::Simple => calculate_sma(prices, window),
            MovingAverage::Exponential => calculate_ema(prices, window),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sma" | "simple" => Some(MovingAverage::Simple),
            "ema" | "exponential" => Some(MovingAverage::Exponential),
            _ => None,
        }
    }
}

/// Shared argument checks for the moving averages.
pub(crate) fn check_window(prices: &[PricePoint], window: usize) -> Result<(), MacrossError> {
    if window == 0 {
        return Err(MacrossError::InvalidWindow {
            window,
            reason: "window must be at least 1".into(),
        });
    }
    if prices.len() < window {
        return Err(MacrossError::InsufficientData {
            required: window,
            available: prices.len(),
        });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::make_prices;
    use super::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        assert_eq!(IndicatorType::Ema(12).to_string(), "EMA(12)");
        assert_eq!(IndicatorType::Volatility(20).to_string(), "VOL(20)");
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "fast");
        map.insert(IndicatorType::Ema(20), "smooth");
        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"fast"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn warmup_and_defined() {
        let series = calculate_sma(&make_prices(&[1.0, 2.0, 3.0, 4.0]), 3).unwrap();
        assert_eq!(series.warmup(), 2);
        let defined: Vec<f64> = series.defined().map(|(_, v)| v).collect();
        assert_eq!(defined, vec![2.0, 3.0]);
        assert_eq!(series.value_at(0), None);
        assert_eq!(series.value_at(9), None);
    }

    #[test]
    fn moving_average_parse() {
        assert_eq!(MovingAverage::parse("SMA"), Some(MovingAverage::Simple));
        assert_eq!(MovingAverage::parse(" ema "), Some(MovingAverage::Exponential));
        assert_eq!(MovingAverage::parse("wma"), None);
    }

    #[test]
    fn moving_average_dispatch() {
        let prices = make_prices(&[10.0, 20.0, 30.0]);
        let sma = MovingAverage::Simple.calculate(&prices, 2).unwrap();
        let ema = MovingAverage::Exponential.calculate(&prices, 2).unwrap();
        assert_eq!(sma.indicator_type, IndicatorType::Sma(2));
        assert_eq!(ema.indicator_type, IndicatorType::Ema(2));
    }
}
