//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = sum(C[i-n+1..=i]) / n
//! Warmup: first (n-1) points are undefined.

use crate::domain::error::MacrossError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, check_window};
use crate::domain::price::PricePoint;

pub fn calculate_sma(prices: &[PricePoint], window: usize) -> Result<IndicatorSeries, MacrossError> {
    check_window(prices, window)?;

    let mut values = Vec::with_capacity(prices.len());

    for (i, point) in prices.iter().enumerate() {
        // Summed per window rather than as a running total so flat stretches
        // stay exactly flat.
        let value = if i + 1 >= window {
            let sum: f64 = prices[i + 1 - window..=i].iter().map(|p| p.close).sum();
            Some(sum / window as f64)
        } else {
            None
        };
        values.push(IndicatorPoint {
            date: point.date,
            value,
        });
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Sma(window),
        values,
    })
}
