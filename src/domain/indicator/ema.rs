//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) points are undefined.

use crate::domain::error::MacrossError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, check_window};
use crate::domain::price::PricePoint;

pub fn calculate_ema(prices: &[PricePoint], window: usize) -> Result<IndicatorSeries, MacrossError> {
    check_window(prices, window)?;

    let mut values = Vec::with_capacity(prices.len());
    let k = 2.0 / (window as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, point) in prices.iter().enumerate() {
        let value = if i < window - 1 {
            sum += point.close;
            None
        } else if i == window - 1 {
            sum += point.close;
            ema = sum / window as f64;
            Some(ema)
        } else {
            ema = point.close * k + ema * (1.0 - k);
            Some(ema)
        };

        values.push(IndicatorPoint {
            date: point.date,
            value,
        });
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Ema(window),
        values,
    })
}
