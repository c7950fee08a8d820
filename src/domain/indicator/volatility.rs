//! Rolling volatility of daily returns.
//!
//! r[i] = C[i] / C[i-1] - 1
//! VOL(n)[i] = sample stddev of r[i-n+1..=i] (n-1 denominator)
//! Warmup: first n points are undefined, since the first return lands on index 1.

use crate::domain::error::MacrossError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::PricePoint;

pub fn calculate_rolling_volatility(
    prices: &[PricePoint],
    window: usize,
) -> Result<IndicatorSeries, MacrossError> {
    if window < 2 {
        return Err(MacrossError::InvalidWindow {
            window,
            reason: "volatility needs at least 2 returns".into(),
        });
    }
    if prices.len() < window + 1 {
        return Err(MacrossError::InsufficientData {
            required: window + 1,
            available: prices.len(),
        });
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect();

    let mut values = Vec::with_capacity(prices.len());

    for (i, point) in prices.iter().enumerate() {
        let value = if i >= window {
            // returns[j] is the return landing on prices[j + 1]
            let slice = &returns[i - window..i];
            Some(sample_stddev(slice))
        } else {
            None
        };

        values.push(IndicatorPoint {
            date: point.date,
            value,
        });
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Volatility(window),
        values,
    })
}

fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
