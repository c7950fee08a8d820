#![allow(dead_code)]

use chrono::NaiveDate;
use macross::domain::backtest::BacktestConfig;
use macross::domain::error::MacrossError;
pub use macross::domain::price::PricePoint;
use macross::domain::strategy::{CrossoverParams, Strategy};
use macross::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, ticker: &str, prices: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), prices);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MacrossError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(MacrossError::Data {
                reason: reason.clone(),
            });
        }
        let prices = self.data.get(ticker).ok_or_else(|| MacrossError::NoData {
            ticker: ticker.to_string(),
        })?;
        Ok(prices
            .iter()
            .filter(|p| p.date >= start_date && p.date <= end_date)
            .copied()
            .collect())
    }

    fn list_tickers(&self) -> Result<Vec<String>, MacrossError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting at `start_date` (`YYYY-MM-DD`).
pub fn make_prices(start_date: &str, closes: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::new(start + chrono::Duration::days(i as i64), close))
        .collect()
}

/// A smooth oscillation, enough to make short/long averages cross repeatedly.
pub fn wave_prices(start_date: &str, count: usize, base: f64, amplitude: f64, period: f64) -> Vec<PricePoint> {
    let closes: Vec<f64> = (0..count)
        .map(|i| base + amplitude * (i as f64 * std::f64::consts::TAU / period).sin())
        .collect();
    make_prices(start_date, &closes)
}

pub fn sma_strategy(short_window: usize, long_window: usize) -> Strategy {
    Strategy::SmaCrossover(CrossoverParams {
        short_window,
        long_window,
        allocation: 1.0,
    })
}

pub fn config_covering(prices: &[PricePoint], initial_cash: f64) -> BacktestConfig {
    BacktestConfig {
        start_date: prices[0].date,
        end_date: prices[prices.len() - 1].date,
        initial_cash,
    }
}
