//! Backtest driver: one (ticker, strategy) run end to end, plus a
//! parallel batch over independent runs.
//!
//! Indicators warm up on the whole price history; signals, trades and the
//! equity curve are confined to the configured date window.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;

use super::error::MacrossError;
use super::metrics::Metrics;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{Position, TradeRecord};
use super::price::{DateWindow, PricePoint, validate_series, window_range};
use super::signal::{Signal, StrategyId};
use super::simulator::{Simulation, SimulationConfig, simulate};
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: f64,
}

impl BacktestConfig {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    pub fn validate(&self) -> Result<(), MacrossError> {
        if self.start_date > self.end_date {
            return Err(MacrossError::ConfigInvalid {
                section: "backtest".into(),
                key: "start_date".into(),
                reason: format!("{} is after end_date {}", self.start_date, self.end_date),
            });
        }
        SimulationConfig {
            initial_cash: self.initial_cash,
            allocation: 1.0,
        }
        .validate()
    }
}

/// One independent unit of work for `run_batch`.
#[derive(Debug, Clone)]
pub struct BacktestJob {
    pub ticker: String,
    pub prices: Vec<PricePoint>,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub ticker: String,
    pub strategy: StrategyId,
    pub signals: Vec<Signal>,
    pub ledger: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
    /// Total return of buying on the first window date and never selling.
    pub benchmark_return: f64,
    pub open_position: Option<Position>,
}

pub fn run_backtest(
    ticker: &str,
    prices: &[PricePoint],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestReport, MacrossError> {
    config.validate()?;
    strategy.validate()?;
    validate_series(prices)?;

    let window = config.window();
    let range = window_range(prices, &window);
    if range.is_empty() {
        return Err(MacrossError::NoData {
            ticker: ticker.to_string(),
        });
    }
    let in_window = &prices[range];

    tracing::info!(
        ticker,
        strategy = %strategy.id(),
        start = %window.start,
        end = %window.end,
        prices = in_window.len(),
        history = prices.len(),
        "backtest started"
    );

    let signals = strategy.generate_signals(prices, &window)?;
    let sim_config = SimulationConfig {
        initial_cash: config.initial_cash,
        allocation: strategy.allocation(),
    };
    let simulation = simulate(ticker, in_window, &signals, &sim_config)?;
    let metrics = Metrics::compute(&simulation.equity_curve, &simulation.ledger, config.initial_cash);
    let benchmark = buy_and_hold(ticker, in_window, &sim_config)?;
    let benchmark_return = benchmark.final_equity() / config.initial_cash - 1.0;

    tracing::info!(
        ticker,
        strategy = %strategy.id(),
        signals = signals.len(),
        trades = metrics.transaction_count,
        total_return = metrics.total_return,
        benchmark_return,
        "backtest finished"
    );

    Ok(BacktestReport {
        ticker: ticker.to_string(),
        strategy: strategy.id(),
        signals,
        ledger: simulation.ledger,
        equity_curve: simulation.equity_curve,
        metrics,
        benchmark_return,
        open_position: simulation.open_position,
    })
}

/// Buys on the first date of `prices` with the configured allocation and holds.
pub fn buy_and_hold(
    ticker: &str,
    prices: &[PricePoint],
    config: &SimulationConfig,
) -> Result<Simulation, MacrossError> {
    config.validate()?;
    validate_series(prices)?;

    let mut portfolio = Portfolio::new(config.initial_cash);
    let mut price_map = HashMap::with_capacity(1);
    if let Some(first) = prices.first() {
        portfolio.buy(ticker, first.date, first.close, config.allocation)?;
    }
    for point in prices {
        price_map.insert(ticker.to_string(), point.close);
        portfolio.record_equity(point.date, &price_map);
    }

    Ok(Simulation::from_portfolio(ticker, portfolio))
}

/// Runs every job in parallel. Results come back in job order; a failing
/// job does not affect the others.
pub fn run_batch(
    jobs: &[BacktestJob],
    config: &BacktestConfig,
) -> Vec<Result<BacktestReport, MacrossError>> {
    jobs.par_iter()
        .map(|job| {
            let result = run_backtest(&job.ticker, &job.prices, &job.strategy, config);
            if let Err(e) = &result {
                tracing::warn!(ticker = %job.ticker, error = %e, "backtest skipped");
            }
            result
        })
        .collect()
}
