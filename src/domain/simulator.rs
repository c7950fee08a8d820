//! Replays signals against a price series for one ticker.
//!
//! Trades execute at the close of the first price date on or after the
//! signal date. Every price date appends one point to the equity curve,
//! whether or not a trade happened.

use std::collections::HashMap;

use super::error::MacrossError;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{Position, TradeRecord};
use super::price::{PricePoint, validate_series};
use super::signal::{Signal, SignalKind};
use super::strategy::validate_allocation;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    /// Fraction of available cash spent on each BUY.
    pub allocation: f64,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), MacrossError> {
        validate_allocation(self.allocation)?;
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(MacrossError::ConfigInvalid {
                section: "backtest".into(),
                key: "initial_cash".into(),
                reason: format!("{} is not a positive amount", self.initial_cash),
            });
        }
        Ok(())
    }
}

/// Outcome of a single-ticker simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub ticker: String,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub ledger: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    /// Position still held after the last price date, if any.
    pub open_position: Option<Position>,
}

impl Simulation {
    /// Closes the books on a finished `portfolio` holding at most `ticker`.
    pub fn from_portfolio(ticker: &str, portfolio: Portfolio) -> Self {
        let open_position = portfolio.get_position(ticker).cloned();
        Simulation {
            ticker: ticker.to_string(),
            initial_cash: portfolio.initial_cash,
            final_cash: portfolio.cash,
            ledger: portfolio.ledger,
            equity_curve: portfolio.equity_curve,
            open_position,
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }
}

pub fn simulate(
    ticker: &str,
    prices: &[PricePoint],
    signals: &[Signal],
    config: &SimulationConfig,
) -> Result<Simulation, MacrossError> {
    config.validate()?;
    validate_series(prices)?;
    check_signal_order(signals)?;

    let mut portfolio = Portfolio::new(config.initial_cash);
    let mut pending = signals.iter().peekable();
    let mut price_map = HashMap::with_capacity(1);

    for point in prices {
        while let Some(signal) = pending.next_if(|s| s.date <= point.date) {
            let trade = match signal.kind {
                SignalKind::Buy => portfolio.buy(ticker, point.date, point.close, config.allocation)?,
                SignalKind::Sell => portfolio.sell(ticker, point.date, point.close)?,
                SignalKind::Hold => continue,
            };
            tracing::debug!(
                ticker,
                date = %trade.date,
                action = %trade.action,
                shares = trade.shares,
                price = trade.price,
                "trade executed"
            );
        }

        price_map.insert(ticker.to_string(), point.close);
        portfolio.record_equity(point.date, &price_map);
    }

    let unconsumed = pending.count();
    if unconsumed > 0 {
        tracing::debug!(ticker, unconsumed, "signals dated after the last price were ignored");
    }

    Ok(Simulation::from_portfolio(ticker, portfolio))
}

fn check_signal_order(signals: &[Signal]) -> Result<(), MacrossError> {
    match signals.windows(2).find(|w| w[1].date < w[0].date) {
        Some(w) => Err(MacrossError::InvalidSignalOrder { date: w[1].date }),
        None => Ok(()),
    }
}
