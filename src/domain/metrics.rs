//! Performance metrics and statistics.

use super::portfolio::EquityPoint;
use super::position::{TradeAction, TradeRecord};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Standard deviations at or below this are treated as zero.
const STDDEV_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_cash: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    /// Longest run of equity points below the running peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: Option<f64>,
    pub annualized_volatility: Option<f64>,
    /// `None` when no trade was closed.
    pub win_rate: Option<f64>,
    pub transaction_count: usize,
    pub closed_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
}

impl Metrics {
    pub fn compute(equity_curve: &[EquityPoint], ledger: &[TradeRecord], initial_cash: f64) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_cash);

        let total_return = if initial_cash > 0.0 {
            final_equity / initial_cash - 1.0
        } else {
            0.0
        };

        let annualized_return = annualize(total_return, equity_curve.len());
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let returns = daily_returns(equity_curve);
        let (sharpe_ratio, annualized_volatility) = match mean_and_stddev(&returns) {
            Some((mean, stddev)) if stddev > STDDEV_EPSILON => (
                Some(mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()),
                Some(stddev * TRADING_DAYS_PER_YEAR.sqrt()),
            ),
            Some((_, stddev)) => (None, Some(stddev * TRADING_DAYS_PER_YEAR.sqrt())),
            None => (None, None),
        };

        let mut closed_trades = 0usize;
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        for trade in ledger.iter().filter(|t| t.action == TradeAction::Sell) {
            closed_trades += 1;
            match trade.realized_pnl {
                Some(pnl) if pnl > 0.0 => trades_won += 1,
                Some(pnl) if pnl < 0.0 => trades_lost += 1,
                _ => {}
            }
        }

        let win_rate = if closed_trades > 0 {
            Some(trades_won as f64 / closed_trades as f64)
        } else {
            None
        };

        Metrics {
            initial_cash,
            final_equity,
            total_return,
            annualized_return,
            max_drawdown,
            max_drawdown_duration,
            sharpe_ratio,
            annualized_volatility,
            win_rate,
            transaction_count: ledger.len(),
            closed_trades,
            trades_won,
            trades_lost,
        }
    }
}

fn annualize(total_return: f64, points: usize) -> f64 {
    if points == 0 || !total_return.is_finite() {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    let years = points as f64 / TRADING_DAYS_PER_YEAR;
    growth.powf(1.0 / years) - 1.0
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut current_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}

fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                w[1].equity / prev - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Mean and sample standard deviation; `None` for fewer than two values.
fn mean_and_stddev(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}
