//! Property tests for indicator, signal and accounting invariants.
//!
//! Uses proptest to verify:
//! 1. Moving averages match their definitions on arbitrary series
//! 2. Signals alternate BUY/SELL, starting with BUY, for every strategy
//! 3. Equity accounting holds on every recorded date
//! 4. Metrics stay within their ranges

mod common;

use common::*;
use macross::domain::backtest::run_backtest;
use macross::domain::error::MacrossError;
use macross::domain::indicator::MovingAverage;
use macross::domain::indicator::volatility::calculate_rolling_volatility;
use macross::domain::price::DateWindow;
use macross::domain::signal::{Relation, SignalKind};
use macross::domain::strategy::{
    AdaptiveMaParams, CrossoverParams, Strategy as TradingStrategy, TripleMaParams,
};
use proptest::prelude::*;

// ── Generators ───────────────────────────────────────────────────────

/// A random walk of daily returns within +-5%, starting at 100.
fn arb_closes(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.05..0.05_f64, min_len..max_len).prop_map(|returns| {
        let mut close = 100.0;
        returns
            .into_iter()
            .map(|r| {
                close *= 1.0 + r;
                close
            })
            .collect()
    })
}

fn arb_strategy() -> impl Strategy<Value = TradingStrategy> {
    (1usize..6, 1usize..10, 0.1..1.0_f64, 0usize..4).prop_map(|(short, gap, allocation, kind)| {
        let long = short + gap;
        match kind {
            0 => TradingStrategy::SmaCrossover(CrossoverParams {
                short_window: short,
                long_window: long,
                allocation,
            }),
            1 => TradingStrategy::EmaCrossover(CrossoverParams {
                short_window: short,
                long_window: long,
                allocation,
            }),
            2 => TradingStrategy::TripleMa(TripleMaParams {
                fast_window: short,
                medium_window: long,
                slow_window: long + gap,
                allocation,
            }),
            _ => TradingStrategy::AdaptiveMa(AdaptiveMaParams {
                short_window: short,
                long_window: long,
                average: MovingAverage::Simple,
                volatility_window: 5,
                volatility_threshold: 0.02,
                confirmation_days: 1 + gap as u32 % 3,
                allocation,
            }),
        }
    })
}

// ── 1. Indicators ────────────────────────────────────────────────────

proptest! {
    /// SMA at every defined index is the mean of the trailing window.
    #[test]
    fn sma_is_trailing_mean(closes in arb_closes(1, 80), window in 1usize..20) {
        prop_assume!(window <= closes.len());
        let prices = make_prices("2024-01-01", &closes);
        let series = MovingAverage::Simple.calculate(&prices, window).unwrap();

        prop_assert_eq!(series.len(), closes.len());
        for i in 0..closes.len() {
            match series.value_at(i) {
                None => prop_assert!(i + 1 < window),
                Some(v) => {
                    let mean = closes[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                    prop_assert!((v - mean).abs() <= 1e-9 * mean.abs().max(1.0));
                }
            }
        }
    }

    /// EMA never leaves the range of closes seen so far.
    #[test]
    fn ema_is_bounded_by_history(closes in arb_closes(1, 80), window in 1usize..20) {
        prop_assume!(window <= closes.len());
        let prices = make_prices("2024-01-01", &closes);
        let series = MovingAverage::Exponential.calculate(&prices, window).unwrap();

        for i in series.warmup()..closes.len() {
            let v = series.value_at(i).unwrap();
            let lo = closes[..=i].iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = closes[..=i].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
        }
    }

    /// Any average over fewer prices than its window is InsufficientData.
    #[test]
    fn short_series_is_insufficient(closes in arb_closes(1, 20), extra in 1usize..10) {
        let prices = make_prices("2024-01-01", &closes);
        let window = closes.len() + extra;

        for average in [MovingAverage::Simple, MovingAverage::Exponential] {
            let err = average.calculate(&prices, window).unwrap_err();
            prop_assert!(
                matches!(err, MacrossError::InsufficientData { .. }),
                "unexpected error: {}", err
            );
        }
    }

    /// Rolling volatility is undefined for exactly `window` points, then non-negative.
    #[test]
    fn volatility_warmup_and_sign(closes in arb_closes(12, 60), window in 2usize..10) {
        let prices = make_prices("2024-01-01", &closes);
        let series = calculate_rolling_volatility(&prices, window).unwrap();

        prop_assert_eq!(series.warmup(), window);
        for i in window..closes.len() {
            prop_assert!(series.value_at(i).unwrap() >= 0.0);
        }
    }
}

// ── 2. Signals ───────────────────────────────────────────────────────

proptest! {
    /// Emitted signals alternate BUY, SELL, BUY, ... and are dated in order.
    #[test]
    fn signals_alternate(closes in arb_closes(30, 150), strategy in arb_strategy()) {
        let prices = make_prices("2024-01-01", &closes);
        let window = DateWindow::covering(&prices).unwrap();
        let signals = strategy.generate_signals(&prices, &window).unwrap();

        for (i, signal) in signals.iter().enumerate() {
            let expected = if i % 2 == 0 { SignalKind::Buy } else { SignalKind::Sell };
            prop_assert_eq!(signal.kind, expected);
            prop_assert_eq!(signal.strategy, strategy.id());
        }
        for pair in signals.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
    }
}

proptest! {
    /// With a window opening mid-series, every crossover BUY still sits on a
    /// date where the fast line was not already above the slow one the day before.
    #[test]
    fn windowed_buys_need_a_fresh_cross(
        closes in arb_closes(40, 150),
        short in 1usize..6,
        gap in 1usize..10,
        start_fraction in 0.1..0.9_f64,
    ) {
        let prices = make_prices("2024-01-01", &closes);
        let strategy = TradingStrategy::SmaCrossover(CrossoverParams {
            short_window: short,
            long_window: short + gap,
            allocation: 1.0,
        });
        let start = ((prices.len() as f64 * start_fraction) as usize).max(1);
        let window = DateWindow::new(prices[start].date, prices[prices.len() - 1].date);

        let signals = strategy.generate_signals(&prices, &window).unwrap();
        let indicators = strategy.indicators(&prices).unwrap();
        for signal in signals.iter().filter(|s| s.kind == SignalKind::Buy) {
            let index = prices.iter().position(|p| p.date == signal.date).unwrap();
            let before = indicators.snapshot(index - 1).unwrap();
            if let (Some(fast), Some(slow)) = (before.fast, before.slow) {
                prop_assert!(Relation::between(fast, slow) != Relation::Above);
            }
        }
    }
}

// ── 3-4. Accounting and metrics ──────────────────────────────────────

proptest! {
    /// equity == cash + position value on every date, and cash never goes negative.
    #[test]
    fn equity_identity(closes in arb_closes(30, 150), strategy in arb_strategy()) {
        let prices = make_prices("2024-01-01", &closes);
        let report = run_backtest("SPY", &prices, &strategy, &config_covering(&prices, 10_000.0)).unwrap();

        prop_assert_eq!(report.equity_curve.len(), prices.len());
        for point in &report.equity_curve {
            prop_assert!((point.equity - (point.cash + point.position_value)).abs() <= 1e-6);
            prop_assert!(point.cash >= -1e-9);
        }
        prop_assert_eq!(report.ledger.len(), report.signals.len());
    }

    /// Drawdown, win rate and trade counts stay within their ranges.
    #[test]
    fn metrics_ranges(closes in arb_closes(30, 150), strategy in arb_strategy()) {
        let prices = make_prices("2024-01-01", &closes);
        let m = run_backtest("SPY", &prices, &strategy, &config_covering(&prices, 10_000.0))
            .unwrap()
            .metrics;

        prop_assert!((0.0..=1.0).contains(&m.max_drawdown));
        prop_assert!(m.max_drawdown_duration < prices.len());
        if let Some(rate) = m.win_rate {
            prop_assert!((0.0..=1.0).contains(&rate));
        }
        prop_assert!(m.trades_won + m.trades_lost <= m.closed_trades);
        prop_assert!(m.closed_trades * 2 <= m.transaction_count + 1);
    }
}
