//! Moving-average strategies and their signal generation.
//!
//! Each variant is a pure per-date `step` over an explicit `GeneratorState`.
//! `generate_signals` threads that state across the dates of a window and
//! keeps only the emitted BUY/SELL signals.

use chrono::NaiveDate;

use crate::domain::error::MacrossError;
use crate::domain::indicator::{IndicatorSeries, MovingAverage, calculate_rolling_volatility};
use crate::domain::price::{DateWindow, PricePoint, validate_series, window_range};
use crate::domain::signal::{
    Candidate, PositionIntent, Relation, Signal, SignalKind, StrategyId,
};

/// Parameters for the two-line SMA/EMA crossover.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverParams {
    pub short_window: usize,
    pub long_window: usize,
    pub allocation: f64,
}

impl CrossoverParams {
    pub fn sma_defaults() -> Self {
        CrossoverParams {
            short_window: 50,
            long_window: 200,
            allocation: 1.0,
        }
    }

    pub fn ema_defaults() -> Self {
        CrossoverParams {
            short_window: 12,
            long_window: 26,
            allocation: 1.0,
        }
    }
}

impl Default for CrossoverParams {
    fn default() -> Self {
        CrossoverParams::sma_defaults()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripleMaParams {
    pub fast_window: usize,
    pub medium_window: usize,
    pub slow_window: usize,
    pub allocation: f64,
}

impl Default for TripleMaParams {
    fn default() -> Self {
        TripleMaParams {
            fast_window: 10,
            medium_window: 50,
            slow_window: 200,
            allocation: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveMaParams {
    pub short_window: usize,
    pub long_window: usize,
    pub average: MovingAverage,
    pub volatility_window: usize,
    /// Trailing volatility above this requires `confirmation_days`.
    pub volatility_threshold: f64,
    pub confirmation_days: u32,
    pub allocation: f64,
}

impl Default for AdaptiveMaParams {
    fn default() -> Self {
        AdaptiveMaParams {
            short_window: 20,
            long_window: 50,
            average: MovingAverage::Simple,
            volatility_window: 20,
            volatility_threshold: 0.02,
            confirmation_days: 3,
            allocation: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    SmaCrossover(CrossoverParams),
    EmaCrossover(CrossoverParams),
    TripleMa(TripleMaParams),
    AdaptiveMa(AdaptiveMaParams),
}

/// Indicator values for one date, as seen by a strategy.
///
/// Two-line strategies use `fast` (short MA) and `slow` (long MA) and leave
/// `medium` empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub fast: Option<f64>,
    pub medium: Option<f64>,
    pub slow: Option<f64>,
    pub volatility: Option<f64>,
}

/// Everything a strategy carries from one date to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeneratorState {
    pub intent: PositionIntent,
    /// Fast line relative to its reference line on the previous date.
    pub previous: Option<Relation>,
    /// Whether fast > medium > slow held on the previous date.
    pub previously_stacked: bool,
    pub candidate: Candidate,
}

/// Outcome of a single `step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub state: GeneratorState,
    pub kind: SignalKind,
    pub confirmation_days: u32,
}

/// Indicator series a strategy needs, all aligned to the same price axis.
#[derive(Debug, Clone)]
pub struct StrategyIndicators {
    pub fast: IndicatorSeries,
    pub medium: Option<IndicatorSeries>,
    pub slow: IndicatorSeries,
    pub volatility: Option<IndicatorSeries>,
}

impl StrategyIndicators {
    pub fn len(&self) -> usize {
        self.fast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    pub fn snapshot(&self, index: usize) -> Option<Snapshot> {
        let date = self.fast.values.get(index)?.date;
        Some(Snapshot {
            date,
            fast: self.fast.value_at(index),
            medium: self.medium.as_ref().and_then(|s| s.value_at(index)),
            slow: self.slow.value_at(index),
            volatility: self.volatility.as_ref().and_then(|s| s.value_at(index)),
        })
    }
}

impl Strategy {
    pub fn id(&self) -> StrategyId {
        match self {
            Strategy::SmaCrossover(_) => StrategyId::SmaCrossover,
            Strategy::EmaCrossover(_) => StrategyId::EmaCrossover,
            Strategy::TripleMa(_) => StrategyId::TripleMa,
            Strategy::AdaptiveMa(_) => StrategyId::AdaptiveMa,
        }
    }

    /// The variant named `id` with its default parameters.
    pub fn with_defaults(id: StrategyId) -> Self {
        match id {
            StrategyId::SmaCrossover => Strategy::SmaCrossover(CrossoverParams::sma_defaults()),
            StrategyId::EmaCrossover => Strategy::EmaCrossover(CrossoverParams::ema_defaults()),
            StrategyId::TripleMa => Strategy::TripleMa(TripleMaParams::default()),
            StrategyId::AdaptiveMa => Strategy::AdaptiveMa(AdaptiveMaParams::default()),
        }
    }

    pub fn allocation(&self) -> f64 {
        match self {
            Strategy::SmaCrossover(p) | Strategy::EmaCrossover(p) => p.allocation,
            Strategy::TripleMa(p) => p.allocation,
            Strategy::AdaptiveMa(p) => p.allocation,
        }
    }

    pub fn with_allocation(mut self, allocation: f64) -> Self {
        match &mut self {
            Strategy::SmaCrossover(p) | Strategy::EmaCrossover(p) => p.allocation = allocation,
            Strategy::TripleMa(p) => p.allocation = allocation,
            Strategy::AdaptiveMa(p) => p.allocation = allocation,
        }
        self
    }

    /// Minimum number of prices before every line is defined.
    pub fn required_history(&self) -> usize {
        match self {
            Strategy::SmaCrossover(p) | Strategy::EmaCrossover(p) => p.long_window,
            Strategy::TripleMa(p) => p.slow_window,
            Strategy::AdaptiveMa(p) => p.long_window,
        }
    }

    pub fn validate(&self) -> Result<(), MacrossError> {
        validate_allocation(self.allocation())?;
        match self {
            Strategy::SmaCrossover(p) | Strategy::EmaCrossover(p) => {
                validate_pair(p.short_window, p.long_window)
            }
            Strategy::TripleMa(p) => {
                validate_pair(p.fast_window, p.medium_window)?;
                validate_pair(p.medium_window, p.slow_window)
            }
            Strategy::AdaptiveMa(p) => {
                validate_pair(p.short_window, p.long_window)?;
                if p.volatility_window < 2 {
                    return Err(MacrossError::InvalidWindow {
                        window: p.volatility_window,
                        reason: "volatility window must be at least 2".into(),
                    });
                }
                if !p.volatility_threshold.is_finite() || p.volatility_threshold < 0.0 {
                    return Err(MacrossError::ConfigInvalid {
                        section: "strategy".into(),
                        key: "volatility_threshold".into(),
                        reason: "must be a non-negative number".into(),
                    });
                }
                if p.confirmation_days == 0 {
                    return Err(MacrossError::ConfigInvalid {
                        section: "strategy".into(),
                        key: "confirmation_days".into(),
                        reason: "must be at least 1".into(),
                    });
                }
                Ok(())
            }
        }
    }

    pub fn indicators(&self, prices: &[PricePoint]) -> Result<StrategyIndicators, MacrossError> {
        self.validate()?;
        match self {
            Strategy::SmaCrossover(p) => Ok(StrategyIndicators {
                fast: MovingAverage::Simple.calculate(prices, p.short_window)?,
                medium: None,
                slow: MovingAverage::Simple.calculate(prices, p.long_window)?,
                volatility: None,
            }),
            Strategy::EmaCrossover(p) => Ok(StrategyIndicators {
                fast: MovingAverage::Exponential.calculate(prices, p.short_window)?,
                medium: None,
                slow: MovingAverage::Exponential.calculate(prices, p.long_window)?,
                volatility: None,
            }),
            Strategy::TripleMa(p) => Ok(StrategyIndicators {
                fast: MovingAverage::Simple.calculate(prices, p.fast_window)?,
                medium: Some(MovingAverage::Simple.calculate(prices, p.medium_window)?),
                slow: MovingAverage::Simple.calculate(prices, p.slow_window)?,
                volatility: None,
            }),
            Strategy::AdaptiveMa(p) => {
                let fast = p.average.calculate(prices, p.short_window)?;
                let slow = p.average.calculate(prices, p.long_window)?;
                // Too little history for volatility leaves the regime undefined,
                // which counts as calm.
                let volatility = match calculate_rolling_volatility(prices, p.volatility_window) {
                    Ok(series) => Some(series),
                    Err(MacrossError::InsufficientData { .. }) => None,
                    Err(e) => return Err(e),
                };
                Ok(StrategyIndicators {
                    fast,
                    medium: None,
                    slow,
                    volatility,
                })
            }
        }
    }

    /// Signals for every date of `prices` inside `window`.
    ///
    /// Indicators use the whole series, so prices before `window.start`
    /// serve as warm-up history.
    pub fn generate_signals(
        &self,
        prices: &[PricePoint],
        window: &DateWindow,
    ) -> Result<Vec<Signal>, MacrossError> {
        validate_series(prices)?;
        let indicators = self.indicators(prices)?;
        Ok(self.signals_from(&indicators, window_range(prices, window)))
    }

    /// Walks `range` of precomputed indicators, emitting BUY/SELL signals.
    ///
    /// Starts flat, with the line relations of the date before `range`
    /// already known, so a crossover that happened earlier does not fire
    /// on the first date of the range.
    pub fn signals_from(
        &self,
        indicators: &StrategyIndicators,
        range: std::ops::Range<usize>,
    ) -> Vec<Signal> {
        let mut state = self.seed_state(indicators, range.start);
        let mut signals = Vec::new();

        for index in range {
            let Some(snapshot) = indicators.snapshot(index) else {
                break;
            };
            let step = self.step(state, &snapshot);
            state = step.state;

            if step.kind != SignalKind::Hold {
                tracing::debug!(
                    strategy = %self.id(),
                    date = %snapshot.date,
                    kind = %step.kind,
                    confirmation_days = step.confirmation_days,
                    "signal emitted"
                );
                signals.push(Signal {
                    date: snapshot.date,
                    kind: step.kind,
                    strategy: self.id(),
                    confirmation_days: step.confirmation_days,
                });
            }
        }

        signals
    }

    /// Flat state carrying the relations observed at `start - 1`.
    fn seed_state(&self, indicators: &StrategyIndicators, start: usize) -> GeneratorState {
        let Some(snapshot) = start.checked_sub(1).and_then(|i| indicators.snapshot(i)) else {
            return GeneratorState::default();
        };
        let observed = self.step(GeneratorState::default(), &snapshot).state;
        GeneratorState {
            previous: observed.previous,
            previously_stacked: observed.previously_stacked,
            ..GeneratorState::default()
        }
    }

    /// Advances the generator by one date.
    pub fn step(&self, state: GeneratorState, snapshot: &Snapshot) -> Step {
        match self {
            Strategy::SmaCrossover(_) | Strategy::EmaCrossover(_) => crossover_step(state, snapshot),
            Strategy::TripleMa(_) => triple_step(state, snapshot),
            Strategy::AdaptiveMa(p) => adaptive_step(p, state, snapshot),
        }
    }
}

pub fn validate_allocation(allocation: f64) -> Result<(), MacrossError> {
    // NaN fails both comparisons
    if allocation > 0.0 && allocation <= 1.0 {
        Ok(())
    } else {
        Err(MacrossError::InvalidAllocation { allocation })
    }
}

fn validate_pair(shorter: usize, longer: usize) -> Result<(), MacrossError> {
    if shorter == 0 {
        return Err(MacrossError::InvalidWindow {
            window: shorter,
            reason: "window must be at least 1".into(),
        });
    }
    if shorter >= longer {
        return Err(MacrossError::InvalidWindow {
            window: shorter,
            reason: format!("must be shorter than {}", longer),
        });
    }
    Ok(())
}

fn hold(state: GeneratorState) -> Step {
    Step {
        state,
        kind: SignalKind::Hold,
        confirmation_days: 0,
    }
}

/// Applies the position-intent state machine to a candidate signal.
fn emit(mut state: GeneratorState, kind: SignalKind, confirmation_days: u32, date: NaiveDate) -> Step {
    if kind == SignalKind::Hold {
        return hold(state);
    }
    if !state.intent.accepts(kind) {
        tracing::debug!(%date, %kind, intent = ?state.intent, "signal suppressed");
        return hold(state);
    }
    state.intent = state.intent.after(kind);
    Step {
        state,
        kind,
        confirmation_days,
    }
}

fn crossover_step(mut state: GeneratorState, snapshot: &Snapshot) -> Step {
    let (Some(fast), Some(slow)) = (snapshot.fast, snapshot.slow) else {
        state.previous = None;
        return hold(state);
    };

    let relation = Relation::between(fast, slow);
    let edge = Relation::edge(state.previous, relation);
    state.previous = Some(relation);

    match edge {
        Some(direction) => emit(state, direction.signal(), 1, snapshot.date),
        None => hold(state),
    }
}

fn triple_step(mut state: GeneratorState, snapshot: &Snapshot) -> Step {
    let (Some(fast), Some(medium), Some(slow)) = (snapshot.fast, snapshot.medium, snapshot.slow)
    else {
        state.previous = None;
        state.previously_stacked = false;
        return hold(state);
    };

    let fast_vs_medium = Relation::between(fast, medium);
    let stacked =
        fast_vs_medium == Relation::Above && Relation::between(medium, slow) == Relation::Above;

    let kind = if stacked && !state.previously_stacked {
        SignalKind::Buy
    } else if fast_vs_medium == Relation::Below && state.previous != Some(Relation::Below) {
        // medium/slow ordering is irrelevant on the way out
        SignalKind::Sell
    } else {
        SignalKind::Hold
    };

    state.previous = Some(fast_vs_medium);
    state.previously_stacked = stacked;
    emit(state, kind, 1, snapshot.date)
}

fn adaptive_step(params: &AdaptiveMaParams, mut state: GeneratorState, snapshot: &Snapshot) -> Step {
    let (Some(fast), Some(slow)) = (snapshot.fast, snapshot.slow) else {
        state.previous = None;
        state.candidate = Candidate::None;
        return hold(state);
    };

    let relation = Relation::between(fast, slow);
    let edge = Relation::edge(state.previous, relation);
    state.previous = Some(relation);

    let high_volatility = snapshot
        .volatility
        .is_some_and(|v| v > params.volatility_threshold);
    let required = if high_volatility {
        params.confirmation_days
    } else {
        1
    };

    let candidate = match state.candidate {
        Candidate::Pending {
            direction,
            days_elapsed,
        } if relation.agrees_with(direction) => Candidate::Pending {
            direction,
            days_elapsed: days_elapsed + 1,
        },
        Candidate::Pending {
            direction,
            days_elapsed,
        } => {
            tracing::debug!(
                date = %snapshot.date,
                ?direction,
                days_elapsed,
                "crossover reversed before confirmation, discarded"
            );
            Candidate::None
        }
        Candidate::None => Candidate::None,
    };

    let candidate = match (candidate, edge) {
        (Candidate::None, Some(direction)) if state.intent.accepts(direction.signal()) => {
            Candidate::Pending {
                direction,
                days_elapsed: 1,
            }
        }
        (candidate, _) => candidate,
    };

    match candidate {
        Candidate::Pending {
            direction,
            days_elapsed,
        } if days_elapsed >= required => {
            state.candidate = Candidate::None;
            emit(state, direction.signal(), days_elapsed, snapshot.date)
        }
        pending => {
            state.candidate = pending;
            hold(state)
        }
    }
}
