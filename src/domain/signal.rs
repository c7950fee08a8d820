//! Trade signals and the per-strategy state carried between dates.

use chrono::NaiveDate;
use std::fmt;

/// Relative tolerance below which two averages count as equal.
const EQUALITY_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
            SignalKind::Hold => write!(f, "HOLD"),
        }
    }
}

/// Identity of the strategy variant that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyId {
    SmaCrossover,
    EmaCrossover,
    TripleMa,
    AdaptiveMa,
}

impl StrategyId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::SmaCrossover => "sma_crossover",
            StrategyId::EmaCrossover => "ema_crossover",
            StrategyId::TripleMa => "triple_ma",
            StrategyId::AdaptiveMa => "adaptive_ma",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sma" | "sma_crossover" => Some(StrategyId::SmaCrossover),
            "ema" | "ema_crossover" => Some(StrategyId::EmaCrossover),
            "triple" | "triple_ma" => Some(StrategyId::TripleMa),
            "adaptive" | "adaptive_ma" => Some(StrategyId::AdaptiveMa),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub date: NaiveDate,
    pub kind: SignalKind,
    pub strategy: StrategyId,
    /// Days the crossover persisted before it was emitted. 1 for undelayed signals.
    pub confirmation_days: u32,
}

/// What the generator believes the strategy is holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionIntent {
    #[default]
    Flat,
    Long,
}

impl PositionIntent {
    /// Whether `kind` is a legal transition from this state.
    pub fn accepts(self, kind: SignalKind) -> bool {
        matches!(
            (self, kind),
            (PositionIntent::Flat, SignalKind::Buy) | (PositionIntent::Long, SignalKind::Sell)
        )
    }

    pub fn after(self, kind: SignalKind) -> Self {
        match kind {
            SignalKind::Buy => PositionIntent::Long,
            SignalKind::Sell => PositionIntent::Flat,
            SignalKind::Hold => self,
        }
    }
}

/// Direction of a crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn signal(self) -> SignalKind {
        match self {
            Direction::Up => SignalKind::Buy,
            Direction::Down => SignalKind::Sell,
        }
    }
}

/// Position of one line relative to another on a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Above,
    Below,
    Equal,
}

impl Relation {
    pub fn between(line: f64, reference: f64) -> Self {
        let scale = line.abs().max(reference.abs()).max(1.0);
        let diff = line - reference;
        if diff.abs() <= EQUALITY_TOLERANCE * scale {
            Relation::Equal
        } else if diff > 0.0 {
            Relation::Above
        } else {
            Relation::Below
        }
    }

    /// Crossover edge from `previous` to `current`.
    ///
    /// An undefined previous relation (warm-up, or the first evaluated date)
    /// is neither above nor below, so the first defined relation can fire.
    pub fn edge(previous: Option<Relation>, current: Relation) -> Option<Direction> {
        match current {
            Relation::Above if previous != Some(Relation::Above) => Some(Direction::Up),
            Relation::Below if previous != Some(Relation::Below) => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn agrees_with(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Relation::Above, Direction::Up) | (Relation::Below, Direction::Down)
        )
    }
}

/// A crossover waiting for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Candidate {
    #[default]
    None,
    Pending { direction: Direction, days_elapsed: u32 },
}
