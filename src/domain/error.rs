//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for macross.
#[derive(Debug, thiserror::Error)]
pub enum MacrossError {
    #[error("insufficient data: have {available} prices, need {required}")]
    InsufficientData { required: usize, available: usize },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("invalid allocation {allocation}: must be in (0, 1]")]
    InvalidAllocation { allocation: f64 },

    #[error("invalid window {window}: {reason}")]
    InvalidWindow { window: usize, reason: String },

    #[error("invalid price series: {reason}")]
    InvalidPriceSeries { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no open position in {ticker} to sell on {date}")]
    NoPositionToSell { ticker: String, date: NaiveDate },

    #[error("position in {ticker} already open on {date}")]
    PositionAlreadyOpen { ticker: String, date: NaiveDate },

    #[error("signal dated {date} arrived after a later signal")]
    InvalidSignalOrder { date: NaiveDate },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MacrossError {
    /// Protocol violations between the signal generator and the simulator.
    /// These indicate a bug, not a bad input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            MacrossError::NoPositionToSell { .. }
                | MacrossError::PositionAlreadyOpen { .. }
                | MacrossError::InvalidSignalOrder { .. }
        )
    }
}

impl From<&MacrossError> for std::process::ExitCode {
    fn from(err: &MacrossError) -> Self {
        let code: u8 = match err {
            MacrossError::Io(_) => 1,
            MacrossError::ConfigParse { .. }
            | MacrossError::ConfigMissing { .. }
            | MacrossError::ConfigInvalid { .. }
            | MacrossError::InvalidAllocation { .. }
            | MacrossError::InvalidWindow { .. } => 2,
            MacrossError::Data { .. } | MacrossError::InvalidPriceSeries { .. } => 3,
            MacrossError::NoData { .. } | MacrossError::InsufficientData { .. } => 5,
            MacrossError::NoPositionToSell { .. }
            | MacrossError::PositionAlreadyOpen { .. }
            | MacrossError::InvalidSignalOrder { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
