//! Core domain types and logic.
//!
//! Pipeline: prices → [`indicator`] → [`strategy`] signals → [`simulator`]
//! → [`metrics`], driven per ticker by [`backtest`].

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod portfolio;
pub mod position;
pub mod price;
pub mod signal;
pub mod simulator;
pub mod strategy;
