//! Configuration validation.
//!
//! Validates all config fields before a backtest runs, so that building the
//! domain values afterwards cannot fail on a malformed key.

use crate::domain::error::MacrossError;
use crate::domain::indicator::MovingAverage;
use crate::domain::signal::StrategyId;
use crate::domain::strategy::{AdaptiveMaParams, CrossoverParams, TripleMaParams};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    validate_initial_cash(config)?;
    validate_dates(config)?;
    validate_tickers(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let id = validate_strategy_type(config)?;
    validate_fraction(config, "strategy", "allocation")?;

    match id {
        StrategyId::SmaCrossover => {
            let d = CrossoverParams::sma_defaults();
            validate_window_order(config, &[("short_window", d.short_window), ("long_window", d.long_window)])?;
        }
        StrategyId::EmaCrossover => {
            let d = CrossoverParams::ema_defaults();
            validate_window_order(config, &[("short_window", d.short_window), ("long_window", d.long_window)])?;
        }
        StrategyId::TripleMa => {
            let d = TripleMaParams::default();
            validate_window_order(
                config,
                &[
                    ("fast_window", d.fast_window),
                    ("medium_window", d.medium_window),
                    ("slow_window", d.slow_window),
                ],
            )?;
        }
        StrategyId::AdaptiveMa => {
            let d = AdaptiveMaParams::default();
            validate_window_order(config, &[("short_window", d.short_window), ("long_window", d.long_window)])?;
            validate_adaptive(config, &d)?;
        }
    }

    validate_allocations(config)
}

/// Parsed `[strategy] type`, which must name a known strategy.
pub fn validate_strategy_type(config: &dyn ConfigPort) -> Result<StrategyId, MacrossError> {
    let value = config
        .get_string("strategy", "type")
        .ok_or_else(|| MacrossError::ConfigMissing {
            section: "strategy".to_string(),
            key: "type".to_string(),
        })?;
    StrategyId::parse(&value).ok_or_else(|| MacrossError::ConfigInvalid {
        section: "strategy".to_string(),
        key: "type".to_string(),
        reason: format!(
            "unknown strategy '{}', expected sma_crossover, ema_crossover, triple_ma or adaptive_ma",
            value
        ),
    })
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let value = double_value(config, "backtest", "initial_cash", 100_000.0)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(MacrossError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date > end_date {
        return Err(MacrossError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must not be after end_date".to_string(),
        });
    }
    Ok(())
}

/// Reads a required `YYYY-MM-DD` date from `[backtest]`.
pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, MacrossError> {
    match config.get_string("backtest", field) {
        None => Err(MacrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            MacrossError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}

/// Comma-separated tickers, trimmed and upper-cased, empty entries dropped.
pub fn parse_tickers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    match config.get_string("backtest", "tickers") {
        Some(s) if !parse_tickers(&s).is_empty() => Ok(()),
        _ => Err(MacrossError::ConfigMissing {
            section: "backtest".to_string(),
            key: "tickers".to_string(),
        }),
    }
}

fn validate_window_order(
    config: &dyn ConfigPort,
    keys: &[(&str, usize)],
) -> Result<(), MacrossError> {
    let mut previous: Option<(&str, i64)> = None;
    for &(key, default) in keys {
        let value = int_value(config, "strategy", key, default as i64)?;
        if value < 1 {
            return Err(MacrossError::ConfigInvalid {
                section: "strategy".to_string(),
                key: key.to_string(),
                reason: format!("{} must be at least 1", key),
            });
        }
        if let Some((prev_key, prev_value)) = previous {
            if prev_value >= value {
                return Err(MacrossError::ConfigInvalid {
                    section: "strategy".to_string(),
                    key: prev_key.to_string(),
                    reason: format!("{} must be less than {}", prev_key, key),
                });
            }
        }
        previous = Some((key, value));
    }
    Ok(())
}

fn validate_adaptive(config: &dyn ConfigPort, defaults: &AdaptiveMaParams) -> Result<(), MacrossError> {
    if let Some(average) = config.get_string("strategy", "average") {
        if MovingAverage::parse(&average).is_none() {
            return Err(MacrossError::ConfigInvalid {
                section: "strategy".to_string(),
                key: "average".to_string(),
                reason: format!("unknown average '{}', expected sma or ema", average),
            });
        }
    }

    let threshold = double_value(
        config,
        "strategy",
        "volatility_threshold",
        defaults.volatility_threshold,
    )?;
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(MacrossError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "volatility_threshold".to_string(),
            reason: "volatility_threshold must be non-negative".to_string(),
        });
    }

    let window = int_value(
        config,
        "strategy",
        "volatility_window",
        defaults.volatility_window as i64,
    )?;
    if window < 2 {
        return Err(MacrossError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "volatility_window".to_string(),
            reason: "volatility_window must be at least 2".to_string(),
        });
    }

    let days = int_value(
        config,
        "strategy",
        "confirmation_days",
        defaults.confirmation_days as i64,
    )?;
    if days < 1 || days > u32::MAX as i64 {
        return Err(MacrossError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "confirmation_days".to_string(),
            reason: "confirmation_days must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_allocations(config: &dyn ConfigPort) -> Result<(), MacrossError> {
    for ticker in config.get_keys("allocations") {
        validate_fraction(config, "allocations", &ticker)?;
    }
    Ok(())
}

fn validate_fraction(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), MacrossError> {
    let value = double_value(config, section, key, 1.0)?;
    if !(value > 0.0 && value <= 1.0) {
        return Err(MacrossError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{} must be in (0, 1]", key),
        });
    }
    Ok(())
}

/// Like `ConfigPort::get_int`, but a present non-numeric value is an error
/// instead of falling back to the default.
fn int_value(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, MacrossError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s.trim().parse().map_err(|_| MacrossError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("'{}' is not an integer", s),
        }),
    }
}

fn double_value(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, MacrossError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s.trim().parse().map_err(|_| MacrossError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("'{}' is not a number", s),
        }),
    }
}
