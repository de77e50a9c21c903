//! Configuration validation.
//!
//! Validates the `[bot]`, `[forecast]` and `[data]` sections before any run.

use crate::domain::error::CryptosimError;
use crate::domain::forecast::{ModelOrder, SeasonalOrder};
use crate::domain::tick::TradingPair;
use crate::ports::config_port::ConfigPort;

pub fn validate_bot_config(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    validate_pair(config)?;
    validate_poll_interval(config)?;
    validate_initial_balance(config)?;
    validate_windows(config)?;
    validate_order_quantity(config)?;
    validate_history_limit(config)?;
    validate_max_cycles(config)?;
    Ok(())
}

pub fn validate_forecast_config(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    validate_order(config)?;
    validate_seasonal_order(config)?;
    validate_horizon(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    match config.get_string("data", "csv_dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(CryptosimError::ConfigMissing {
            section: "data".to_string(),
            key: "csv_dir".to_string(),
        }),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CryptosimError {
    CryptosimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_pair(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    let value = config
        .get_string("bot", "pair")
        .ok_or_else(|| CryptosimError::ConfigMissing {
            section: "bot".to_string(),
            key: "pair".to_string(),
        })?;
    value
        .parse::<TradingPair>()
        .map_err(|_| invalid("bot", "pair", "pair must look like BASE/QUOTE"))?;
    Ok(())
}

fn validate_poll_interval(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    let value = config.get_double("bot", "poll_interval_seconds", 0.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "bot",
            "poll_interval_seconds",
            "poll_interval_seconds must be positive",
        ));
    }
    Ok(())
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    let value = config.get_double("bot", "initial_balance", 0.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "bot",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }
    Ok(())
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    let short = config.get_int("bot", "short_window", 0);
    if short < 1 {
        return Err(invalid("bot", "short_window", "short_window must be at least 1"));
    }
    let long = config.get_int("bot", "long_window", 0);
    if long < 1 {
        return Err(invalid("bot", "long_window", "long_window must be at least 1"));
    }
    if long < short {
        return Err(invalid(
            "bot",
            "long_window",
            "long_window must not be shorter than short_window",
        ));
    }
    Ok(())
}

fn validate_order_quantity(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    let value = config.get_double("bot", "order_quantity", 1.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "bot",
            "order_quantity",
            "order_quantity must be positive",
        ));
    }
    Ok(())
}

fn validate_history_limit(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    let limit = config.get_int("bot", "history_limit", 200);
    let long = config.get_int("bot", "long_window", 0);
    if limit < 1 || limit < long {
        return Err(invalid(
            "bot",
            "history_limit",
            "history_limit must be at least long_window",
        ));
    }
    Ok(())
}

fn validate_max_cycles(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    if config.get_string("bot", "max_cycles").is_none() {
        return Ok(());
    }
    if config.get_int("bot", "max_cycles", 0) < 1 {
        return Err(invalid("bot", "max_cycles", "max_cycles must be at least 1"));
    }
    Ok(())
}

fn validate_order(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    if let Some(value) = config.get_string("forecast", "order") {
        value
            .parse::<ModelOrder>()
            .map_err(|e| invalid("forecast", "order", e.to_string()))?;
    }
    Ok(())
}

fn validate_seasonal_order(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    if let Some(value) = config.get_string("forecast", "seasonal_order") {
        value
            .parse::<SeasonalOrder>()
            .and_then(|s| s.validate())
            .map_err(|e| invalid("forecast", "seasonal_order", e.to_string()))?;
    }
    Ok(())
}

fn validate_horizon(config: &dyn ConfigPort) -> Result<(), CryptosimError> {
    if config.get_int("forecast", "horizon", 1) < 1 {
        return Err(invalid("forecast", "horizon", "horizon must be at least 1"));
    }
    Ok(())
}
