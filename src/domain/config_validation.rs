//! Configuration validation.
//!
//! Checks every section before a replay is configured, so a bad file fails
//! fast with the offending `[section] key` instead of mid-run.

use crate::domain::clock::parse_datetime;
use crate::domain::config::DataFormat;
use crate::domain::error::ReplayError;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;

pub fn validate_replay_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_data(config)?;
    validate_range(config)?;
    validate_frequency(config)?;
    validate_account(config)?;
    validate_trading(config)?;
    validate_signal(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ReplayError {
    ReplayError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// A present value must parse as a number; an absent one falls back to `default`.
fn number(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, ReplayError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("'{}' is not a number", raw.trim()))),
    }
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<(), ReplayError> {
    if number(config, section, key, default)? <= 0.0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<(), ReplayError> {
    if number(config, section, key, default)? < 0.0 {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(())
}

fn at_least_one(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<(), ReplayError> {
    let value = number(config, section, key, default as f64)?;
    if value < 1.0 || value.fract() != 0.0 {
        return Err(invalid(section, key, format!("{key} must be a whole number of at least 1")));
    }
    Ok(())
}

fn bar_timeframe(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), ReplayError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.parse::<Timeframe>() {
        Ok(tf) if tf.is_tick() => Err(invalid(section, key, "indicators need a bar timeframe, not Tick")),
        Ok(_) => Ok(()),
        Err(_) => Err(invalid(section, key, format!("unsupported timeframe '{}'", raw.trim()))),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if let Some(format) = config.get_string("data", "format") {
        format.parse::<DataFormat>()?;
    }
    positive(config, "data", "point", crate::domain::config::DEFAULT_BAR_POINT)
}

fn validate_range(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let mut bounds = Vec::with_capacity(2);
    for key in ["start", "end"] {
        let raw = config
            .get_string("replay", key)
            .ok_or_else(|| ReplayError::ConfigMissing {
                section: "replay".to_string(),
                key: key.to_string(),
            })?;
        let parsed = parse_datetime(raw.trim())
            .map_err(|_| invalid("replay", key, format!("invalid date format {}", raw.trim())))?;
        bounds.push(parsed);
    }
    if bounds[0] >= bounds[1] {
        return Err(invalid("replay", "start", "start must be before end"));
    }
    Ok(())
}

fn validate_frequency(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    match config.get_string("replay", "frequency") {
        Some(raw) if raw.parse::<Timeframe>().is_err() => Err(invalid(
            "replay",
            "frequency",
            format!("invalid frequency {}", raw.trim()),
        )),
        _ => Ok(()),
    }
}

fn validate_account(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    positive(config, "account", "balance", 10_000.0)?;
    positive(config, "account", "leverage", 30.0)?;
    positive(config, "account", "point", 1.0)?;
    positive(config, "account", "lot_in_units", 1.0)?;
    Ok(())
}

fn validate_trading(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if let Some(symbol) = config.get_string("trading", "symbol") {
        if symbol.trim().is_empty() {
            return Err(invalid("trading", "symbol", "symbol must not be empty"));
        }
    }
    positive(config, "trading", "lot_size", 0.1)?;
    for key in [
        "long_open_threshold",
        "long_close_threshold",
        "short_open_threshold",
        "short_close_threshold",
        "stop_loss",
        "take_profit",
    ] {
        non_negative(config, "trading", key, 0.0)?;
    }
    Ok(())
}

fn validate_signal(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    for key in ["bands_timeframe", "rsi_timeframe", "stochastic_timeframe"] {
        bar_timeframe(config, "signal", key)?;
    }
    at_least_one(config, "signal", "bands_window", 7)?;
    at_least_one(config, "signal", "rsi_period", 13)?;
    at_least_one(config, "signal", "stochastic_period", 14)?;
    at_least_one(config, "signal", "stochastic_smooth", 3)?;
    non_negative(config, "signal", "bands_dev", 2.0)?;
    Ok(())
}
