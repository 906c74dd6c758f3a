//! Typed configuration snapshots.
//!
//! Built once from a [`ConfigPort`] at startup and handed to the kernel by
//! value. Nothing in the kernel reads the port afterwards.

use chrono::NaiveDateTime;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::clock::parse_datetime;
use super::error::ReplayError;
use super::ledger::AccountParams;
use super::signal_engine::SignalParams;
use super::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;

/// Trading rule parameters. Thresholds are direction magnitudes; TP/SL are pips.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TradingConfig {
    pub symbol: String,
    pub lot_size: f64,
    pub long_open_threshold: f64,
    pub long_close_threshold: f64,
    pub short_open_threshold: f64,
    pub short_close_threshold: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            symbol: "EURUSD".to_string(),
            lot_size: 0.1,
            long_open_threshold: 50.0,
            long_close_threshold: 30.0,
            short_open_threshold: 50.0,
            short_close_threshold: 30.0,
            stop_loss: 100.0,
            take_profit: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Mt5Ticks,
    Mt5Bars,
    Plain,
}

impl FromStr for DataFormat {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mt5_ticks" => Ok(DataFormat::Mt5Ticks),
            "mt5_bars" => Ok(DataFormat::Mt5Bars),
            "plain" => Ok(DataFormat::Plain),
            other => Err(ReplayError::ConfigInvalid {
                section: "data".to_string(),
                key: "format".to_string(),
                reason: format!("unknown data format '{other}', expected mt5_ticks, mt5_bars or plain"),
            }),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DataFormat::Mt5Ticks => "mt5_ticks",
            DataFormat::Mt5Bars => "mt5_bars",
            DataFormat::Plain => "plain",
        };
        f.write_str(label)
    }
}

pub const DEFAULT_BAR_POINT: f64 = 0.00001;

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub path: PathBuf,
    pub format: DataFormat,
    /// Price of one spread unit in MT5 bar exports.
    pub point: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayConfig {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub frequency: Timeframe,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data: Option<DataConfig>,
    pub replay: ReplayConfig,
    pub account: AccountParams,
    pub live: bool,
    pub trading: TradingConfig,
    pub signal: SignalParams,
}

impl AppConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, ReplayError> {
        Ok(AppConfig {
            data: data_config(config)?,
            replay: replay_config(config)?,
            account: account_params(config),
            live: config.get_bool("account", "live", false),
            trading: trading_config(config),
            signal: signal_params(config)?,
        })
    }
}

pub fn data_config(config: &dyn ConfigPort) -> Result<Option<DataConfig>, ReplayError> {
    let Some(path) = config.get_string("data", "path").filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };
    let format = match config.get_string("data", "format") {
        Some(f) => f.parse()?,
        None => DataFormat::Mt5Ticks,
    };
    Ok(Some(DataConfig {
        path: PathBuf::from(path.trim()),
        format,
        point: config.get_double("data", "point", DEFAULT_BAR_POINT),
    }))
}

pub fn replay_config(config: &dyn ConfigPort) -> Result<ReplayConfig, ReplayError> {
    let start = required_datetime(config, "replay", "start")?;
    let end = required_datetime(config, "replay", "end")?;
    let frequency = timeframe(config, "replay", "frequency", Timeframe::M1)?;
    Ok(ReplayConfig {
        start,
        end,
        frequency,
    })
}

pub fn account_params(config: &dyn ConfigPort) -> AccountParams {
    let defaults = AccountParams::default();
    AccountParams {
        balance: config.get_double("account", "balance", defaults.balance),
        leverage: config.get_double("account", "leverage", defaults.leverage),
        point: config.get_double("account", "point", defaults.point),
        lot_in_units: config.get_double("account", "lot_in_units", defaults.lot_in_units),
    }
}

pub fn trading_config(config: &dyn ConfigPort) -> TradingConfig {
    let d = TradingConfig::default();
    let num = |key: &str, default: f64| config.get_double("trading", key, default);
    TradingConfig {
        symbol: config
            .get_string("trading", "symbol")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(d.symbol),
        lot_size: num("lot_size", d.lot_size),
        long_open_threshold: num("long_open_threshold", d.long_open_threshold),
        long_close_threshold: num("long_close_threshold", d.long_close_threshold),
        short_open_threshold: num("short_open_threshold", d.short_open_threshold),
        short_close_threshold: num("short_close_threshold", d.short_close_threshold),
        stop_loss: num("stop_loss", d.stop_loss),
        take_profit: num("take_profit", d.take_profit),
    }
}

pub fn signal_params(config: &dyn ConfigPort) -> Result<SignalParams, ReplayError> {
    let d = SignalParams::default();
    Ok(SignalParams {
        bands_enabled: config.get_bool("signal", "bands", d.bands_enabled),
        bands_timeframe: timeframe(config, "signal", "bands_timeframe", d.bands_timeframe)?,
        bands_window: count(config, "bands_window", d.bands_window)?,
        bands_dev: config.get_double("signal", "bands_dev", d.bands_dev),
        rsi_enabled: config.get_bool("signal", "rsi", d.rsi_enabled),
        rsi_timeframe: timeframe(config, "signal", "rsi_timeframe", d.rsi_timeframe)?,
        rsi_period: count(config, "rsi_period", d.rsi_period)?,
        stochastic_enabled: config.get_bool("signal", "stochastic", d.stochastic_enabled),
        stochastic_timeframe: timeframe(
            config,
            "signal",
            "stochastic_timeframe",
            d.stochastic_timeframe,
        )?,
        stochastic_period: count(config, "stochastic_period", d.stochastic_period)?,
        stochastic_smooth: count(config, "stochastic_smooth", d.stochastic_smooth)?,
    })
}

/// A `[signal]` window or period: at least 1.
fn count(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, ReplayError> {
    let raw = config.get_int("signal", key, default as i64);
    usize::try_from(raw)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| ReplayError::ConfigInvalid {
            section: "signal".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be at least 1, got {raw}"),
        })
}

pub(crate) fn timeframe(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Timeframe,
) -> Result<Timeframe, ReplayError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ReplayError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("unsupported timeframe '{}'", value.trim()),
        }),
    }
}

pub(crate) fn required_datetime(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDateTime, ReplayError> {
    let value = config
        .get_string(section, key)
        .ok_or_else(|| ReplayError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })?;
    parse_datetime(value.trim())
}
