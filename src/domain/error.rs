//! Domain error types.
//!
//! Two families live here. [`ReplayError`] is fatal: configuration mistakes,
//! unreadable data and broken ledger invariants stop the replay. [`Rejection`]
//! is an expected control-flow outcome of a broker action and is returned
//! inside `Ok(..)` so the decision loop can simply hold.

use chrono::NaiveDateTime;

/// Fatal error for the replay kernel and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("invalid date format {value}")]
    InvalidDate { value: String },

    #[error("invalid frequency {value}")]
    UnsupportedFrequency { value: String },

    #[error("invalid replay range: start {start} must be before end {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("symbol {symbol} not loaded")]
    NotLoaded { symbol: String },

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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no ask or bid resolvable for {symbol} at {timestamp}")]
    NoQuote {
        symbol: String,
        timestamp: NaiveDateTime,
    },

    #[error("ledger invariant violated: {reason}")]
    Invariant { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReplayError::InvalidDate { .. }
                | ReplayError::UnsupportedFrequency { .. }
                | ReplayError::InvalidRange { .. }
                | ReplayError::NotLoaded { .. }
                | ReplayError::ConfigParse { .. }
                | ReplayError::ConfigMissing { .. }
                | ReplayError::ConfigInvalid { .. }
        )
    }
}

impl From<&ReplayError> for std::process::ExitCode {
    fn from(err: &ReplayError) -> Self {
        let code: u8 = match err {
            ReplayError::Io(_) => 1,
            ReplayError::InvalidDate { .. }
            | ReplayError::UnsupportedFrequency { .. }
            | ReplayError::InvalidRange { .. }
            | ReplayError::NotLoaded { .. }
            | ReplayError::ConfigParse { .. }
            | ReplayError::ConfigMissing { .. }
            | ReplayError::ConfigInvalid { .. } => 2,
            ReplayError::Data { .. } => 3,
            ReplayError::NoQuote { .. } | ReplayError::Invariant { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

/// A broker action that was refused. Not an error from the kernel's point of view.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("Broker is off")]
    BrokerOff,

    #[error("no open position for {symbol}")]
    NoOpenPosition { symbol: String },

    #[error("position already open for {symbol}")]
    AlreadyOpen { symbol: String },

    #[error("no market price for {symbol}")]
    NoMarketPrice { symbol: String },

    #[error("volume must be positive, got {volume}")]
    InvalidVolume { volume: f64 },
}
