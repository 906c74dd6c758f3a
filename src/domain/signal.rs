//! Directional trading signal.

use chrono::NaiveDateTime;

pub const NO_SIGNAL: &str = "No signal";

/// Fused indicator output for one symbol at one instant.
///
/// `direction` is nominally in [-100, 100]: positive favours long, negative
/// favours short. A neutral signal (`valid == false`) carries direction 0 and
/// the comment "No signal".
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Signal {
    pub timestamp: Option<NaiveDateTime>,
    pub direction: f64,
    pub take_profit_pips: Option<f64>,
    pub stop_loss_pips: Option<f64>,
    pub comment: String,
    pub symbol: String,
    pub valid: bool,
}

impl Signal {
    pub fn neutral(timestamp: Option<NaiveDateTime>, symbol: &str) -> Self {
        Signal {
            timestamp,
            direction: 0.0,
            take_profit_pips: None,
            stop_loss_pips: None,
            comment: NO_SIGNAL.to_string(),
            symbol: symbol.to_string(),
            valid: false,
        }
    }

    pub fn directional(
        timestamp: NaiveDateTime,
        direction: f64,
        comment: String,
        symbol: &str,
    ) -> Self {
        Signal {
            timestamp: Some(timestamp),
            direction,
            take_profit_pips: None,
            stop_loss_pips: None,
            comment,
            symbol: symbol.to_string(),
            valid: true,
        }
    }

    pub fn is_neutral(&self) -> bool {
        !self.valid
    }
}
