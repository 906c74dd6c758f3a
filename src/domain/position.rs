//! Position tracking for the ledger.

use chrono::NaiveDateTime;

use super::tick::Quote;

/// One position, open or finalized.
///
/// `unrealized_pnl` is in price units per unit of volume: `bid - entry` for
/// longs, `entry - ask` for shorts. Currency P&L is
/// `volume × unrealized_pnl × lot_in_units`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub volume: f64,
    pub is_long: bool,
    pub take_profit_pips: f64,
    pub stop_loss_pips: f64,
    pub unrealized_pnl: f64,
    pub is_open: bool,
    pub open_time: Option<NaiveDateTime>,
    pub open_comment: String,
    pub close_time: Option<NaiveDateTime>,
    pub close_comment: Option<String>,
    pub exit_price: Option<f64>,
    pub realized_pnl: Option<f64>,
}

impl Position {
    pub fn is_short(&self) -> bool {
        !self.is_long
    }

    /// Price-unit P&L against `quote`: longs exit at the bid, shorts at the ask.
    pub fn pnl_at(&self, quote: Quote) -> f64 {
        if self.is_long {
            quote.bid - self.entry_price
        } else {
            self.entry_price - quote.ask
        }
    }

    pub fn mark(&mut self, quote: Quote) -> f64 {
        self.unrealized_pnl = self.pnl_at(quote);
        self.unrealized_pnl
    }

    /// Currency value of the current P&L.
    pub fn exposure(&self, lot_in_units: f64) -> f64 {
        self.volume * self.unrealized_pnl * lot_in_units
    }

    pub fn should_take_profit(&self, point: f64) -> bool {
        self.unrealized_pnl > self.take_profit_pips * point
    }

    pub fn should_stop_loss(&self, point: f64) -> bool {
        self.unrealized_pnl < -self.stop_loss_pips * point
    }

    pub fn should_force_close(&self, point: f64) -> bool {
        self.should_take_profit(point) || self.should_stop_loss(point)
    }

    /// Price at which the last mark would close the position.
    pub fn implied_exit_price(&self) -> f64 {
        if self.is_long {
            self.entry_price + self.unrealized_pnl
        } else {
            self.entry_price - self.unrealized_pnl
        }
    }

    pub(crate) fn finalize(
        &mut self,
        time: Option<NaiveDateTime>,
        comment: &str,
        realized: f64,
        exit_decimals: i32,
    ) {
        self.is_open = false;
        self.close_time = time;
        self.close_comment = Some(comment.to_string());
        self.exit_price = Some(super::tick::round_to(
            self.implied_exit_price(),
            exit_decimals,
        ));
        self.realized_pnl = Some(realized);
    }
}
