//! Account ledger: positions, P&L, equity and TP/SL enforcement.
//!
//! Each symbol moves `Flat -> Open -> Flat`. A global on/off switch gates
//! `open` and `close`; while off they return [`Rejection::BrokerOff`].
//!
//! Prices are rounded to five decimals before any P&L arithmetic. The equity
//! identity holds after every mutation:
//!
//! ```text
//! equity = balance + Σ volume × unrealized_pnl × lot_in_units
//! ```

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

use super::error::{Rejection, ReplayError};
use super::position::Position;
use super::tick::{Quote, round_to};

pub const PRICE_DECIMALS: i32 = 5;
pub const FORCED_CLOSE_COMMENT: &str = "TP/SL reached";

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AccountParams {
    pub balance: f64,
    pub leverage: f64,
    pub point: f64,
    pub lot_in_units: f64,
}

impl Default for AccountParams {
    fn default() -> Self {
        AccountParams {
            balance: 10_000.0,
            leverage: 30.0,
            point: 1.0,
            lot_in_units: 1.0,
        }
    }
}

/// Arguments of an `open` action.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub is_long: bool,
    pub take_profit_pips: f64,
    pub stop_loss_pips: f64,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub balance: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LedgerSnapshot {
    pub positions: Vec<Position>,
    pub quotes: BTreeMap<String, Quote>,
    pub balance: f64,
    pub equity: f64,
    pub realized_pl: f64,
    pub leverage: f64,
    pub point: f64,
    pub lot_in_units: f64,
    pub total_trade_count: usize,
    pub trades: Vec<Position>,
    pub is_on: bool,
    pub is_live: bool,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    params: AccountParams,
    balance: f64,
    equity: f64,
    realized_pl: f64,
    total_trade_count: usize,
    positions: BTreeMap<String, Position>,
    trades: Vec<Position>,
    open_trade_index: HashMap<String, usize>,
    last_quotes: BTreeMap<String, Quote>,
    equity_curve: Vec<EquityPoint>,
    is_on: bool,
    is_live: bool,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new(AccountParams::default())
    }
}

impl Ledger {
    /// A switched-off ledger with no history.
    pub fn new(params: AccountParams) -> Self {
        Ledger {
            params,
            balance: params.balance,
            equity: params.balance,
            realized_pl: 0.0,
            total_trade_count: 0,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            open_trade_index: HashMap::new(),
            last_quotes: BTreeMap::new(),
            equity_curve: Vec::new(),
            is_on: false,
            is_live: false,
        }
    }

    /// Drop positions, history, P&L and counters, then apply `params`.
    pub fn prepare_account(&mut self, params: AccountParams) {
        let (is_on, is_live) = (self.is_on, self.is_live);
        *self = Ledger::new(params);
        self.is_on = is_on;
        self.is_live = is_live;
        tracing::info!(
            balance = params.balance,
            leverage = params.leverage,
            point = params.point,
            lot_in_units = params.lot_in_units,
            "account prepared"
        );
    }

    pub fn set_balance(&mut self, balance: f64) {
        self.balance = balance;
        self.recompute_equity();
    }

    pub fn set_on(&mut self, on: bool) {
        self.is_on = on;
    }

    pub fn set_live(&mut self, live: bool) {
        self.is_live = live;
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn params(&self) -> AccountParams {
        self.params
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn realized_pl(&self) -> f64 {
        self.realized_pl
    }

    pub fn total_trade_count(&self) -> usize {
        self.total_trade_count
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[Position] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn last_quote(&self, symbol: &str) -> Option<Quote> {
        self.last_quotes.get(symbol).copied()
    }

    /// Remember `quote` for `symbol` and return the effective quote: the new
    /// one when present, else the last one seen.
    pub fn record_quote(&mut self, symbol: &str, quote: Option<Quote>) -> Option<Quote> {
        match quote {
            Some(q) => {
                let q = q.rounded(PRICE_DECIMALS);
                self.last_quotes.insert(symbol.to_string(), q);
                Some(q)
            }
            None => self.last_quote(symbol),
        }
    }

    /// Open a position at `order.price`.
    ///
    /// The initial P&L is the spread-crossing cost against the last known
    /// quote, so the equity dips by the spread right away.
    pub fn open(
        &mut self,
        order: OpenOrder,
        now: Option<NaiveDateTime>,
    ) -> Result<(), Rejection> {
        if !self.is_on {
            return Err(Rejection::BrokerOff);
        }
        if order.volume.is_nan() || order.volume <= 0.0 {
            return Err(Rejection::InvalidVolume {
                volume: order.volume,
            });
        }
        if self.positions.contains_key(&order.symbol) {
            return Err(Rejection::AlreadyOpen {
                symbol: order.symbol,
            });
        }
        let Some(quote) = self.last_quote(&order.symbol) else {
            return Err(Rejection::NoMarketPrice {
                symbol: order.symbol,
            });
        };
        if !order.price.is_finite() {
            return Err(Rejection::NoMarketPrice {
                symbol: order.symbol,
            });
        }

        let mut position = Position {
            symbol: order.symbol.clone(),
            entry_price: round_to(order.price, PRICE_DECIMALS),
            volume: order.volume,
            is_long: order.is_long,
            take_profit_pips: order.take_profit_pips,
            stop_loss_pips: order.stop_loss_pips,
            unrealized_pnl: 0.0,
            is_open: true,
            open_time: now,
            open_comment: order.comment,
            close_time: None,
            close_comment: None,
            exit_price: None,
            realized_pnl: None,
        };
        position.mark(quote);

        tracing::info!(
            symbol = %position.symbol,
            price = position.entry_price,
            volume = position.volume,
            is_long = position.is_long,
            "position opened"
        );

        self.total_trade_count += 1;
        self.open_trade_index
            .insert(order.symbol.clone(), self.trades.len());
        self.trades.push(position.clone());
        self.positions.insert(order.symbol, position);
        self.recompute_equity();
        Ok(())
    }

    /// Close the open position for `symbol`, realizing its last marked P&L.
    pub fn close(
        &mut self,
        symbol: &str,
        comment: &str,
        now: Option<NaiveDateTime>,
    ) -> Result<Position, Rejection> {
        if !self.is_on {
            return Err(Rejection::BrokerOff);
        }
        let Some(mut position) = self.positions.remove(symbol) else {
            return Err(Rejection::NoOpenPosition {
                symbol: symbol.to_string(),
            });
        };

        let realized = position.exposure(self.params.lot_in_units);
        self.balance += realized;
        self.realized_pl += realized;
        position.finalize(now, comment, realized, PRICE_DECIMALS);

        if let Some(i) = self.open_trade_index.remove(symbol) {
            if let Some(entry) = self.trades.get_mut(i) {
                *entry = position.clone();
            }
        }
        self.recompute_equity();

        tracing::info!(
            symbol,
            comment,
            realized,
            balance = self.balance,
            "position closed"
        );
        Ok(position)
    }

    /// Explicit no-op action.
    pub fn hold(&self) {}

    /// Re-mark every open position and force-close those past TP/SL.
    ///
    /// `resolve` supplies a fresh quote per symbol; when it has none the last
    /// known quote is reused. A position with no quote at all is an invariant
    /// violation. Returns the positions that were force-closed.
    pub fn mark_to_market<F>(
        &mut self,
        now: NaiveDateTime,
        mut resolve: F,
    ) -> Result<Vec<Position>, ReplayError>
    where
        F: FnMut(&str) -> Result<Option<Quote>, ReplayError>,
    {
        let symbols: Vec<String> = self.positions.keys().cloned().collect();
        let point = self.params.point;
        let mut triggered: Vec<String> = Vec::new();

        for symbol in symbols {
            let fresh = resolve(&symbol)?;
            let quote = self
                .record_quote(&symbol, fresh)
                .ok_or_else(|| ReplayError::NoQuote {
                    symbol: symbol.clone(),
                    timestamp: now,
                })?;

            let Some(position) = self.positions.get_mut(&symbol) else {
                continue;
            };
            position.mark(quote);
            if position.should_force_close(point) {
                triggered.push(symbol.clone());
            }
            if let Some(entry) = self
                .open_trade_index
                .get(&symbol)
                .and_then(|&i| self.trades.get_mut(i))
            {
                entry.unrealized_pnl = position.unrealized_pnl;
            }
        }
        self.recompute_equity();

        let mut closed = Vec::with_capacity(triggered.len());
        for symbol in triggered {
            match self.close(&symbol, FORCED_CLOSE_COMMENT, Some(now)) {
                Ok(position) => closed.push(position),
                Err(rejection) => {
                    tracing::warn!(symbol = %symbol, %rejection, "forced close refused");
                }
            }
        }
        Ok(closed)
    }

    /// Append the current balance and equity. A second record for the same
    /// timestamp replaces the first.
    pub fn record_equity(&mut self, timestamp: NaiveDateTime) {
        let point = EquityPoint {
            timestamp,
            balance: self.balance,
            equity: self.equity,
        };
        match self.equity_curve.last_mut() {
            Some(last) if last.timestamp == timestamp => *last = point,
            _ => self.equity_curve.push(point),
        }
    }

    fn recompute_equity(&mut self) {
        let lot = self.params.lot_in_units;
        let open: f64 = self.positions.values().map(|p| p.exposure(lot)).sum();
        self.equity = self.balance + open;
    }

    /// Verify `equity = balance + Σ exposure` and that every open position
    /// has an open entry in the trade history.
    pub fn check_equity_identity(&self) -> Result<(), ReplayError> {
        let lot = self.params.lot_in_units;
        let open: f64 = self.positions.values().map(|p| p.exposure(lot)).sum();
        let expected = self.balance + open;
        let tolerance = 1e-9 * expected.abs().max(1.0);
        if (self.equity - expected).abs() > tolerance {
            return Err(ReplayError::Invariant {
                reason: format!("equity {} != balance + open exposure {}", self.equity, expected),
            });
        }
        for symbol in self.positions.keys() {
            let tracked = self
                .open_trade_index
                .get(symbol)
                .and_then(|&i| self.trades.get(i))
                .is_some_and(|t| t.is_open);
            if !tracked {
                return Err(ReplayError::Invariant {
                    reason: format!("open position {symbol} missing from trade history"),
                });
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            positions: self.positions.values().cloned().collect(),
            quotes: self.last_quotes.clone(),
            balance: self.balance,
            equity: self.equity,
            realized_pl: self.realized_pl,
            leverage: self.params.leverage,
            point: self.params.point,
            lot_in_units: self.params.lot_in_units,
            total_trade_count: self.total_trade_count,
            trades: self.trades.clone(),
            is_on: self.is_on,
            is_live: self.is_live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn fx_params() -> AccountParams {
        AccountParams {
            balance: 10_000.0,
            leverage: 30.0,
            point: 0.0001,
            lot_in_units: 100_000.0,
        }
    }

    fn quote(ask: f64, bid: f64) -> Option<Quote> {
        Some(Quote { ask, bid })
    }

    fn ledger_with_quote(ask: f64, bid: f64) -> Ledger {
        let mut ledger = Ledger::new(fx_params());
        ledger.set_on(true);
        ledger.record_quote("EURUSD", quote(ask, bid));
        ledger
    }

    fn long_order(price: f64) -> OpenOrder {
        OpenOrder {
            symbol: "EURUSD".into(),
            price,
            volume: 0.1,
            is_long: true,
            take_profit_pips: 300.0,
            stop_loss_pips: 100.0,
            comment: "test".into(),
        }
    }

    fn short_order(price: f64) -> OpenOrder {
        OpenOrder {
            is_long: false,
            ..long_order(price)
        }
    }

    fn assert_equity_identity(ledger: &Ledger) {
        let lot = ledger.params().lot_in_units;
        let open: f64 = ledger.positions().map(|p| p.exposure(lot)).sum();
        assert_relative_eq!(ledger.equity(), ledger.balance() + open, epsilon = 1e-9);
    }

    #[test]
    fn defaults_match_account_params() {
        let ledger = Ledger::default();
        assert_eq!(ledger.balance(), 10_000.0);
        assert_eq!(ledger.equity(), 10_000.0);
        assert_eq!(ledger.params().leverage, 30.0);
        assert_eq!(ledger.params().point, 1.0);
        assert!(!ledger.is_on());
        assert!(!ledger.is_live());
    }

    #[test]
    fn open_rejected_while_off() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.set_on(false);
        let err = ledger.open(long_order(1.1002), Some(ts(0))).unwrap_err();
        assert_eq!(err, Rejection::BrokerOff);
        assert_eq!(ledger.total_trade_count(), 0);
    }

    #[test]
    fn close_rejected_while_off() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        ledger.set_on(false);
        assert_eq!(
            ledger.close("EURUSD", "x", Some(ts(1))).unwrap_err(),
            Rejection::BrokerOff
        );
        assert!(ledger.position("EURUSD").is_some());
    }

    #[test]
    fn open_without_quote_is_rejected() {
        let mut ledger = Ledger::new(fx_params());
        ledger.set_on(true);
        let err = ledger.open(long_order(1.1), None).unwrap_err();
        assert_eq!(
            err,
            Rejection::NoMarketPrice {
                symbol: "EURUSD".into()
            }
        );
    }

    #[test]
    fn open_twice_is_rejected() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        let err = ledger.open(short_order(1.1000), Some(ts(0))).unwrap_err();
        assert!(matches!(err, Rejection::AlreadyOpen { .. }));
        assert_eq!(ledger.total_trade_count(), 1);
    }

    #[test]
    fn open_rejects_non_positive_volume() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        let order = OpenOrder {
            volume: 0.0,
            ..long_order(1.1002)
        };
        assert!(matches!(
            ledger.open(order, None),
            Err(Rejection::InvalidVolume { .. })
        ));
    }

    #[test]
    fn open_long_seeds_spread_cost() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();

        let pos = ledger.position("EURUSD").unwrap();
        assert_relative_eq!(pos.unrealized_pnl, -0.0002, epsilon = 1e-12);
        assert_relative_eq!(ledger.equity(), 10_000.0 - 2.0, epsilon = 1e-9);
        assert_eq!(ledger.balance(), 10_000.0);
        assert_eq!(ledger.total_trade_count(), 1);
        assert_eq!(ledger.trades().len(), 1);
        assert!(ledger.trades()[0].is_open);
    }

    #[test]
    fn open_short_seeds_spread_cost() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(short_order(1.1000), Some(ts(0))).unwrap();
        let pos = ledger.position("EURUSD").unwrap();
        assert_relative_eq!(pos.unrealized_pnl, -0.0002, epsilon = 1e-12);
    }

    #[test]
    fn close_folds_pnl_into_balance() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        ledger
            .mark_to_market(ts(1), |_| Ok(quote(1.1022, 1.1020)))
            .unwrap();
        assert_relative_eq!(ledger.equity(), 10_018.0, epsilon = 1e-6);

        let closed = ledger.close("EURUSD", "signal", Some(ts(2))).unwrap();
        assert_relative_eq!(ledger.balance(), 10_018.0, epsilon = 1e-6);
        assert_relative_eq!(ledger.equity(), ledger.balance(), epsilon = 1e-9);
        assert_relative_eq!(ledger.realized_pl(), 18.0, epsilon = 1e-6);
        assert!(ledger.position("EURUSD").is_none());
        assert!(!closed.is_open);
        assert_eq!(closed.close_time, Some(ts(2)));
        assert_eq!(closed.exit_price, Some(1.102));

        let trade = &ledger.trades()[0];
        assert!(!trade.is_open);
        assert_eq!(trade.close_comment.as_deref(), Some("signal"));
    }

    #[test]
    fn close_flat_symbol_is_rejected() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        let err = ledger.close("EURUSD", "x", None).unwrap_err();
        assert_eq!(
            err,
            Rejection::NoOpenPosition {
                symbol: "EURUSD".into()
            }
        );
    }

    #[test]
    fn take_profit_forces_close_in_same_step() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();

        // +301 pips on the bid
        let closed = ledger
            .mark_to_market(ts(5), |_| Ok(quote(1.1305, 1.1303)))
            .unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].close_comment.as_deref(), Some(FORCED_CLOSE_COMMENT));
        assert!(ledger.position("EURUSD").is_none());
        assert!(ledger.realized_pl() > 0.0);
        assert_equity_identity(&ledger);
    }

    #[test]
    fn stop_loss_forces_close_for_short() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(short_order(1.1000), Some(ts(0))).unwrap();

        let closed = ledger
            .mark_to_market(ts(5), |_| Ok(quote(1.1101, 1.1099)))
            .unwrap();
        assert_eq!(closed.len(), 1);
        assert!(ledger.realized_pl() < 0.0);
        assert_eq!(ledger.trades()[0].close_time, Some(ts(5)));
    }

    #[test]
    fn mark_reuses_last_known_quote() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        let closed = ledger.mark_to_market(ts(1), |_| Ok(None)).unwrap();
        assert!(closed.is_empty());
        assert_relative_eq!(
            ledger.position("EURUSD").unwrap().unrealized_pnl,
            -0.0002,
            epsilon = 1e-12
        );
    }

    #[test]
    fn mark_without_any_quote_is_fatal() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        ledger.last_quotes.clear();
        let err = ledger.mark_to_market(ts(1), |_| Ok(None)).unwrap_err();
        assert!(matches!(err, ReplayError::NoQuote { .. }));
    }

    #[test]
    fn mark_propagates_resolver_errors() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        let err = ledger
            .mark_to_market(ts(1), |s| {
                Err(ReplayError::NotLoaded {
                    symbol: s.to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, ReplayError::NotLoaded { .. }));
    }

    #[test]
    fn equity_identity_with_several_positions() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.record_quote("GBPUSD", quote(1.2703, 1.2700));
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        ledger
            .open(
                OpenOrder {
                    symbol: "GBPUSD".into(),
                    ..short_order(1.2700)
                },
                Some(ts(0)),
            )
            .unwrap();
        ledger
            .mark_to_market(ts(1), |s| {
                Ok(if s == "EURUSD" {
                    quote(1.1012, 1.1010)
                } else {
                    quote(1.2710, 1.2707)
                })
            })
            .unwrap();
        assert_equity_identity(&ledger);
        ledger.close("EURUSD", "x", Some(ts(2))).unwrap();
        assert_equity_identity(&ledger);
        assert_eq!(ledger.open_position_count(), 1);
    }

    #[test]
    fn prices_are_rounded_to_five_decimals() {
        let mut ledger = Ledger::new(fx_params());
        ledger.set_on(true);
        let q = ledger
            .record_quote("EURUSD", quote(1.1000200000001, 1.0999999999999))
            .unwrap();
        assert_eq!(q.ask, 1.10002);
        assert_eq!(q.bid, 1.1);
        ledger.open(long_order(1.100020000004), None).unwrap();
        assert_eq!(ledger.position("EURUSD").unwrap().entry_price, 1.10002);
    }

    #[test]
    fn prepare_account_resets_history() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.set_live(true);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        ledger.record_equity(ts(0));

        ledger.prepare_account(AccountParams {
            balance: 5_000.0,
            ..fx_params()
        });
        assert_eq!(ledger.balance(), 5_000.0);
        assert_eq!(ledger.equity(), 5_000.0);
        assert_eq!(ledger.total_trade_count(), 0);
        assert!(ledger.trades().is_empty());
        assert!(ledger.equity_curve().is_empty());
        assert!(ledger.last_quote("EURUSD").is_none());
        assert!(ledger.is_on());
        assert!(ledger.is_live());
    }

    #[test]
    fn set_balance_moves_equity() {
        let mut ledger = Ledger::new(fx_params());
        ledger.set_balance(2_500.0);
        assert_eq!(ledger.balance(), 2_500.0);
        assert_eq!(ledger.equity(), 2_500.0);
    }

    #[test]
    fn snapshot_reports_state() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        let snap = ledger.snapshot();
        assert_eq!(snap.positions.len(), 1);
        assert_eq!(snap.trades.len(), 1);
        assert_eq!(snap.total_trade_count, 1);
        assert_eq!(snap.quotes.get("EURUSD").map(|q| q.bid), Some(1.1));
        assert_eq!(snap.leverage, 30.0);
        assert!(snap.is_on);
        assert!(!snap.is_live);
    }

    #[test]
    fn equity_identity_check_passes_after_mutations() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        assert!(ledger.check_equity_identity().is_ok());
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        assert!(ledger.check_equity_identity().is_ok());
        ledger.close("EURUSD", "done", Some(ts(1))).unwrap();
        assert!(ledger.check_equity_identity().is_ok());
    }

    #[test]
    fn equity_identity_check_detects_drift() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        ledger.equity += 1.0;
        assert!(matches!(
            ledger.check_equity_identity(),
            Err(ReplayError::Invariant { .. })
        ));
    }

    #[test]
    fn record_equity_keeps_one_point_per_timestamp() {
        let mut ledger = ledger_with_quote(1.1002, 1.1000);
        ledger.record_equity(ts(0));
        ledger.open(long_order(1.1002), Some(ts(0))).unwrap();
        ledger.record_equity(ts(0));
        ledger.record_equity(ts(1));

        let curve = ledger.equity_curve();
        assert_eq!(curve.len(), 2);
        assert!(curve[0].equity < curve[0].balance);
        assert_eq!(curve[1].timestamp, ts(1));
    }
}
