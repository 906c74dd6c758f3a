//! Threshold decision policy.
//!
//! A pure mapping from `{signal, position, quote, config}` to an [`Action`]:
//!
//! 1. neutral signal: hold
//! 2. position open: close a long once direction <= -long_close, close a
//!    short once direction >= short_close
//! 3. flat: open long at the ask once direction >= long_open, open short at
//!    the bid once direction <= -short_open
//! 4. anything else: hold

use super::config::TradingConfig;
use super::ledger::OpenOrder;
use super::position::Position;
use super::signal::Signal;
use super::tick::Quote;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open(OpenOrder),
    Close { symbol: String, comment: String },
    Hold,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Open(_) => "open",
            Action::Close { .. } => "close",
            Action::Hold => "hold",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPolicy {
    config: TradingConfig,
}

impl DecisionPolicy {
    pub fn new(config: TradingConfig) -> Self {
        DecisionPolicy { config }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// `position` is the open position for the configured symbol, if any;
    /// `quote` is the current market for that symbol.
    pub fn decide(&self, signal: &Signal, position: Option<&Position>, quote: Option<Quote>) -> Action {
        if signal.is_neutral() {
            return Action::Hold;
        }
        let cfg = &self.config;
        let direction = signal.direction;

        if let Some(position) = position.filter(|p| p.is_open) {
            let exit_long = position.is_long && direction <= -cfg.long_close_threshold;
            let exit_short = !position.is_long && direction >= cfg.short_close_threshold;
            if exit_long || exit_short {
                return Action::Close {
                    symbol: cfg.symbol.clone(),
                    comment: signal.comment.clone(),
                };
            }
            return Action::Hold;
        }

        let Some(quote) = quote else {
            return Action::Hold;
        };
        let take_profit_pips = signal.take_profit_pips.unwrap_or(cfg.take_profit);
        let stop_loss_pips = signal.stop_loss_pips.unwrap_or(cfg.stop_loss);

        let (is_long, price) = if direction >= cfg.long_open_threshold {
            (true, quote.ask)
        } else if direction <= -cfg.short_open_threshold {
            (false, quote.bid)
        } else {
            return Action::Hold;
        };

        Action::Open(OpenOrder {
            symbol: cfg.symbol.clone(),
            price,
            volume: cfg.lot_size,
            is_long,
            take_profit_pips,
            stop_loss_pips,
            comment: signal.comment.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn signal(direction: f64) -> Signal {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Signal::directional(ts, direction, "test".into(), "EURUSD")
    }

    fn quote() -> Option<Quote> {
        Some(Quote {
            ask: 1.1002,
            bid: 1.1000,
        })
    }

    fn position(is_long: bool) -> Position {
        Position {
            symbol: "EURUSD".into(),
            entry_price: 1.1,
            volume: 0.1,
            is_long,
            take_profit_pips: 300.0,
            stop_loss_pips: 100.0,
            unrealized_pnl: 0.0,
            is_open: true,
            open_time: None,
            open_comment: String::new(),
            close_time: None,
            close_comment: None,
            exit_price: None,
            realized_pnl: None,
        }
    }

    fn policy() -> DecisionPolicy {
        DecisionPolicy::new(TradingConfig::default())
    }

    #[test]
    fn neutral_signal_holds() {
        let neutral = Signal::neutral(None, "EURUSD");
        assert_eq!(policy().decide(&neutral, None, quote()), Action::Hold);
    }

    #[test]
    fn strong_long_opens_at_ask() {
        match policy().decide(&signal(50.0), None, quote()) {
            Action::Open(order) => {
                assert!(order.is_long);
                assert_eq!(order.price, 1.1002);
                assert_eq!(order.volume, 0.1);
                assert_eq!(order.take_profit_pips, 300.0);
                assert_eq!(order.stop_loss_pips, 100.0);
                assert_eq!(order.comment, "test");
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn strong_short_opens_at_bid() {
        match policy().decide(&signal(-60.0), None, quote()) {
            Action::Open(order) => {
                assert!(!order.is_long);
                assert_eq!(order.price, 1.1000);
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn weak_signal_holds_when_flat() {
        assert_eq!(policy().decide(&signal(49.9), None, quote()), Action::Hold);
        assert_eq!(policy().decide(&signal(-49.9), None, quote()), Action::Hold);
    }

    #[test]
    fn flat_without_quote_holds() {
        assert_eq!(policy().decide(&signal(90.0), None, None), Action::Hold);
    }

    #[test]
    fn signal_overrides_tp_sl() {
        let mut s = signal(80.0);
        s.take_profit_pips = Some(50.0);
        s.stop_loss_pips = Some(20.0);
        match policy().decide(&s, None, quote()) {
            Action::Open(order) => {
                assert_eq!(order.take_profit_pips, 50.0);
                assert_eq!(order.stop_loss_pips, 20.0);
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn long_closes_on_opposite_signal() {
        let pos = position(true);
        let action = policy().decide(&signal(-30.0), Some(&pos), quote());
        assert_eq!(
            action,
            Action::Close {
                symbol: "EURUSD".into(),
                comment: "test".into()
            }
        );
        assert_eq!(
            policy().decide(&signal(-29.0), Some(&pos), quote()),
            Action::Hold
        );
    }

    #[test]
    fn short_closes_on_opposite_signal() {
        let pos = position(false);
        assert_eq!(
            policy().decide(&signal(30.0), Some(&pos), quote()).kind(),
            "close"
        );
        assert_eq!(
            policy().decide(&signal(-100.0), Some(&pos), quote()),
            Action::Hold
        );
    }

    #[test]
    fn open_position_never_reopens() {
        let pos = position(true);
        assert_eq!(
            policy().decide(&signal(100.0), Some(&pos), quote()),
            Action::Hold
        );
    }

    #[test]
    fn asymmetric_thresholds() {
        let policy = DecisionPolicy::new(TradingConfig {
            long_open_threshold: 80.0,
            short_open_threshold: 20.0,
            ..TradingConfig::default()
        });
        assert_eq!(policy.decide(&signal(70.0), None, quote()), Action::Hold);
        assert_eq!(policy.decide(&signal(-25.0), None, quote()).kind(), "open");
    }
}
