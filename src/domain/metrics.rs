//! Replay performance metrics.

use super::ledger::EquityPoint;
use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Metrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub max_drawdown_steps: usize,
    pub trades_closed: usize,
    pub trades_open: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Mean holding time of closed trades, in seconds.
    pub avg_trade_duration: f64,
}

impl Metrics {
    /// `trades` is the full history; only finalized entries count toward
    /// win/loss statistics.
    pub fn compute(initial_balance: f64, trades: &[Position], equity_curve: &[EquityPoint]) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_balance);

        let total_return = if initial_balance > 0.0 {
            (final_equity - initial_balance) / initial_balance
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_steps) = compute_drawdown(equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut trades_open = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_duration_secs = 0i64;

        for trade in trades {
            let Some(pnl) = trade.realized_pnl else {
                trades_open += 1;
                continue;
            };
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }

            if let (Some(open), Some(close)) = (trade.open_time, trade.close_time) {
                total_duration_secs += (close - open).num_seconds();
            }
        }

        let trades_closed = trades_won + trades_lost + trades_breakeven;
        let win_rate = if trades_closed > 0 {
            trades_won as f64 / trades_closed as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_trade_duration = if trades_closed > 0 {
            total_duration_secs as f64 / trades_closed as f64
        } else {
            0.0
        };

        Metrics {
            total_return,
            max_drawdown,
            max_drawdown_steps,
            trades_closed,
            trades_open,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_trade_duration,
        }
    }
}

/// Largest peak-to-trough equity decline as a fraction of the peak, and the
/// longest run of steps spent below a peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_steps = 0usize;
    let mut current_steps = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_steps = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            current_steps += 1;
            max_dd_steps = max_dd_steps.max(current_steps);
        }
    }

    (max_dd, max_dd_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn ts(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                timestamp: ts(i as i64),
                balance: equity,
                equity,
            })
            .collect()
    }

    fn trade(pnl: Option<f64>, minutes: i64) -> Position {
        Position {
            symbol: "EURUSD".into(),
            entry_price: 1.1,
            volume: 0.1,
            is_long: true,
            take_profit_pips: 300.0,
            stop_loss_pips: 100.0,
            unrealized_pnl: 0.0,
            is_open: pnl.is_none(),
            open_time: Some(ts(0)),
            open_comment: String::new(),
            close_time: pnl.map(|_| ts(minutes)),
            close_comment: pnl.map(|_| "x".to_string()),
            exit_price: None,
            realized_pnl: pnl,
        }
    }

    #[test]
    fn empty_history() {
        let m = Metrics::compute(10_000.0, &[], &[]);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.trades_closed, 0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
    }

    #[test]
    fn total_return_from_last_equity() {
        let m = Metrics::compute(10_000.0, &[], &curve(&[10_000.0, 10_500.0, 11_000.0]));
        assert_relative_eq!(m.total_return, 0.1);
    }

    #[test]
    fn drawdown_depth_and_length() {
        let m = Metrics::compute(
            100.0,
            &[],
            &curve(&[100.0, 120.0, 90.0, 96.0, 130.0, 117.0]),
        );
        assert_relative_eq!(m.max_drawdown, 0.25);
        assert_eq!(m.max_drawdown_steps, 2);
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![
            trade(Some(30.0), 10),
            trade(Some(-10.0), 20),
            trade(Some(10.0), 30),
            trade(Some(0.0), 40),
            trade(None, 0),
        ];
        let m = Metrics::compute(10_000.0, &trades, &[]);
        assert_eq!(m.trades_closed, 4);
        assert_eq!(m.trades_open, 1);
        assert_eq!(m.trades_won, 2);
        assert_eq!(m.trades_lost, 1);
        assert_eq!(m.trades_breakeven, 1);
        assert_relative_eq!(m.win_rate, 0.5);
        assert_relative_eq!(m.profit_factor, 4.0);
        assert_relative_eq!(m.avg_win, 20.0);
        assert_relative_eq!(m.avg_loss, 10.0);
        assert_relative_eq!(m.largest_win, 30.0);
        assert_relative_eq!(m.largest_loss, 10.0);
        assert_relative_eq!(m.avg_trade_duration, 1500.0);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let m = Metrics::compute(10_000.0, &[trade(Some(5.0), 1)], &[]);
        assert!(m.profit_factor.is_infinite());
    }
}
