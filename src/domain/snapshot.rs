//! Aggregated read-only view of the replay kernel.

use super::clock::ClockSnapshot;
use super::ledger::LedgerSnapshot;
use super::signal_engine::SignalSnapshot;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct KernelSnapshot {
    pub clock: ClockSnapshot,
    pub ledger: LedgerSnapshot,
    pub signal: SignalSnapshot,
}

impl KernelSnapshot {
    /// Mid price of the last known quote for `symbol`.
    pub fn mid(&self, symbol: &str) -> Option<f64> {
        self.ledger
            .quotes
            .get(symbol)
            .map(|q| (q.ask + q.bid) / 2.0)
    }

    pub fn open_positions(&self) -> usize {
        self.ledger.positions.len()
    }
}
