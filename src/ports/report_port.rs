//! Report generation port trait.

use std::path::Path;

use crate::domain::error::ReplayError;
use crate::domain::ledger::EquityPoint;
use crate::domain::position::Position;
use crate::domain::simulator::ReplaySummary;

/// Port for writing replay results into an output directory.
pub trait ReportPort {
    fn write_trades(&self, trades: &[Position], output_dir: &Path) -> Result<(), ReplayError>;

    fn write_equity(&self, curve: &[EquityPoint], output_dir: &Path) -> Result<(), ReplayError>;

    fn write_summary(&self, summary: &ReplaySummary, output_dir: &Path) -> Result<(), ReplayError>;

    /// Default implementation: trades, equity curve, then summary.
    fn write_all(
        &self,
        summary: &ReplaySummary,
        trades: &[Position],
        curve: &[EquityPoint],
        output_dir: &Path,
    ) -> Result<(), ReplayError> {
        self.write_trades(trades, output_dir)?;
        self.write_equity(curve, output_dir)?;
        self.write_summary(summary, output_dir)
    }
}
