//! CSV report adapter: `trades.csv`, `equity.csv` and `summary.csv`.

use csv::Writer;
use std::fs;
use std::path::Path;

use crate::domain::error::ReplayError;
use crate::domain::ledger::EquityPoint;
use crate::domain::position::Position;
use crate::domain::simulator::ReplaySummary;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn writer(output_dir: &Path, name: &str) -> Result<Writer<fs::File>, ReplayError> {
        fs::create_dir_all(output_dir)?;
        Writer::from_path(output_dir.join(name)).map_err(csv_error)
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn csv_error(e: csv::Error) -> ReplayError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => ReplayError::Io(io),
        other => ReplayError::Data {
            reason: format!("CSV write error: {:?}", other),
        },
    }
}

fn opt_time(ts: Option<chrono::NaiveDateTime>) -> String {
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

fn opt_num(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write_trades(&self, trades: &[Position], output_dir: &Path) -> Result<(), ReplayError> {
        let mut wtr = Self::writer(output_dir, "trades.csv")?;
        wtr.write_record([
            "symbol",
            "side",
            "volume",
            "entry_price",
            "exit_price",
            "open_time",
            "close_time",
            "take_profit_pips",
            "stop_loss_pips",
            "unrealized_pnl",
            "realized_pnl",
            "open_comment",
            "close_comment",
        ])
        .map_err(csv_error)?;

        for t in trades {
            wtr.write_record([
                t.symbol.as_str(),
                if t.is_long { "long" } else { "short" },
                &t.volume.to_string(),
                &format!("{:.5}", t.entry_price),
                &opt_num(t.exit_price, 5),
                &opt_time(t.open_time),
                &opt_time(t.close_time),
                &t.take_profit_pips.to_string(),
                &t.stop_loss_pips.to_string(),
                &format!("{:.5}", t.unrealized_pnl),
                &opt_num(t.realized_pnl, 2),
                t.open_comment.as_str(),
                t.close_comment.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_equity(&self, curve: &[EquityPoint], output_dir: &Path) -> Result<(), ReplayError> {
        let mut wtr = Self::writer(output_dir, "equity.csv")?;
        wtr.write_record(["timestamp", "balance", "equity"])
            .map_err(csv_error)?;
        for p in curve {
            wtr.write_record([
                p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                format!("{:.2}", p.balance),
                format!("{:.2}", p.equity),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(&self, summary: &ReplaySummary, output_dir: &Path) -> Result<(), ReplayError> {
        let m = &summary.metrics;
        let rows: [(&str, String); 14] = [
            ("steps", summary.steps.to_string()),
            ("trades", summary.trades.to_string()),
            ("forced_closes", summary.forced_closes.to_string()),
            ("rejections", summary.rejections.to_string()),
            ("balance", format!("{:.2}", summary.balance)),
            ("equity", format!("{:.2}", summary.equity)),
            ("realized_pl", format!("{:.2}", summary.realized_pl)),
            ("total_return", format!("{:.6}", m.total_return)),
            ("max_drawdown", format!("{:.6}", m.max_drawdown)),
            ("max_drawdown_steps", m.max_drawdown_steps.to_string()),
            ("win_rate", format!("{:.4}", m.win_rate)),
            ("profit_factor", format!("{:.4}", m.profit_factor)),
            ("avg_win", format!("{:.2}", m.avg_win)),
            ("avg_loss", format!("{:.2}", m.avg_loss)),
        ];

        let mut wtr = Self::writer(output_dir, "summary.csv")?;
        wtr.write_record(["metric", "value"]).map_err(csv_error)?;
        for (key, value) in rows {
            wtr.write_record([key, value.as_str()]).map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
