//! CSV price data adapter.
//!
//! Three layouts are understood:
//! - `mt5_ticks`: MetaTrader 5 tick export, tab separated, columns looked up
//!   by name (`<DATE> <TIME> <BID> <ASK> <VOLUME>`). Blank cells repeat the
//!   previous row's value and timestamps are floored to the second.
//! - `mt5_bars`: MetaTrader 5 bar export (`<DATE> <TIME> <OPEN> <HIGH> <LOW>
//!   <CLOSE> <TICKVOL> <SPREAD>`). bid = close, ask = close + spread × point.
//! - `plain`: comma separated `timestamp,ask,bid[,volume]`.

use chrono::{NaiveDateTime, Timelike};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::config::{DEFAULT_BAR_POINT, DataFormat};
use crate::domain::error::ReplayError;
use crate::domain::tick::{Ohlc, Tick};
use crate::ports::data_port::DataPort;

const MT5_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y.%m.%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y.%m.%d %H:%M",
    "%Y-%m-%d %H:%M",
];

const PLAIN_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y.%m.%d %H:%M:%S%.f",
];

pub struct CsvAdapter {
    point: f64,
}

impl Default for CsvAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BAR_POINT)
    }
}

impl CsvAdapter {
    /// `point` converts the `<SPREAD>` column of bar exports into a price.
    pub fn new(point: f64) -> Self {
        Self { point }
    }

    pub fn read_mt5_ticks<R: Read>(&self, reader: R) -> Result<Vec<Tick>, ReplayError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let date = column(&headers, "<DATE>")?;
        let time = column(&headers, "<TIME>")?;
        let ask_col = column(&headers, "<ASK>")?;
        let bid_col = column(&headers, "<BID>")?;
        let volume_col = headers.iter().position(|h| h == "<VOLUME>");

        let mut ask: Option<f64> = None;
        let mut bid: Option<f64> = None;
        let mut volume: Option<f64> = None;
        let mut ticks = Vec::new();
        let mut skipped = 0usize;

        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(csv_error)?;
            let line = i + 2;
            let raw = format!("{} {}", field(&record, date), field(&record, time));
            let timestamp = floor_to_second(parse_timestamp(&raw, MT5_TIMESTAMP_FORMATS, line)?);

            ask = number(&record, ask_col, "<ASK>", line)?.or(ask);
            bid = number(&record, bid_col, "<BID>", line)?.or(bid);
            if let Some(col) = volume_col {
                volume = number(&record, col, "<VOLUME>", line)?.or(volume);
            }

            match (ask, bid) {
                (Some(a), Some(b)) => ticks.push(Tick::new(timestamp, a, b, volume.unwrap_or(0.0))),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "rows before the first complete quote dropped");
        }
        Ok(ticks)
    }

    pub fn read_mt5_bars<R: Read>(&self, reader: R) -> Result<Vec<Tick>, ReplayError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let date = column(&headers, "<DATE>")?;
        let time = column(&headers, "<TIME>")?;
        let open = column(&headers, "<OPEN>")?;
        let high = column(&headers, "<HIGH>")?;
        let low = column(&headers, "<LOW>")?;
        let close = column(&headers, "<CLOSE>")?;
        let volume = column(&headers, "<TICKVOL>")?;
        let spread = column(&headers, "<SPREAD>")?;

        let mut ticks = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(csv_error)?;
            let line = i + 2;
            let raw = format!("{} {}", field(&record, date), field(&record, time));
            let timestamp = parse_timestamp(&raw, MT5_TIMESTAMP_FORMATS, line)?;

            let ohlc = Ohlc {
                open: required(&record, open, "<OPEN>", line)?,
                high: required(&record, high, "<HIGH>", line)?,
                low: required(&record, low, "<LOW>", line)?,
                close: required(&record, close, "<CLOSE>", line)?,
            };
            let spread = number(&record, spread, "<SPREAD>", line)?.unwrap_or(0.0);
            let volume = number(&record, volume, "<TICKVOL>", line)?.unwrap_or(0.0);

            let bid = ohlc.close;
            let ask = ohlc.close + spread * self.point;
            ticks.push(Tick::new(timestamp, ask, bid, volume).with_ohlc(ohlc));
        }
        Ok(ticks)
    }

    pub fn read_plain<R: Read>(&self, reader: R) -> Result<Vec<Tick>, ReplayError> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let ts_col = column(&headers, "timestamp")?;
        let ask_col = column(&headers, "ask")?;
        let bid_col = column(&headers, "bid")?;
        let volume_col = headers.iter().position(|h| h == "volume");

        let mut ticks = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(csv_error)?;
            let line = i + 2;
            let timestamp = parse_timestamp(field(&record, ts_col), PLAIN_TIMESTAMP_FORMATS, line)?;
            let ask = required(&record, ask_col, "ask", line)?;
            let bid = required(&record, bid_col, "bid", line)?;
            let volume = match volume_col {
                Some(col) => number(&record, col, "volume", line)?.unwrap_or(0.0),
                None => 0.0,
            };
            ticks.push(Tick::new(timestamp, ask, bid, volume));
        }
        Ok(ticks)
    }
}

impl DataPort for CsvAdapter {
    fn load_ticks(&self, path: &Path, format: DataFormat) -> Result<Vec<Tick>, ReplayError> {
        let file = File::open(path).map_err(|e| ReplayError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let ticks = match format {
            DataFormat::Mt5Ticks => self.read_mt5_ticks(file),
            DataFormat::Mt5Bars => self.read_mt5_bars(file),
            DataFormat::Plain => self.read_plain(file),
        }
        .map_err(|e| match e {
            ReplayError::Data { reason } => ReplayError::Data {
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })?;
        tracing::info!(path = %path.display(), %format, rows = ticks.len(), "price data read");
        Ok(ticks)
    }
}

fn csv_error(e: csv::Error) -> ReplayError {
    ReplayError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

fn column(headers: &StringRecord, name: &str) -> Result<usize, ReplayError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ReplayError::Data {
            reason: format!("missing {} column", name),
        })
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

/// Blank cell -> `None`.
fn number(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<Option<f64>, ReplayError> {
    let raw = field(record, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|e| ReplayError::Data {
        reason: format!("line {}: invalid {} value '{}': {}", line, name, raw, e),
    })
}

fn required(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64, ReplayError> {
    number(record, idx, name, line)?.ok_or_else(|| ReplayError::Data {
        reason: format!("line {}: missing {} value", line, name),
    })
}

fn parse_timestamp(raw: &str, formats: &[&str], line: usize) -> Result<NaiveDateTime, ReplayError> {
    let raw = raw.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ReplayError::Data {
            reason: format!("line {}: invalid timestamp '{}'", line, raw),
        })
}

fn floor_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}
