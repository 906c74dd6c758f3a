#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fxreplay::domain::config::DataFormat;
use fxreplay::domain::error::ReplayError;
use fxreplay::domain::ledger::AccountParams;
use fxreplay::domain::signal_engine::SignalParams;
use fxreplay::domain::tick::Tick;
use fxreplay::domain::timeframe::Timeframe;
use fxreplay::ports::data_port::DataPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Monday 2024-01-15 at `h:m:00`.
pub fn monday(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// One tick per minute from 10:00 with a fixed two-point spread.
pub fn minute_ticks(bids: &[f64]) -> Vec<Tick> {
    bids.iter()
        .enumerate()
        .map(|(i, &bid)| {
            Tick::new(
                monday(10, 0) + Duration::minutes(i as i64),
                bid + 0.0002,
                bid,
                1.0,
            )
        })
        .collect()
}

/// Bids of the reference ten-tick EURUSD session.
pub const SESSION_BIDS: [f64; 10] = [
    1.1000, 1.0990, 1.0995, 1.1005, 1.1010, 1.1000, 1.0990, 1.0985, 1.0995, 1.1000,
];

pub fn fx_account() -> AccountParams {
    AccountParams {
        balance: 10_000.0,
        leverage: 30.0,
        point: 0.0001,
        lot_in_units: 100_000.0,
    }
}

/// RSI(1) on M1 only: every down-tick votes +100, every up-tick -100.
pub fn rsi_one_minute() -> SignalParams {
    SignalParams {
        bands_enabled: false,
        rsi_enabled: true,
        rsi_timeframe: Timeframe::M1,
        rsi_period: 1,
        stochastic_enabled: false,
        ..SignalParams::default()
    }
}

pub const SESSION_INI: &str = r#"
[data]
path = session.csv
format = plain

[replay]
start = 2024-01-15T10:00:00
end = 2024-01-15T10:09:00
frequency = M1

[account]
balance = 10000
leverage = 30
point = 0.0001
lot_in_units = 100000

[trading]
symbol = EURUSD
lot_size = 0.1
long_open_threshold = 50
long_close_threshold = 30
short_open_threshold = 50
short_close_threshold = 30
stop_loss = 100
take_profit = 300

[signal]
bands = false
rsi = true
rsi_timeframe = M1
rsi_period = 1
stochastic = false
"#;

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Render ticks in the plain `timestamp,ask,bid,volume` layout.
pub fn plain_csv(ticks: &[Tick]) -> String {
    let mut out = String::from("timestamp,ask,bid,volume\n");
    for t in ticks {
        out.push_str(&format!(
            "{},{},{},{}\n",
            t.timestamp.format("%Y-%m-%dT%H:%M:%S"),
            t.ask,
            t.bid,
            t.volume
        ));
    }
    out
}

pub struct MockDataPort {
    pub data: HashMap<PathBuf, Vec<Tick>>,
    pub requests: RefCell<Vec<(PathBuf, DataFormat)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_ticks(mut self, path: &str, ticks: Vec<Tick>) -> Self {
        self.data.insert(PathBuf::from(path), ticks);
        self
    }
}

impl DataPort for MockDataPort {
    fn load_ticks(&self, path: &Path, format: DataFormat) -> Result<Vec<Tick>, ReplayError> {
        self.requests
            .borrow_mut()
            .push((path.to_path_buf(), format));
        self.data
            .get(path)
            .cloned()
            .ok_or_else(|| ReplayError::Data {
                reason: format!("no fixture for {}", path.display()),
            })
    }
}
