//! Replay frequencies and bar timeframes.
//!
//! The same closed set of labels serves both as the clock step and as the
//! bucket width used to aggregate ticks into bars.

use chrono::{Duration, NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

use super::error::ReplayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Timeframe {
    Tick,
    S1,
    M1,
    M5,
    M10,
    M15,
    M20,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 11] = [
        Timeframe::Tick,
        Timeframe::S1,
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M10,
        Timeframe::M15,
        Timeframe::M20,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// Step width. `Tick` is zero: the cursor moves from event to event.
    pub fn step(self) -> Duration {
        match self {
            Timeframe::Tick => Duration::zero(),
            Timeframe::S1 => Duration::seconds(1),
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M10 => Duration::minutes(10),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::M20 => Duration::minutes(20),
            Timeframe::M30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }

    pub fn is_tick(self) -> bool {
        self == Timeframe::Tick
    }

    /// Floor `ts` to the start of its bucket. Sub-second precision is always dropped
    /// except for `Tick`, which buckets every record on its own.
    pub fn bucket(self, ts: NaiveDateTime) -> NaiveDateTime {
        if self == Timeframe::Tick {
            return ts;
        }
        let second = ts.with_nanosecond(0).unwrap_or(ts);
        let floor_minutes = |width: u32| {
            second
                .with_second(0)
                .and_then(|t| t.with_minute(t.minute() - t.minute() % width))
                .unwrap_or(second)
        };
        let floor_hours = |width: u32| {
            second
                .with_second(0)
                .and_then(|t| t.with_minute(0))
                .and_then(|t| t.with_hour(t.hour() - t.hour() % width))
                .unwrap_or(second)
        };
        match self {
            Timeframe::Tick | Timeframe::S1 => second,
            Timeframe::M1 => floor_minutes(1),
            Timeframe::M5 => floor_minutes(5),
            Timeframe::M10 => floor_minutes(10),
            Timeframe::M15 => floor_minutes(15),
            Timeframe::M20 => floor_minutes(20),
            Timeframe::M30 => floor_minutes(30),
            Timeframe::H1 => floor_hours(1),
            Timeframe::H4 => floor_hours(4),
            Timeframe::D1 => second.date().and_hms_opt(0, 0, 0).unwrap_or(second),
        }
    }

    /// Calendar alignment applied to replay bounds: minute steps drop seconds,
    /// hour steps drop minutes, day steps drop hours.
    pub fn align(self, ts: NaiveDateTime) -> NaiveDateTime {
        let step = self.step();
        let mut aligned = ts;
        if step >= Duration::minutes(1) {
            aligned = aligned
                .with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(aligned);
        }
        if step >= Duration::hours(1) {
            aligned = aligned.with_minute(0).unwrap_or(aligned);
        }
        if step >= Duration::days(1) {
            aligned = aligned.with_hour(0).unwrap_or(aligned);
        }
        aligned
    }
}

impl FromStr for Timeframe {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tf = match s.trim() {
            "Tick" => Timeframe::Tick,
            "S1" => Timeframe::S1,
            "M1" => Timeframe::M1,
            "M5" => Timeframe::M5,
            "M10" => Timeframe::M10,
            "M15" => Timeframe::M15,
            "M20" => Timeframe::M20,
            "M30" => Timeframe::M30,
            "H1" => Timeframe::H1,
            "H4" => Timeframe::H4,
            "D1" => Timeframe::D1,
            other => {
                return Err(ReplayError::UnsupportedFrequency {
                    value: other.to_string(),
                });
            }
        };
        Ok(tf)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timeframe::Tick => "Tick",
            Timeframe::S1 => "S1",
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M10 => "M10",
            Timeframe::M15 => "M15",
            Timeframe::M20 => "M20",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        f.write_str(label)
    }
}
