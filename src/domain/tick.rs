//! Tick and bar records.

use chrono::NaiveDateTime;

/// Optional OHLC payload carried by rows that were loaded from bar exports.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// A timestamped ask/bid observation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick {
    pub timestamp: NaiveDateTime,
    pub ask: f64,
    pub bid: f64,
    pub volume: f64,
    pub ohlc: Option<Ohlc>,
}

impl Tick {
    pub fn new(timestamp: NaiveDateTime, ask: f64, bid: f64, volume: f64) -> Self {
        Tick {
            timestamp,
            ask,
            bid,
            volume,
            ohlc: None,
        }
    }

    pub fn with_ohlc(mut self, ohlc: Ohlc) -> Self {
        self.ohlc = Some(ohlc);
        self
    }

    pub fn price(&self, side: PriceSide) -> f64 {
        match side {
            PriceSide::Ask => self.ask,
            PriceSide::Bid => self.bid,
        }
    }

    /// ask - bid
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    // Aggregation reads OHLC when the row carries it, the bid otherwise.
    pub(crate) fn open_price(&self) -> f64 {
        self.ohlc.map_or(self.bid, |o| o.open)
    }

    pub(crate) fn high_price(&self) -> f64 {
        self.ohlc.map_or(self.bid, |o| o.high)
    }

    pub(crate) fn low_price(&self) -> f64 {
        self.ohlc.map_or(self.bid, |o| o.low)
    }

    pub(crate) fn close_price(&self) -> f64 {
        self.ohlc.map_or(self.bid, |o| o.close)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceSide {
    Ask,
    Bid,
}

/// Ask and bid resolved together for one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quote {
    pub ask: f64,
    pub bid: f64,
}

impl Quote {
    /// Both sides rounded to `decimals` places.
    pub fn rounded(self, decimals: i32) -> Quote {
        Quote {
            ask: round_to(self.ask, decimals),
            bid: round_to(self.bid, decimals),
        }
    }
}

/// OHLCV aggregate over one timeframe bucket.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn price_by_side() {
        let tick = Tick::new(ts(), 1.10012, 1.10005, 1.0);
        assert_eq!(tick.price(PriceSide::Ask), 1.10012);
        assert_eq!(tick.price(PriceSide::Bid), 1.10005);
        assert!((tick.spread() - 0.00007).abs() < 1e-12);
    }

    #[test]
    fn aggregation_prices_fall_back_to_bid() {
        let tick = Tick::new(ts(), 1.2, 1.1, 1.0);
        assert_eq!(tick.open_price(), 1.1);
        assert_eq!(tick.high_price(), 1.1);
        assert_eq!(tick.low_price(), 1.1);
        assert_eq!(tick.close_price(), 1.1);
    }

    #[test]
    fn aggregation_prices_prefer_ohlc() {
        let tick = Tick::new(ts(), 1.2, 1.1, 1.0).with_ohlc(Ohlc {
            open: 1.0,
            high: 1.3,
            low: 0.9,
            close: 1.1,
        });
        assert_eq!(tick.open_price(), 1.0);
        assert_eq!(tick.high_price(), 1.3);
        assert_eq!(tick.low_price(), 0.9);
        assert_eq!(tick.close_price(), 1.1);
    }

    #[test]
    fn quote_rounding_removes_float_noise() {
        let q = Quote {
            ask: 1.1000100000000001,
            bid: 1.0999999999999999,
        }
        .rounded(5);
        assert_eq!(q.ask, 1.10001);
        assert_eq!(q.bid, 1.1);
    }
}
