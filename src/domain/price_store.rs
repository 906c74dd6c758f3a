//! Per-symbol tick storage with as-of lookup and cached bar aggregation.
//!
//! Each loaded series keeps three views of the same data:
//! - the sorted timestamp index, searched with `partition_point`
//! - a timestamp -> position map for exact hits
//! - the ordered tick sequence itself
//!
//! Aggregated bars are cached per `(symbol, timeframe, as-of)` key and handed
//! out as shared [`BarWindow`]s, so repeated requests during a scan return the
//! same allocation.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::ops::Deref;
use std::rc::Rc;

use super::error::ReplayError;
use super::tick::{Bar, PriceSide, Quote, Tick};
use super::timeframe::Timeframe;

#[derive(Debug, Clone, Default)]
struct Series {
    index: Vec<NaiveDateTime>,
    by_time: HashMap<NaiveDateTime, usize>,
    ticks: Vec<Tick>,
}

impl Series {
    fn from_rows(mut rows: Vec<Tick>) -> Self {
        rows.sort_by_key(|t| t.timestamp);

        let mut ticks: Vec<Tick> = Vec::with_capacity(rows.len());
        for row in rows {
            match ticks.last_mut() {
                Some(last) if last.timestamp == row.timestamp => *last = row,
                _ => ticks.push(row),
            }
        }

        let index: Vec<NaiveDateTime> = ticks.iter().map(|t| t.timestamp).collect();
        let by_time = index.iter().enumerate().map(|(i, ts)| (*ts, i)).collect();

        Series {
            index,
            by_time,
            ticks,
        }
    }

    /// Position of the record visible at `at`: exact hit, else the last one strictly before.
    fn as_of(&self, at: NaiveDateTime) -> Option<usize> {
        if let Some(&i) = self.by_time.get(&at) {
            return Some(i);
        }
        let insertion = self.index.partition_point(|ts| *ts < at);
        insertion.checked_sub(1)
    }

    /// Number of records with timestamp <= `at`.
    fn upto(&self, at: Option<NaiveDateTime>) -> usize {
        match at {
            Some(t) => self.index.partition_point(|ts| *ts <= t),
            None => self.index.len(),
        }
    }
}

type BarKey = (String, Timeframe, Option<NaiveDateTime>);

/// Shared view over a cached bar aggregation, optionally limited to its tail.
#[derive(Debug, Clone)]
pub struct BarWindow {
    all: Rc<[Bar]>,
    start: usize,
}

impl BarWindow {
    /// True when both windows were cut from the same cached aggregation.
    pub fn shares_cache_with(&self, other: &BarWindow) -> bool {
        Rc::ptr_eq(&self.all, &other.all)
    }
}

impl Deref for BarWindow {
    type Target = [Bar];

    fn deref(&self) -> &[Bar] {
        &self.all[self.start..]
    }
}

#[derive(Debug, Default)]
pub struct PriceStore {
    series: HashMap<String, Series>,
    bar_cache: HashMap<BarKey, Rc<[Bar]>>,
    aggregations: usize,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `rows` for `symbol`, replacing any previous series. Rows are sorted
    /// and duplicates keep the last value seen for a timestamp.
    pub fn load(&mut self, rows: Vec<Tick>, symbol: &str) {
        let series = Series::from_rows(rows);
        tracing::debug!(symbol, ticks = series.ticks.len(), "series loaded");
        self.bar_cache.retain(|(s, _, _), _| s != symbol);
        self.series.insert(symbol.to_string(), series);
    }

    pub fn is_loaded(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    fn series(&self, symbol: &str) -> Result<&Series, ReplayError> {
        self.series.get(symbol).ok_or_else(|| ReplayError::NotLoaded {
            symbol: symbol.to_string(),
        })
    }

    /// As-of price. `Ok(None)` means no record exists at or before `at`.
    pub fn price(
        &self,
        symbol: &str,
        side: PriceSide,
        at: NaiveDateTime,
    ) -> Result<Option<f64>, ReplayError> {
        let series = self.series(symbol)?;
        Ok(series.as_of(at).map(|i| series.ticks[i].price(side)))
    }

    pub fn ask(&self, symbol: &str, at: NaiveDateTime) -> Result<Option<f64>, ReplayError> {
        self.price(symbol, PriceSide::Ask, at)
    }

    pub fn bid(&self, symbol: &str, at: NaiveDateTime) -> Result<Option<f64>, ReplayError> {
        self.price(symbol, PriceSide::Bid, at)
    }

    /// Ask and bid from the same as-of record.
    pub fn quote(&self, symbol: &str, at: NaiveDateTime) -> Result<Option<Quote>, ReplayError> {
        let series = self.series(symbol)?;
        Ok(series.as_of(at).map(|i| {
            let tick = &series.ticks[i];
            Quote {
                ask: tick.ask,
                bid: tick.bid,
            }
        }))
    }

    /// Records at or before `at` (all records when `None`), optionally only the last `max_count`.
    pub fn ticks(
        &self,
        symbol: &str,
        at: Option<NaiveDateTime>,
        max_count: Option<usize>,
    ) -> Result<&[Tick], ReplayError> {
        let series = self.series(symbol)?;
        let end = series.upto(at);
        let start = max_count.map_or(0, |n| end.saturating_sub(n));
        Ok(&series.ticks[start..end])
    }

    /// Bars aggregated from the ticks visible at `at`. Cached per `(symbol, timeframe, at)`.
    pub fn bars(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        at: Option<NaiveDateTime>,
        max_count: Option<usize>,
    ) -> Result<BarWindow, ReplayError> {
        let key: BarKey = (symbol.to_string(), timeframe, at);

        let all = match self.bar_cache.get(&key) {
            Some(cached) => Rc::clone(cached),
            None => {
                let ticks = self.ticks(symbol, at, None)?;
                let bars: Rc<[Bar]> = aggregate_ticks(ticks, timeframe).into();
                self.aggregations += 1;
                self.bar_cache.insert(key, Rc::clone(&bars));
                bars
            }
        };

        let start = max_count.map_or(0, |n| all.len().saturating_sub(n));
        Ok(BarWindow { all, start })
    }

    /// How many aggregations actually ran (cache misses).
    pub fn aggregation_count(&self) -> usize {
        self.aggregations
    }

    /// First record strictly after `after`, used to drive tick-level replay.
    pub fn next_timestamp(
        &self,
        symbol: &str,
        after: NaiveDateTime,
    ) -> Result<Option<NaiveDateTime>, ReplayError> {
        let series = self.series(symbol)?;
        let i = series.index.partition_point(|ts| *ts <= after);
        Ok(series.index.get(i).copied())
    }

    /// (first, last, count) for a loaded symbol, `None` when the series is empty.
    pub fn range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, ReplayError> {
        let series = self.series(symbol)?;
        Ok(match (series.index.first(), series.index.last()) {
            (Some(first), Some(last)) => Some((*first, *last, series.index.len())),
            _ => None,
        })
    }
}

/// Group ordered ticks by timeframe bucket into OHLCV bars.
///
/// open = first open/bid, close = last close/bid, high = max, low = min,
/// volume = sum. Bars are stamped with the bucket start.
pub fn aggregate_ticks(ticks: &[Tick], timeframe: Timeframe) -> Vec<Bar> {
    let mut bars: Vec<Bar> = Vec::new();

    for tick in ticks {
        let bucket = timeframe.bucket(tick.timestamp);
        match bars.last_mut() {
            Some(bar) if bar.timestamp == bucket => {
                bar.high = bar.high.max(tick.high_price());
                bar.low = bar.low.min(tick.low_price());
                bar.close = tick.close_price();
                bar.volume += tick.volume;
            }
            _ => bars.push(Bar {
                timestamp: bucket,
                open: tick.open_price(),
                high: tick.high_price(),
                low: tick.low_price(),
                close: tick.close_price(),
                volume: tick.volume,
            }),
        }
    }

    bars
}
