//! Indicator pipelines and signal fusion.
//!
//! Each enabled indicator is computed once over the full bar series of its
//! timeframe and memoized as a bucket-timestamp lookup. Per step the current
//! time is floored to each indicator's bucket and the values found there are
//! fused into one direction score:
//!
//! - bands vote -100 when the bid is at or above the upper band, -50 when it
//!   is above the middle band, and symmetrically +100 / +50 below
//! - oscillators (RSI, stochastic %K) vote `100 - 2 × value`
//!
//! The direction is the sum of votes divided by the number of indicators that
//! produced a value. A missing bucket or a missing bid yields "No signal".

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::error::ReplayError;
use super::indicator::bollinger::calculate_bollinger;
use super::indicator::rsi::calculate_rsi;
use super::indicator::stochastic::calculate_stochastic;
use super::indicator::{IndicatorSeries, IndicatorValue};
use super::price_store::PriceStore;
use super::signal::Signal;
use super::timeframe::Timeframe;

/// One configured indicator. Closed set, built by the constructors below.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum IndicatorSpec {
    Bands {
        timeframe: Timeframe,
        window: usize,
        dev: f64,
    },
    Rsi {
        timeframe: Timeframe,
        period: usize,
    },
    Stochastic {
        timeframe: Timeframe,
        period: usize,
        smooth: usize,
    },
}

impl IndicatorSpec {
    pub fn bands(timeframe: Timeframe, window: usize, dev: f64) -> Self {
        IndicatorSpec::Bands {
            timeframe,
            window,
            dev,
        }
    }

    pub fn rsi(timeframe: Timeframe, period: usize) -> Self {
        IndicatorSpec::Rsi { timeframe, period }
    }

    pub fn stochastic(timeframe: Timeframe, period: usize, smooth: usize) -> Self {
        IndicatorSpec::Stochastic {
            timeframe,
            period,
            smooth,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        match *self {
            IndicatorSpec::Bands { timeframe, .. }
            | IndicatorSpec::Rsi { timeframe, .. }
            | IndicatorSpec::Stochastic { timeframe, .. } => timeframe,
        }
    }

    fn compute(&self, bars: &[super::tick::Bar]) -> IndicatorSeries {
        match *self {
            IndicatorSpec::Bands { window, dev, .. } => {
                calculate_bollinger(bars, window, (dev * 100.0).round() as u32)
            }
            IndicatorSpec::Rsi { period, .. } => calculate_rsi(bars, period),
            IndicatorSpec::Stochastic { period, smooth, .. } => {
                calculate_stochastic(bars, period, smooth)
            }
        }
    }
}

impl std::fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorSpec::Bands {
                timeframe,
                window,
                dev,
            } => write!(f, "BANDS({timeframe},{window},{dev})"),
            IndicatorSpec::Rsi { timeframe, period } => write!(f, "RSI({timeframe},{period})"),
            IndicatorSpec::Stochastic {
                timeframe,
                period,
                smooth,
            } => write!(f, "STOCHASTIC({timeframe},{period},{smooth})"),
        }
    }
}

/// Indicator parameters as configured. Defaults: M10 bands 7×2, M10 RSI 13,
/// M10 stochastic 14/3, all enabled.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignalParams {
    pub bands_enabled: bool,
    pub bands_timeframe: Timeframe,
    pub bands_window: usize,
    pub bands_dev: f64,
    pub rsi_enabled: bool,
    pub rsi_timeframe: Timeframe,
    pub rsi_period: usize,
    pub stochastic_enabled: bool,
    pub stochastic_timeframe: Timeframe,
    pub stochastic_period: usize,
    pub stochastic_smooth: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        SignalParams {
            bands_enabled: true,
            bands_timeframe: Timeframe::M10,
            bands_window: 7,
            bands_dev: 2.0,
            rsi_enabled: true,
            rsi_timeframe: Timeframe::M10,
            rsi_period: 13,
            stochastic_enabled: true,
            stochastic_timeframe: Timeframe::M10,
            stochastic_period: 14,
            stochastic_smooth: 3,
        }
    }
}

impl SignalParams {
    /// Enabled indicators in fusion order.
    pub fn indicators(&self) -> Vec<IndicatorSpec> {
        let mut specs = Vec::with_capacity(3);
        if self.bands_enabled {
            specs.push(IndicatorSpec::bands(
                self.bands_timeframe,
                self.bands_window,
                self.bands_dev,
            ));
        }
        if self.rsi_enabled {
            specs.push(IndicatorSpec::rsi(self.rsi_timeframe, self.rsi_period));
        }
        if self.stochastic_enabled {
            specs.push(IndicatorSpec::stochastic(
                self.stochastic_timeframe,
                self.stochastic_period,
                self.stochastic_smooth,
            ));
        }
        specs
    }
}

#[derive(Debug, Clone)]
struct Pipeline {
    spec: IndicatorSpec,
    // bucket -> value, None while the indicator is still warming up
    by_bucket: HashMap<NaiveDateTime, Option<IndicatorValue>>,
}

impl Pipeline {
    fn build(spec: IndicatorSpec, store: &mut PriceStore, symbol: &str) -> Result<Self, ReplayError> {
        let bars = store.bars(symbol, spec.timeframe(), None, None)?;
        let by_bucket = spec.compute(&bars).by_bucket();
        Ok(Pipeline { spec, by_bucket })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignalSnapshot {
    pub signal: Signal,
    pub symbol: String,
    pub params: SignalParams,
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    symbol: String,
    params: SignalParams,
    pipelines: Vec<Pipeline>,
    prepared: bool,
    last_signal: Signal,
}

impl SignalEngine {
    pub fn new(symbol: &str) -> Self {
        SignalEngine {
            symbol: symbol.to_string(),
            params: SignalParams::default(),
            pipelines: Vec::new(),
            prepared: false,
            last_signal: Signal::neutral(None, symbol),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn last_signal(&self) -> &Signal {
        &self.last_signal
    }

    /// Recompute every enabled pipeline from the store and reset the last
    /// signal to neutral.
    pub fn setup(&mut self, params: SignalParams, store: &mut PriceStore) -> Result<(), ReplayError> {
        let pipelines = params
            .indicators()
            .into_iter()
            .map(|spec| Pipeline::build(spec, store, &self.symbol))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            symbol = %self.symbol,
            indicators = pipelines.len(),
            "signal pipelines prepared"
        );
        self.pipelines = pipelines;
        self.params = params;
        self.prepared = true;
        self.last_signal = Signal::neutral(None, &self.symbol);
        Ok(())
    }

    /// Fuse the indicator values visible at `now` into a new signal.
    pub fn evaluate(&mut self, now: Option<NaiveDateTime>, bid: Option<f64>) -> &Signal {
        self.last_signal = self.fuse(now, bid);
        &self.last_signal
    }

    fn fuse(&self, now: Option<NaiveDateTime>, bid: Option<f64>) -> Signal {
        let Some(now) = now else {
            return Signal::neutral(None, &self.symbol);
        };
        let neutral = || Signal::neutral(Some(now), &self.symbol);
        if !self.prepared {
            return neutral();
        }

        let mut values: Vec<(IndicatorSpec, IndicatorValue)> = Vec::new();
        for pipeline in &self.pipelines {
            let bucket = pipeline.spec.timeframe().bucket(now);
            match pipeline.by_bucket.get(&bucket) {
                None => return neutral(),
                Some(None) => {}
                Some(Some(value)) => values.push((pipeline.spec, *value)),
            }
        }

        let Some(bid) = bid else {
            return neutral();
        };
        if values.is_empty() {
            return neutral();
        }

        let mut direction = 0.0;
        let mut parts: Vec<String> = vec![format!("bid: {bid}")];
        for (spec, value) in &values {
            direction += vote(value, bid);
            parts.push(describe(spec, value));
        }
        direction /= values.len() as f64;
        parts.push(format!("bar_ts: {}", values[0].0.timeframe().bucket(now)));

        Signal::directional(now, direction, parts.join(", "), &self.symbol)
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            signal: self.last_signal.clone(),
            symbol: self.symbol.clone(),
            params: self.params.clone(),
        }
    }
}

/// Vote of a single indicator value for price `bid`.
pub fn vote(value: &IndicatorValue, bid: f64) -> f64 {
    match *value {
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } => {
            let mut v = 0.0;
            if bid >= upper {
                v -= 100.0;
            } else if bid > middle {
                v -= 50.0;
            }
            if bid <= lower {
                v += 100.0;
            } else if bid < middle {
                v += 50.0;
            }
            v
        }
        IndicatorValue::Simple(x) => 100.0 - 2.0 * x,
        IndicatorValue::Stochastic { k, .. } => 100.0 - 2.0 * k,
    }
}

fn describe(spec: &IndicatorSpec, value: &IndicatorValue) -> String {
    match (spec, value) {
        (
            IndicatorSpec::Bands { .. },
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        ) => format!("hband: {upper}, mband: {middle}, lband: {lower}"),
        (IndicatorSpec::Rsi { .. }, IndicatorValue::Simple(v)) => format!("rsi: {v}"),
        (IndicatorSpec::Stochastic { .. }, IndicatorValue::Stochastic { k, d }) => {
            format!("stochastic: {k}, stochastic_d: {d}")
        }
        (spec, value) => format!("{spec:?}: {value:?}"),
    }
}
