//! Indicators computed over an ordered bar series.
//!
//! Every calculator returns one [`IndicatorPoint`] per input bar, stamped with
//! the bar's bucket timestamp. Points inside the warm-up window carry
//! `valid == false`.

pub mod bollinger;
pub mod rsi;
pub mod stochastic;

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum IndicatorValue {
    Simple(f64),
    Stochastic { k: f64, d: f64 },
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Rsi(usize),
    Stochastic { period: usize, smooth: usize },
    Bollinger { window: usize, stddev_mult_x100: u32 },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Bucket timestamp to value, `None` for points still warming up.
    pub fn by_bucket(&self) -> HashMap<NaiveDateTime, Option<IndicatorValue>> {
        self.values
            .iter()
            .map(|p| (p.timestamp, p.valid.then_some(p.value)))
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stochastic { period, smooth } => {
                write!(f, "STOCHASTIC({},{})", period, smooth)
            }
            IndicatorType::Bollinger {
                window,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", window, mult)
            }
        }
    }
}
