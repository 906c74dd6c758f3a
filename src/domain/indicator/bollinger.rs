//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) of closes over `window` bars
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Warmup: first (window-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::tick::Bar;

pub fn calculate_bollinger(bars: &[Bar], window: usize, stddev_mult_x100: u32) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let warmup = window.saturating_sub(1);
    let mult = stddev_mult_x100 as f64 / 100.0;

    for (i, bar) in bars.iter().enumerate() {
        let valid = window > 0 && i >= warmup;

        let value = if valid {
            let closes = &bars[i + 1 - window..=i];
            let middle = closes.iter().map(|b| b.close).sum::<f64>() / window as f64;
            let variance = closes
                .iter()
                .map(|b| {
                    let diff = b.close - middle;
                    diff * diff
                })
                .sum::<f64>()
                / window as f64;
            let stddev = variance.sqrt();

            IndicatorValue::Bollinger {
                upper: middle + mult * stddev,
                middle,
                lower: middle - mult * stddev,
            }
        } else {
            IndicatorValue::Bollinger {
                upper: 0.0,
                middle: 0.0,
                lower: 0.0,
            }
        };

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value,
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            window,
            stddev_mult_x100,
        },
        values,
    }
}
