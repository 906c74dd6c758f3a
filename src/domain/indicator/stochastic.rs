//! Stochastic oscillator.
//!
//! %K = 100 × (close − lowest low) / (highest high − lowest low) over `period` bars.
//! %D = simple mean of the last `smooth` %K values.
//!
//! A flat window (highest == lowest) yields %K = 50.
//! Warmup: first (period-1) bars are invalid. %D falls back to %K until
//! `smooth` %K values exist.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::tick::Bar;

pub fn calculate_stochastic(bars: &[Bar], period: usize, smooth: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut ks: Vec<f64> = Vec::new();
    let warmup = period.saturating_sub(1);

    for (i, bar) in bars.iter().enumerate() {
        if period == 0 || i < warmup {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Stochastic { k: 0.0, d: 0.0 },
            });
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let highest = window
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let range = highest - lowest;

        let k = if range == 0.0 {
            50.0
        } else {
            100.0 * (bar.close - lowest) / range
        };
        ks.push(k);

        let tail = &ks[ks.len().saturating_sub(smooth.max(1))..];
        let d = tail.iter().sum::<f64>() / tail.len() as f64;

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid: true,
            value: IndicatorValue::Stochastic { k, d },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Stochastic { period, smooth },
        values,
    }
}
