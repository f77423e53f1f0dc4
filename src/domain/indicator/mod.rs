//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Which calculator and windows produced a series
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every calculator returns one point per input bar; points inside the warmup
//! window carry `valid = false` and a zeroed value that callers must ignore.

pub mod adx;
pub mod aroon;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
pub mod snapshot;
pub mod stddev;
pub mod stochastic;

pub use adx::calculate_adx;
pub use aroon::calculate_aroon;
pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use obv::calculate_obv;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;
pub use stochastic::calculate_stochastic;

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Adx {
        adx: f64,
        plus_di: f64,
        minus_di: f64,
    },
    Aroon {
        up: f64,
        down: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Stddev(usize),
    Adx(usize),
    Aroon(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The value at the final bar, if that bar is past warmup.
    pub fn last_valid(&self) -> Option<&IndicatorValue> {
        self.values
            .last()
            .filter(|p| p.valid)
            .map(|p| &p.value)
    }

    /// Convenience for single-valued indicators.
    pub fn last_simple(&self) -> Option<f64> {
        match self.last_valid() {
            Some(IndicatorValue::Simple(v)) => Some(*v),
            _ => None,
        }
    }
}

pub(crate) fn invalid_point(date: NaiveDate, value: IndicatorValue) -> IndicatorPoint {
    IndicatorPoint {
        date,
        valid: false,
        value,
    }
}

/// Wilder's running average over `values`, seeded with the simple mean of the
/// first `period` entries. Positions before the seed are `None`.
pub(crate) fn wilder_smooth(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut avg = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(avg);
    for i in period..values.len() {
        avg = (avg * (period - 1) as f64 + values[i]) / period as f64;
        out[i] = Some(avg);
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wilder_smooth_seed_and_recursion() {
        let smoothed = wilder_smooth(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(smoothed[0], None);
        assert_eq!(smoothed[1], None);
        assert_eq!(smoothed[2], Some(4.0));
        // (4 * 2 + 8) / 3
        assert!((smoothed[3].unwrap() - 16.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn wilder_smooth_short_input() {
        assert!(wilder_smooth(&[1.0], 3).iter().all(Option::is_none));
    }

    #[test]
    fn last_valid_skips_warmup() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Sma(3),
            values: vec![invalid_point(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                IndicatorValue::Simple(0.0),
            )],
        };
        assert!(series.last_valid().is_none());
        assert_eq!(series.last_simple(), None);
    }
}
