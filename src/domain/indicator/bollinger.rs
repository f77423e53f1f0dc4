//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is the sample standard deviation (divides by N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::stddev::sample_stddev;
use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;
/// Shortest window the end-of-series fallback will use.
pub const MIN_FALLBACK_PERIOD: usize = 10;

pub fn calculate_bollinger(
    bars: &[PriceBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mult = stddev_mult_x100 as f64 / 100.0;

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let band = (i + 1)
                .checked_sub(period)
                .and_then(|start| bands(&closes[start..=i], mult));
            match band {
                Some(value) => IndicatorPoint {
                    date: bar.date,
                    valid: true,
                    value,
                },
                None => invalid_point(
                    bar.date,
                    IndicatorValue::Bollinger {
                        upper: 0.0,
                        middle: 0.0,
                        lower: 0.0,
                    },
                ),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

/// Bands at the final bar.
///
/// Uses `period` when enough closes exist, otherwise the whole history as
/// long as it spans at least `min_period` bars. Returns the window that was
/// actually used so callers can flag the shorter band.
pub fn bollinger_at_end(
    bars: &[PriceBar],
    period: usize,
    min_period: usize,
    stddev_mult_x100: u32,
) -> Option<(IndicatorValue, usize)> {
    let window = period.min(bars.len());
    if window < min_period.max(2) {
        return None;
    }
    let closes: Vec<f64> = bars[bars.len() - window..].iter().map(|b| b.close).collect();
    bands(&closes, stddev_mult_x100 as f64 / 100.0).map(|value| (value, window))
}

fn bands(window: &[f64], mult: f64) -> Option<IndicatorValue> {
    let stddev = sample_stddev(window)?;
    let middle = window.iter().sum::<f64>() / window.len() as f64;
    Some(IndicatorValue::Bollinger {
        upper: middle + mult * stddev,
        middle,
        lower: middle - mult * stddev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn bollinger_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn bollinger_constant_values() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        assert_eq!(
            series.values[2].value,
            IndicatorValue::Bollinger {
                upper: 100.0,
                middle: 100.0,
                lower: 100.0
            }
        );
    }

    #[test]
    fn bollinger_basic_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&bars, 3, 200);

        if let IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } = series.values[2].value
        {
            // sample variance: (100 + 0 + 100) / 2 = 100
            let stddev = 10.0;
            assert!((middle - 20.0).abs() < 1e-10);
            assert!((upper - (20.0 + 2.0 * stddev)).abs() < 1e-10);
            assert!((lower - (20.0 - 2.0 * stddev)).abs() < 1e-10);
        } else {
            panic!("Expected Bollinger value");
        }
    }

    #[test]
    fn bollinger_multiplier_variations() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&bars, 3, 100);

        if let IndicatorValue::Bollinger { upper, lower, .. } = series.values[2].value {
            assert!((upper - 30.0).abs() < 1e-10);
            assert!((lower - 10.0).abs() < 1e-10);
        } else {
            panic!("Expected Bollinger value");
        }
    }

    #[test]
    fn bollinger_indicator_type() {
        let series = calculate_bollinger(&make_bars(&[10.0, 20.0, 30.0]), 20, 200);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 200
            }
        );
    }

    #[test]
    fn fallback_uses_full_period_when_available() {
        let prices: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let (_, window) = bollinger_at_end(&make_bars(&prices), 20, 10, 200).unwrap();
        assert_eq!(window, 20);
    }

    #[test]
    fn fallback_shortens_window() {
        let prices: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let (value, window) = bollinger_at_end(&make_bars(&prices), 20, 10, 200).unwrap();
        assert_eq!(window, 12);
        if let IndicatorValue::Bollinger { middle, .. } = value {
            assert!((middle - 105.5).abs() < 1e-12);
        } else {
            panic!("Expected Bollinger value");
        }
    }

    #[test]
    fn fallback_refuses_fewer_than_minimum() {
        let prices: Vec<f64> = (0..9).map(|i| 100.0 + i as f64).collect();
        assert!(bollinger_at_end(&make_bars(&prices), 20, 10, 200).is_none());
    }
}
