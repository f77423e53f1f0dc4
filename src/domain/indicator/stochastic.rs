//! Stochastic oscillator (%K, %D).
//!
//! %K = 100 * (C - LL(k)) / (HH(k) - LL(k)), 50 when the range is zero.
//! %D = d-period SMA of %K.
//! Warmup: first (k + d - 2) bars are invalid.

use crate::domain::indicator::sma::sma_last;
use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let percent_k: Vec<Option<f64>> = (0..bars.len())
        .map(|i| {
            let start = (i + 1).checked_sub(k_period).filter(|_| k_period > 0)?;
            let window = &bars[start..=i];
            let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let range = highest - lowest;
            Some(if range == 0.0 {
                50.0
            } else {
                100.0 * (bars[i].close - lowest) / range
            })
        })
        .collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let d = (i + 1)
                .checked_sub(d_period)
                .and_then(|start| percent_k[start..=i].iter().copied().collect::<Option<Vec<f64>>>())
                .and_then(|window| sma_last(&window, d_period));
            match (percent_k[i], d) {
                (Some(k), Some(d)) => IndicatorPoint {
                    date: bar.date,
                    valid: true,
                    value: IndicatorValue::Stochastic { k, d },
                },
                _ => invalid_point(bar.date, IndicatorValue::Stochastic { k: 0.0, d: 0.0 }),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stochastic { k_period, d_period },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_hlc_bars;

    #[test]
    fn stochastic_warmup() {
        let bars = make_hlc_bars(&[(12.0, 8.0, 10.0); 20]);
        let series = calculate_stochastic(&bars, 14, 3);
        let first_valid = series.values.iter().position(|p| p.valid).unwrap();
        assert_eq!(first_valid, 14 + 3 - 2);
    }

    #[test]
    fn stochastic_close_at_high_is_100() {
        let bars = make_hlc_bars(&[
            (10.0, 5.0, 10.0),
            (10.0, 5.0, 10.0),
            (10.0, 5.0, 10.0),
            (10.0, 5.0, 10.0),
        ]);
        let series = calculate_stochastic(&bars, 2, 2);
        assert_eq!(
            series.last_valid(),
            Some(&IndicatorValue::Stochastic { k: 100.0, d: 100.0 })
        );
    }

    #[test]
    fn stochastic_d_is_mean_of_k() {
        // k period 2: K values at bars 1..=3 are 50, 100, 0
        let bars = make_hlc_bars(&[
            (10.0, 0.0, 5.0),
            (10.0, 0.0, 5.0),
            (20.0, 10.0, 20.0),
            (20.0, 10.0, 10.0),
        ]);
        let series = calculate_stochastic(&bars, 2, 3);
        match series.last_valid() {
            Some(IndicatorValue::Stochastic { k, d }) => {
                assert!(k.abs() < 1e-12);
                assert!((d - 50.0).abs() < 1e-12);
            }
            other => panic!("Expected Stochastic value, got {:?}", other),
        }
    }

    #[test]
    fn stochastic_zero_range_is_midpoint() {
        let bars = make_hlc_bars(&[(10.0, 10.0, 10.0); 5]);
        let series = calculate_stochastic(&bars, 3, 2);
        assert_eq!(
            series.last_valid(),
            Some(&IndicatorValue::Stochastic { k: 50.0, d: 50.0 })
        );
    }
}
