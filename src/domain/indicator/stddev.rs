//! Standard Deviation indicator.
//!
//! Sample standard deviation (ddof = 1) over n closing prices, matching
//! what spreadsheet and dataframe libraries report.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) bars are invalid. n < 2 is never valid.

use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_stddev(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let window_start = (i + 1).checked_sub(period);
            match window_start.and_then(|start| sample_stddev(&closes[start..=i])) {
                Some(v) => IndicatorPoint {
                    date: bar.date,
                    valid: true,
                    value: IndicatorValue::Simple(v),
                },
                None => invalid_point(bar.date, IndicatorValue::Simple(0.0)),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}

/// Sample standard deviation; `None` for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn stddev_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_stddev(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
    }

    #[test]
    fn stddev_constant_is_zero() {
        let series = calculate_stddev(&make_bars(&[5.0; 6]), 4);
        assert_eq!(series.last_simple(), Some(0.0));
    }

    #[test]
    fn stddev_sample_formula() {
        // mean 20, squared deviations 100 + 0 + 100, / (3 - 1) = 100
        let series = calculate_stddev(&make_bars(&[10.0, 20.0, 30.0]), 3);
        assert!((series.last_simple().unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn stddev_period_one_never_valid() {
        let series = calculate_stddev(&make_bars(&[10.0, 20.0]), 1);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sample_stddev_single_value() {
        assert_eq!(sample_stddev(&[3.0]), None);
    }
}
