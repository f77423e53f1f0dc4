//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Each window is summed afresh so long
//! series do not accumulate rounding drift.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let means = rolling_mean(&closes, period);

    let values = bars
        .iter()
        .zip(means)
        .map(|(bar, mean)| match mean {
            Some(v) => IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(v),
            },
            None => invalid_point(bar.date, IndicatorValue::Simple(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

/// Rolling mean over plain values; `None` until `period` values are seen.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| sma_last(&values[..=i], period))
        .collect()
}

/// Mean of the last `period` values, `None` if there are fewer.
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}
