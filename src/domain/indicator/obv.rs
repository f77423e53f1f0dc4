//! OBV (On-Balance Volume) indicator implementation.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

/// Calculate OBV (On-Balance Volume) indicator.
///
/// OBV[0] = 0 (there is no prior close to sign the first volume)
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; all bars are valid.
pub fn calculate_obv(bars: &[PriceBar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv: f64 = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev_close = bars[i - 1].close;
            if bar.close > prev_close {
                obv += bar.volume as f64;
            } else if bar.close < prev_close {
                obv -= bar.volume as f64;
            }
        }

        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(obv),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    fn with_volumes(closes: &[f64], volumes: &[i64]) -> Vec<PriceBar> {
        let mut bars = make_bars(closes);
        for (bar, volume) in bars.iter_mut().zip(volumes) {
            bar.volume = *volume;
        }
        bars
    }

    #[test]
    fn obv_first_bar_is_zero() {
        let series = calculate_obv(&with_volumes(&[100.0], &[1000]));
        assert_eq!(series.values.len(), 1);
        assert!(series.values[0].valid);
        assert_eq!(series.values[0].value, IndicatorValue::Simple(0.0));
    }

    #[test]
    fn obv_adds_volume_on_up_day() {
        let series = calculate_obv(&with_volumes(&[100.0, 105.0], &[1000, 500]));
        assert_eq!(series.last_simple(), Some(500.0));
    }

    #[test]
    fn obv_subtracts_volume_on_down_day() {
        let series = calculate_obv(&with_volumes(&[100.0, 95.0], &[1000, 300]));
        assert_eq!(series.last_simple(), Some(-300.0));
    }

    #[test]
    fn obv_unchanged_on_flat_day() {
        let series = calculate_obv(&with_volumes(&[100.0, 101.0, 101.0], &[1000, 500, 800]));
        assert_eq!(series.last_simple(), Some(500.0));
    }

    #[test]
    fn obv_cumulates_mixed_days() {
        let series = calculate_obv(&with_volumes(
            &[100.0, 105.0, 102.0, 108.0],
            &[1000, 500, 200, 700],
        ));
        // 0 + 500 - 200 + 700
        assert_eq!(series.last_simple(), Some(1000.0));
        assert!(series.values.iter().all(|p| p.valid));
    }

    #[test]
    fn obv_indicator_type() {
        let series = calculate_obv(&make_bars(&[100.0]));
        assert_eq!(series.indicator_type, IndicatorType::Obv);
    }
}
