//! Aroon Up / Down.
//!
//! Over the last n+1 bars (inclusive of the current one):
//! Up   = 100 * (n - bars since highest high) / n
//! Down = 100 * (n - bars since lowest low) / n
//! Ties resolve to the most recent extreme.
//! Warmup: first n bars are invalid.

use crate::domain::indicator::{
    invalid_point, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 25;

pub fn calculate_aroon(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if period == 0 || i < period {
                return invalid_point(bar.date, IndicatorValue::Aroon { up: 0.0, down: 0.0 });
            }
            let window = &bars[i - period..=i];
            let since_high = bars_since(window, |a, b| a.high >= b.high);
            let since_low = bars_since(window, |a, b| a.low <= b.low);
            let n = period as f64;
            IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Aroon {
                    up: 100.0 * (n - since_high as f64) / n,
                    down: 100.0 * (n - since_low as f64) / n,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Aroon(period),
        values,
    }
}

/// Distance from the end of `window` to the best bar, where `better(a, b)`
/// says whether `a` should replace the current best `b`.
fn bars_since(window: &[PriceBar], better: impl Fn(&PriceBar, &PriceBar) -> bool) -> usize {
    let mut best = 0;
    for (idx, bar) in window.iter().enumerate().skip(1) {
        if better(bar, &window[best]) {
            best = idx;
        }
    }
    window.len() - 1 - best
}
