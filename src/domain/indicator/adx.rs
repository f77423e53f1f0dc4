//! ADX (Average Directional Index) with +DI / -DI.
//!
//! up = H[i] - H[i-1], down = L[i-1] - L[i]
//! +DM = up if up > down and up > 0, else 0; -DM symmetric.
//! TR, +DM and -DM are Wilder-smoothed over n bars starting at bar 1.
//! +DI = 100 * sm(+DM) / ATR, -DI = 100 * sm(-DM) / ATR
//! DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when both DIs are 0
//! ADX = Wilder average of DX seeded with the mean of the first n DX values.
//!
//! Warmup: first 2n - 1 bars are invalid.

use crate::domain::indicator::{
    invalid_point, wilder_smooth, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_adx(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let empty = IndicatorValue::Adx {
        adx: 0.0,
        plus_di: 0.0,
        minus_di: 0.0,
    };
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|bar| invalid_point(bar.date, empty.clone()))
        .collect();

    if period == 0 || bars.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Adx(period),
            values,
        };
    }

    // Movement series start at bar 1; index j here maps to bar j + 1.
    let mut tr = Vec::with_capacity(bars.len() - 1);
    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let up = cur.high - prev.high;
        let down = prev.low - cur.low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
        tr.push(cur.true_range(prev.close));
    }

    let atr = wilder_smooth(&tr, period);
    let plus = wilder_smooth(&plus_dm, period);
    let minus = wilder_smooth(&minus_dm, period);

    let di: Vec<Option<(f64, f64)>> = (0..tr.len())
        .map(|j| {
            let (atr, plus, minus) = (atr[j]?, plus[j]?, minus[j]?);
            if atr == 0.0 {
                Some((0.0, 0.0))
            } else {
                Some((100.0 * plus / atr, 100.0 * minus / atr))
            }
        })
        .collect();

    let Some(first) = di.iter().position(Option::is_some) else {
        return IndicatorSeries {
            indicator_type: IndicatorType::Adx(period),
            values,
        };
    };

    let dx: Vec<f64> = di[first..]
        .iter()
        .flatten()
        .map(|&(p, m)| {
            let sum = p + m;
            if sum == 0.0 {
                0.0
            } else {
                100.0 * (p - m).abs() / sum
            }
        })
        .collect();

    for (offset, adx) in wilder_smooth(&dx, period).into_iter().enumerate() {
        let j = first + offset;
        if let (Some(adx), Some((plus_di, minus_di))) = (adx, di[j]) {
            values[j + 1] = IndicatorPoint {
                date: bars[j + 1].date,
                valid: true,
                value: IndicatorValue::Adx {
                    adx,
                    plus_di,
                    minus_di,
                },
            };
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Adx(period),
        values,
    }
}
