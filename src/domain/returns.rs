//! Windowed returns, CAGR and risk statistics from a close-price history.

use crate::domain::indicator::stddev::sample_stddev;
use crate::domain::ohlcv::PriceSeries;
use std::collections::BTreeMap;

pub const TRADING_DAYS_PER_YEAR: usize = 252;
pub const RISK_LOOKBACK_BARS: usize = 252;

/// Risk statistics over the trailing lookback. Percent values are in
/// percentage points (12.5 means 12.5%).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskStats {
    pub volatility_30d: Option<f64>,
    pub volatility_90d: Option<f64>,
    pub sharpe: Option<f64>,
    /// Non-positive percent; 0 when the price never fell below a prior peak.
    pub max_drawdown: Option<f64>,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    pub pct_from_52w_high: Option<f64>,
}

/// Percent return over each window that has enough history.
///
/// A window `w` needs more than `w` bars; shorter histories simply omit it.
pub fn compute_returns(series: &PriceSeries, windows: &[usize]) -> BTreeMap<usize, f64> {
    let closes = series.closes();
    let n = closes.len();
    windows
        .iter()
        .filter(|&&w| w > 0 && n > w)
        .filter_map(|&w| {
            let start = closes[n - 1 - w];
            (start > 0.0).then(|| (w, (closes[n - 1] / start - 1.0) * 100.0))
        })
        .collect()
}

/// Compound annual growth rate over the trailing `years`, as a fraction.
///
/// Needs at least `years * 252` bars; the start price is the first bar of
/// that trailing window.
pub fn cagr(series: &PriceSeries, years: u32) -> Option<f64> {
    let span = years as usize * TRADING_DAYS_PER_YEAR;
    let closes = series.closes();
    if years == 0 || closes.len() < span {
        return None;
    }
    let start = closes[closes.len() - span];
    let end = *closes.last()?;
    if start <= 0.0 {
        return None;
    }
    let value = (end / start).powf(1.0 / years as f64) - 1.0;
    value.is_finite().then_some(value)
}

pub fn compute_risk(series: &PriceSeries, risk_free_rate: f64) -> RiskStats {
    let window = series.tail(RISK_LOOKBACK_BARS);
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    let log_returns = log_returns(&closes);
    let annualizer = (TRADING_DAYS_PER_YEAR as f64).sqrt();

    let volatility = |days: usize| {
        if log_returns.len() < days {
            return None;
        }
        sample_stddev(&log_returns[log_returns.len() - days..]).map(|s| s * annualizer * 100.0)
    };

    let sharpe = sample_stddev(&log_returns).and_then(|std| {
        if std == 0.0 {
            return None;
        }
        let mean = log_returns.iter().sum::<f64>() / log_returns.len() as f64;
        let annual_mean = mean * TRADING_DAYS_PER_YEAR as f64;
        Some((annual_mean - risk_free_rate) / (std * annualizer))
    });

    let high_52w = window.iter().map(|b| b.high).reduce(f64::max);
    let low_52w = window.iter().map(|b| b.low).reduce(f64::min);
    let pct_from_52w_high = match (closes.last(), high_52w) {
        (Some(&close), Some(high)) if high > 0.0 => Some((close / high - 1.0) * 100.0),
        _ => None,
    };

    RiskStats {
        volatility_30d: volatility(30),
        volatility_90d: volatility(90),
        sharpe,
        max_drawdown: max_drawdown(&closes),
        high_52w,
        low_52w,
        pct_from_52w_high,
    }
}

/// min over t of (price[t] / running_max[t] - 1) * 100.
pub fn max_drawdown(closes: &[f64]) -> Option<f64> {
    let first = *closes.first()?;
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &price in closes {
        if price > peak {
            peak = price;
        } else if peak > 0.0 {
            let dd = (price / peak - 1.0) * 100.0;
            if dd < worst {
                worst = dd;
            }
        }
    }
    Some(worst)
}

// PriceSeries closes are strictly positive.
fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| (w[1] / w[0]).ln())
        .collect()
}
