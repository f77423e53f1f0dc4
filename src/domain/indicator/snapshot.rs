//! End-of-series indicator snapshot.
//!
//! Runs the canonical indicator set over a price history and keeps the value
//! at the final bar under a stable display name ("SMA50", "RSI14",
//! "MACD Line", ...). Missing history yields `None` for that name only.

use crate::domain::indicator::bollinger::{self, bollinger_at_end};
use crate::domain::indicator::{
    adx, aroon, calculate_adx, calculate_aroon, calculate_atr, calculate_macd, calculate_obv,
    calculate_rsi, calculate_stochastic, macd, sma::sma_last, stochastic, IndicatorValue,
};
use crate::domain::ohlcv::PriceBar;
use std::collections::BTreeMap;

pub const MACD_LINE: &str = "MACD Line";
pub const MACD_SIGNAL: &str = "MACD Signal";
pub const MACD_HISTOGRAM: &str = "MACD Histogram";
pub const BB_UPPER: &str = "BB Upper";
pub const BB_MIDDLE: &str = "BB Middle";
pub const BB_LOWER: &str = "BB Lower";
pub const OBV: &str = "OBV";
pub const PLUS_DI: &str = "+DI";
pub const MINUS_DI: &str = "-DI";
pub const AROON_UP: &str = "Aroon Up";
pub const AROON_DOWN: &str = "Aroon Down";
pub const STOCH_K: &str = "Stoch %K";
pub const STOCH_D: &str = "Stoch %D";

pub fn sma_name(window: usize) -> String {
    format!("SMA{}", window)
}

pub fn rsi_name(period: usize) -> String {
    format!("RSI{}", period)
}

pub fn atr_name(period: usize) -> String {
    format!("ATR{}", period)
}

pub fn adx_name(period: usize) -> String {
    format!("ADX{}", period)
}

/// Window parameters for the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub sma_windows: Vec<usize>,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    pub bollinger_period: usize,
    pub bollinger_min_period: usize,
    pub bollinger_mult_x100: u32,
    pub adx_period: usize,
    pub aroon_period: usize,
    pub stoch_k: usize,
    pub stoch_d: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_windows: vec![20, 50, 200],
            rsi_period: 14,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            atr_period: 14,
            bollinger_period: bollinger::DEFAULT_PERIOD,
            bollinger_min_period: bollinger::MIN_FALLBACK_PERIOD,
            bollinger_mult_x100: bollinger::DEFAULT_MULT_X100,
            adx_period: adx::DEFAULT_PERIOD,
            aroon_period: aroon::DEFAULT_PERIOD,
            stoch_k: stochastic::DEFAULT_K_PERIOD,
            stoch_d: stochastic::DEFAULT_D_PERIOD,
        }
    }
}

impl IndicatorParams {
    /// Stable text form of every window, used to key cached snapshots.
    pub fn fingerprint(&self) -> String {
        let smas: Vec<String> = self.sma_windows.iter().map(|w| w.to_string()).collect();
        format!(
            "sma={};rsi={};macd={},{},{};atr={};bb={},{},{};adx={};aroon={};stoch={},{}",
            smas.join(","),
            self.rsi_period,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
            self.atr_period,
            self.bollinger_period,
            self.bollinger_min_period,
            self.bollinger_mult_x100,
            self.adx_period,
            self.aroon_period,
            self.stoch_k,
            self.stoch_d,
        )
    }

    /// The two longest SMA windows, ascending. Scoring flags whether the
    /// close sits above each of them.
    pub fn trend_windows(&self) -> Vec<usize> {
        let mut windows = self.sma_windows.clone();
        windows.sort_unstable();
        windows.dedup();
        let keep = windows.len().saturating_sub(2);
        windows.split_off(keep)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Full,
    /// Computed from less history than the nominal window.
    Reduced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
    pub value: Option<f64>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorSnapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl IndicatorSnapshot {
    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.insert_with(name, value, Confidence::Full);
    }

    pub fn insert_with(&mut self, name: impl Into<String>, value: Option<f64>, confidence: Confidence) {
        // Non-finite results are as good as missing.
        let value = value.filter(|v| v.is_finite());
        self.entries
            .insert(name.into(), SnapshotEntry { value, confidence });
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.get(name).and_then(|e| e.value)
    }

    pub fn confidence(&self, name: &str) -> Option<Confidence> {
        self.entries.get(name).map(|e| e.confidence)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the full snapshot at the last bar of `bars`.
pub fn compute_snapshot(bars: &[PriceBar], params: &IndicatorParams) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::default();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    for &window in &params.sma_windows {
        snap.insert(sma_name(window), sma_last(&closes, window));
    }

    snap.insert(
        rsi_name(params.rsi_period),
        calculate_rsi(bars, params.rsi_period).last_simple(),
    );

    let macd = calculate_macd(bars, params.macd_fast, params.macd_slow, params.macd_signal);
    let (line, signal, histogram) = match macd.last_valid() {
        Some(IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) => (Some(*line), Some(*signal), Some(*histogram)),
        _ => (None, None, None),
    };
    snap.insert(MACD_LINE, line);
    snap.insert(MACD_SIGNAL, signal);
    snap.insert(MACD_HISTOGRAM, histogram);

    snap.insert(
        atr_name(params.atr_period),
        calculate_atr(bars, params.atr_period).last_simple(),
    );

    let band = bollinger_at_end(
        bars,
        params.bollinger_period,
        params.bollinger_min_period,
        params.bollinger_mult_x100,
    );
    match band {
        Some((
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
            window,
        )) => {
            let confidence = if window < params.bollinger_period {
                Confidence::Reduced
            } else {
                Confidence::Full
            };
            snap.insert_with(BB_UPPER, Some(upper), confidence);
            snap.insert_with(BB_MIDDLE, Some(middle), confidence);
            snap.insert_with(BB_LOWER, Some(lower), confidence);
        }
        _ => {
            snap.insert(BB_UPPER, None);
            snap.insert(BB_MIDDLE, None);
            snap.insert(BB_LOWER, None);
        }
    }

    snap.insert(OBV, calculate_obv(bars).last_simple());

    let (adx, plus_di, minus_di) = match calculate_adx(bars, params.adx_period).last_valid() {
        Some(IndicatorValue::Adx {
            adx,
            plus_di,
            minus_di,
        }) => (Some(*adx), Some(*plus_di), Some(*minus_di)),
        _ => (None, None, None),
    };
    snap.insert(adx_name(params.adx_period), adx);
    snap.insert(PLUS_DI, plus_di);
    snap.insert(MINUS_DI, minus_di);

    let (up, down) = match calculate_aroon(bars, params.aroon_period).last_valid() {
        Some(IndicatorValue::Aroon { up, down }) => (Some(*up), Some(*down)),
        _ => (None, None),
    };
    snap.insert(AROON_UP, up);
    snap.insert(AROON_DOWN, down);

    let (k, d) = match calculate_stochastic(bars, params.stoch_k, params.stoch_d).last_valid() {
        Some(IndicatorValue::Stochastic { k, d }) => (Some(*k), Some(*d)),
        _ => (None, None),
    };
    snap.insert(STOCH_K, k);
    snap.insert(STOCH_D, d);

    snap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 * 0.2 + (i as f64 / 5.0).sin() * 4.0)
            .collect()
    }

    #[test]
    fn short_history_leaves_long_windows_missing() {
        let snap = compute_snapshot(&make_bars(&wave(60)), &IndicatorParams::default());

        assert!(snap.get("SMA20").is_some());
        assert!(snap.get("SMA50").is_some());
        assert!(snap.contains("SMA200"));
        assert_eq!(snap.get("SMA200"), None);
        assert!(snap.get("RSI14").is_some());
        assert!(snap.get(MACD_LINE).is_some());
    }

    #[test]
    fn every_name_present_even_without_history() {
        let snap = compute_snapshot(&make_bars(&wave(3)), &IndicatorParams::default());
        for name in [MACD_LINE, BB_UPPER, OBV, PLUS_DI, AROON_UP, STOCH_D, "ADX14", "ATR14"] {
            assert!(snap.contains(name), "{} missing", name);
        }
        assert_eq!(snap.get(BB_MIDDLE), None);
        assert_eq!(snap.get("RSI14"), None);
        // OBV needs no warmup
        assert_eq!(snap.get(OBV), Some(0.0));
    }

    #[test]
    fn bollinger_fallback_is_flagged() {
        let snap = compute_snapshot(&make_bars(&wave(15)), &IndicatorParams::default());
        assert!(snap.get(BB_MIDDLE).is_some());
        assert_eq!(snap.confidence(BB_MIDDLE), Some(Confidence::Reduced));

        let snap = compute_snapshot(&make_bars(&wave(40)), &IndicatorParams::default());
        assert_eq!(snap.confidence(BB_MIDDLE), Some(Confidence::Full));
    }

    #[test]
    fn fingerprint_tracks_windows() {
        let base = IndicatorParams::default();
        let other = IndicatorParams {
            rsi_period: 21,
            ..IndicatorParams::default()
        };
        assert_eq!(base.fingerprint(), IndicatorParams::default().fingerprint());
        assert_ne!(base.fingerprint(), other.fingerprint());
        assert!(base.fingerprint().starts_with("sma=20,50,200;rsi=14;macd=12,26,9"));
    }

    #[test]
    fn trend_windows_are_the_two_longest() {
        assert_eq!(IndicatorParams::default().trend_windows(), vec![50, 200]);
        let custom = IndicatorParams {
            sma_windows: vec![100, 10, 30, 100],
            ..IndicatorParams::default()
        };
        assert_eq!(custom.trend_windows(), vec![30, 100]);
        let single = IndicatorParams {
            sma_windows: vec![40],
            ..IndicatorParams::default()
        };
        assert_eq!(single.trend_windows(), vec![40]);
    }

    #[test]
    fn non_finite_values_become_missing() {
        let mut snap = IndicatorSnapshot::default();
        snap.insert("X", Some(f64::NAN));
        assert!(snap.contains("X"));
        assert_eq!(snap.get("X"), None);
    }
}
