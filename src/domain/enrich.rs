//! Per-stock enrichment: one validated price history in, one MetricRow out.

use crate::domain::error::EquiscoreError;
use crate::domain::indicator::snapshot::{compute_snapshot, IndicatorParams, IndicatorSnapshot};
use crate::domain::metric_row::{FundamentalsRecord, Identity, MetricRow};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::returns::{cagr, compute_returns, compute_risk};
use crate::ports::cache_port::{CacheKey, IndicatorCachePort};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Fewest bars a stock needs to produce a row at all.
pub const MIN_ENRICH_BARS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichParams {
    pub indicators: IndicatorParams,
    pub return_windows: Vec<usize>,
    pub cagr_years: Vec<u32>,
    /// Annual, as a fraction.
    pub risk_free_rate: f64,
}

impl Default for EnrichParams {
    fn default() -> Self {
        Self {
            indicators: IndicatorParams::default(),
            return_windows: vec![5, 21, 63, 126, 252],
            cagr_years: vec![1, 3, 5],
            risk_free_rate: 0.065,
        }
    }
}

/// Build the MetricRow for `ticker`.
///
/// Statistics that lack history are left missing; only a series too short to
/// have a last close and one return is an error.
pub fn enrich(
    ticker: &str,
    series: &PriceSeries,
    fundamentals: Option<FundamentalsRecord>,
    params: &EnrichParams,
    cache: Option<&dyn IndicatorCachePort>,
) -> Result<MetricRow, EquiscoreError> {
    let last = match series.last() {
        Some(bar) if series.len() >= MIN_ENRICH_BARS => bar,
        _ => {
            return Err(EquiscoreError::InsufficientData {
                ticker: ticker.to_string(),
                bars: series.len(),
                minimum: MIN_ENRICH_BARS,
            })
        }
    };

    let (identity, fundamentals) = match fundamentals {
        Some(record) => {
            let (identity, fundamentals) = record.into_parts();
            (
                Identity {
                    ticker: ticker.to_string(),
                    ..identity
                },
                fundamentals,
            )
        }
        None => (
            Identity {
                ticker: ticker.to_string(),
                ..Identity::default()
            },
            Default::default(),
        ),
    };

    let indicators = snapshot(ticker, series, &params.indicators, cache);
    let returns = compute_returns(series, &params.return_windows);
    let cagr: BTreeMap<u32, f64> = params
        .cagr_years
        .iter()
        .filter_map(|&years| cagr(series, years).map(|v| (years, v)))
        .collect();
    let risk = compute_risk(series, params.risk_free_rate);

    debug!(
        ticker,
        bars = series.len(),
        indicators = indicators.len(),
        "enriched"
    );

    Ok(MetricRow {
        identity,
        fundamentals,
        indicators,
        returns,
        cagr,
        risk,
        last_close: last.close,
        as_of: last.date,
    })
}

fn snapshot(
    ticker: &str,
    series: &PriceSeries,
    params: &IndicatorParams,
    cache: Option<&dyn IndicatorCachePort>,
) -> IndicatorSnapshot {
    let (Some(cache), Some(last)) = (cache, series.last()) else {
        return compute_snapshot(series.bars(), params);
    };
    let key = CacheKey {
        ticker: ticker.to_string(),
        as_of: last.date,
        params: params.fingerprint(),
    };

    match cache.get(&key) {
        Ok(Some(snapshot)) => {
            debug!(ticker, as_of = %key.as_of, "indicator cache hit");
            return snapshot;
        }
        Ok(None) => debug!(ticker, "indicator cache miss"),
        Err(e) => warn!(ticker, error = %e, "indicator cache read failed, recomputing"),
    }

    let snapshot = compute_snapshot(series.bars(), params);
    if let Err(e) = cache.put(&key, &snapshot) {
        warn!(ticker, error = %e, "indicator cache write failed");
    }
    snapshot
}
