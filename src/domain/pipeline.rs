//! Batch enrichment of a universe on a bounded worker pool.
//!
//! Tickers are processed in batches of `batch_size` on a rayon pool of
//! `max_workers` threads, sleeping `batch_delay` between batches to stay
//! within upstream rate limits. A failing ticker never aborts the batch: it
//! is reported and, when enabled, retried once in a serial pass.

use crate::domain::enrich::{enrich, EnrichParams};
use crate::domain::error::EquiscoreError;
use crate::domain::metric_row::{MetricRow, UniverseTable};
use crate::domain::ohlcv::PriceSeries;
use crate::ports::cache_port::IndicatorCachePort;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_workers: usize,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub retry_failed: bool,
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            batch_size: 10,
            batch_delay: Duration::ZERO,
            retry_failed: true,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Inclusive date range of history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: EquiscoreError,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    /// Successful rows in the order the tickers were given.
    pub universe: UniverseTable,
    /// Tickers that still failed after the retry pass.
    pub failures: Vec<TickerFailure>,
    /// How many tickers went through the retry pass.
    pub retried: usize,
}

/// Fetch, validate and enrich one ticker.
pub fn process_ticker(
    ticker: &str,
    data: &dyn MarketDataPort,
    window: HistoryWindow,
    params: &EnrichParams,
    cache: Option<&dyn IndicatorCachePort>,
) -> Result<MetricRow, EquiscoreError> {
    let bars = data.fetch_history(ticker, window.start, window.end)?;
    let series = PriceSeries::from_unsorted(bars).map_err(|source| EquiscoreError::InvalidSeries {
        ticker: ticker.to_string(),
        source,
    })?;

    // Fundamentals are optional; a failure here only costs those columns.
    let fundamentals = match data.fetch_fundamentals(ticker) {
        Ok(f) => f,
        Err(e) => {
            warn!(ticker, error = %e, "fundamentals unavailable");
            None
        }
    };

    enrich(ticker, &series, fundamentals, params, cache)
}

/// Enrich every ticker and assemble the universe.
///
/// Fails only when the pool cannot be built or no ticker succeeds.
pub fn run_enrichment(
    tickers: &[String],
    data: &dyn MarketDataPort,
    window: HistoryWindow,
    params: &EnrichParams,
    cache: Option<&dyn IndicatorCachePort>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, EquiscoreError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_workers.max(1))
        .build()
        .map_err(|e| EquiscoreError::ConfigInvalid {
            section: "pipeline".into(),
            key: "max_workers".into(),
            reason: e.to_string(),
        })?;

    let batch_size = config.batch_size.max(1);
    let mut slots: Vec<Option<MetricRow>> = vec![None; tickers.len()];
    let mut failed: Vec<(usize, EquiscoreError)> = Vec::new();

    for (batch, start) in (0..tickers.len()).step_by(batch_size).enumerate() {
        if batch > 0 && !config.batch_delay.is_zero() {
            thread::sleep(config.batch_delay);
        }
        let end = (start + batch_size).min(tickers.len());
        debug!(batch, from = start, to = end, "processing batch");

        let outcomes: Vec<(usize, Result<MetricRow, EquiscoreError>)> = pool.install(|| {
            (start..end)
                .into_par_iter()
                .map(|i| (i, process_ticker(&tickers[i], data, window, params, cache)))
                .collect()
        });

        for (i, outcome) in outcomes {
            match outcome {
                Ok(row) => slots[i] = Some(row),
                Err(e) => {
                    warn!(ticker = %tickers[i], error = %e, "enrichment failed");
                    failed.push((i, e));
                }
            }
        }
    }

    let retried = if config.retry_failed { failed.len() } else { 0 };
    if config.retry_failed && !failed.is_empty() {
        info!(count = failed.len(), "retrying failed tickers");
        let mut still_failed = Vec::new();
        for (i, _) in failed {
            thread::sleep(config.retry_delay);
            match process_ticker(&tickers[i], data, window, params, cache) {
                Ok(row) => {
                    info!(ticker = %tickers[i], "recovered on retry");
                    slots[i] = Some(row);
                }
                Err(e) => {
                    warn!(ticker = %tickers[i], error = %e, "retry failed");
                    still_failed.push((i, e));
                }
            }
        }
        failed = still_failed;
    }

    let failures: Vec<TickerFailure> = failed
        .into_iter()
        .map(|(i, error)| TickerFailure {
            ticker: tickers[i].clone(),
            error,
        })
        .collect();
    let rows: Vec<MetricRow> = slots.into_iter().flatten().collect();

    if rows.is_empty() {
        return Err(EquiscoreError::EmptyUniverse {
            failed: failures.len(),
        });
    }

    info!(
        succeeded = rows.len(),
        failed = failures.len(),
        "enrichment complete"
    );
    Ok(PipelineOutcome {
        universe: UniverseTable::new(rows),
        failures,
        retried,
    })
}
