#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use equiscore::domain::error::EquiscoreError;
use equiscore::domain::metric_row::FundamentalsRecord;
pub use equiscore::domain::ohlcv::PriceBar;
use equiscore::ports::data_port::MarketDataPort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub fundamentals: HashMap<String, FundamentalsRecord>,
    pub errors: HashMap<String, String>,
    pub history_calls: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            fundamentals: HashMap::new(),
            errors: HashMap::new(),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_fundamentals(mut self, record: FundamentalsRecord) -> Self {
        self.fundamentals.insert(record.ticker.clone(), record);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_history(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, EquiscoreError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(ticker) {
            return Err(EquiscoreError::Upstream {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_fundamentals(&self, ticker: &str) -> Result<Option<FundamentalsRecord>, EquiscoreError> {
        Ok(self.fundamentals.get(ticker).cloned())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A bar with a 1% range around `close`.
pub fn make_bar(date: &str, close: f64) -> PriceBar {
    PriceBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 100_000,
    }
}

/// `n` weekday sessions from `start`, drifting by `drift` per session with a
/// deterministic oscillation so highs, lows and closes all move.
pub fn generate_bars(start: NaiveDate, n: usize, base: f64, drift: f64) -> Vec<PriceBar> {
    let mut bars = Vec::with_capacity(n);
    let mut day = start;
    let mut i = 0usize;
    while bars.len() < n {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            let t = i as f64;
            let close = base * (1.0 + drift).powf(t) * (1.0 + 0.03 * (t * 0.37).sin());
            let open = close * (1.0 + 0.004 * (t * 0.91).cos());
            bars.push(PriceBar {
                date: day,
                open,
                high: open.max(close) * (1.0 + 0.006 + 0.002 * (t * 0.53).sin().abs()),
                low: open.min(close) * (1.0 - 0.006 - 0.002 * (t * 0.71).cos().abs()),
                close,
                volume: 50_000 + ((i * 7919) % 20_000) as i64,
            });
            i += 1;
        }
        day = day.succ_opt().unwrap();
    }
    bars
}

pub fn fundamentals(ticker: &str, sector: &str, pe: f64, roe: f64) -> FundamentalsRecord {
    FundamentalsRecord {
        ticker: ticker.to_string(),
        company_name: Some(format!("{} Ltd", ticker)),
        sector: Some(sector.to_string()),
        pe: Some(pe),
        roe: Some(roe),
        ..FundamentalsRecord::default()
    }
}
