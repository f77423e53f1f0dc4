//! CSV file market data adapter.
//!
//! Prices live in one `{TICKER}.csv` per ticker under a base directory
//! (`date,open,high,low,close,volume`); fundamentals live in a single CSV
//! keyed by a `ticker` column and are loaded once.

use crate::domain::error::EquiscoreError;
use crate::domain::metric_row::FundamentalsRecord;
use crate::domain::ohlcv::PriceBar;
use crate::domain::reconcile::normalize_ticker;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
    fundamentals: HashMap<String, FundamentalsRecord>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            fundamentals: HashMap::new(),
        }
    }

    /// Load the fundamentals file. Rows are keyed by normalized ticker.
    pub fn with_fundamentals(mut self, path: &Path) -> Result<Self, EquiscoreError> {
        let mut rdr = csv::Reader::from_path(path).map_err(|e| EquiscoreError::Upstream {
            ticker: "*".into(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        for result in rdr.deserialize() {
            let record: FundamentalsRecord = result?;
            self.fundamentals
                .entry(normalize_ticker(&record.ticker))
                .or_insert(record);
        }
        Ok(self)
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        let exact = self.base_path.join(format!("{}.csv", ticker));
        if exact.exists() {
            return exact;
        }
        self.base_path.join(format!("{}.csv", normalize_ticker(ticker)))
    }
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str, ticker: &str) -> Result<&'a str, EquiscoreError> {
    record.get(idx).map(str::trim).ok_or_else(|| EquiscoreError::Upstream {
        ticker: ticker.to_string(),
        reason: format!("missing {} column", name),
    })
}

fn number<T: std::str::FromStr>(raw: &str, name: &str, ticker: &str) -> Result<T, EquiscoreError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| EquiscoreError::Upstream {
        ticker: ticker.to_string(),
        reason: format!("invalid {} value '{}': {}", name, raw, e),
    })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_history(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, EquiscoreError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| EquiscoreError::Upstream {
            ticker: ticker.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result?;

            let date_str = field(&record, 0, "date", ticker)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                EquiscoreError::Upstream {
                    ticker: ticker.to_string(),
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            // Volume is sometimes exported as a float.
            let volume_raw = field(&record, 5, "volume", ticker)?;
            let volume = match volume_raw.parse::<i64>() {
                Ok(v) => v,
                Err(_) => number::<f64>(volume_raw, "volume", ticker)?.round() as i64,
            };

            bars.push(PriceBar {
                date,
                open: number(field(&record, 1, "open", ticker)?, "open", ticker)?,
                high: number(field(&record, 2, "high", ticker)?, "high", ticker)?,
                low: number(field(&record, 3, "low", ticker)?, "low", ticker)?,
                close: number(field(&record, 4, "close", ticker)?, "close", ticker)?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn fetch_fundamentals(&self, ticker: &str) -> Result<Option<FundamentalsRecord>, EquiscoreError> {
        Ok(self.fundamentals.get(&normalize_ticker(ticker)).cloned())
    }
}
