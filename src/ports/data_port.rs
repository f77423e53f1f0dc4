//! Market data access port.

use crate::domain::error::EquiscoreError;
use crate::domain::metric_row::FundamentalsRecord;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

/// Source of raw per-ticker history and fundamentals.
///
/// Implementations are shared across enrichment workers.
pub trait MarketDataPort: Send + Sync {
    /// Daily bars in `[start_date, end_date]`. Order is not required;
    /// the caller validates and sorts.
    fn fetch_history(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, EquiscoreError>;

    /// `Ok(None)` when the source simply has no fundamentals for the ticker.
    fn fetch_fundamentals(&self, ticker: &str) -> Result<Option<FundamentalsRecord>, EquiscoreError>;
}
