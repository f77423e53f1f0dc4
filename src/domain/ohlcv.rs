//! Price bars and validated price series.

use crate::domain::error::SeriesError;
use chrono::NaiveDate;

/// One trading session.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn check(&self) -> Result<(), SeriesError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(SeriesError::NonFinite { date: self.date });
        }
        if prices.iter().any(|p| *p <= 0.0) {
            return Err(SeriesError::NonPositive { date: self.date });
        }
        if self.high < self.open.max(self.close) || self.low > self.open.min(self.close) {
            return Err(SeriesError::BadRange { date: self.date });
        }
        if self.volume < 0 {
            return Err(SeriesError::NegativeVolume {
                date: self.date,
                volume: self.volume,
            });
        }
        Ok(())
    }
}

/// Bars of one instrument, strictly ascending by date.
///
/// The only way to build one is [`PriceSeries::new`], which enforces the bar
/// and ordering invariants, so every consumer can index without re-checking.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        for bar in &bars {
            bar.check()?;
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::Unordered { date: pair[1].date });
            }
        }
        Ok(Self { bars })
    }

    /// Sorts by date before validating. Duplicate dates are still rejected.
    pub fn from_unsorted(mut bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        bars.sort_by_key(|b| b.date);
        Self::new(bars)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The trailing `n` bars (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}
