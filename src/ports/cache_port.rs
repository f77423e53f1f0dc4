//! Optional indicator cache port.

use crate::domain::error::EquiscoreError;
use crate::domain::indicator::snapshot::IndicatorSnapshot;
use chrono::NaiveDate;

/// Identifies one cached snapshot.
///
/// `as_of` is the date of the last bar the snapshot was computed from, and
/// `params` fingerprints the indicator windows, so a hit is always the same
/// computation over the same history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub params: String,
}

/// Advisory snapshot store. A miss or an error must always be safe to
/// ignore; entries older than the adapter's TTL are reported as misses.
pub trait IndicatorCachePort: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<IndicatorSnapshot>, EquiscoreError>;
    fn put(&self, key: &CacheKey, snapshot: &IndicatorSnapshot) -> Result<(), EquiscoreError>;
}
