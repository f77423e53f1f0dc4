//! In-process indicator cache with a TTL.

use crate::domain::error::EquiscoreError;
use crate::domain::indicator::snapshot::IndicatorSnapshot;
use crate::ports::cache_port::{CacheKey, IndicatorCachePort};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct MemoryCacheAdapter {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, IndicatorSnapshot)>>,
}

impl MemoryCacheAdapter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> EquiscoreError {
    EquiscoreError::Cache {
        reason: "cache lock poisoned".into(),
    }
}

impl IndicatorCachePort for MemoryCacheAdapter {
    fn get(&self, key: &CacheKey) -> Result<Option<IndicatorSnapshot>, EquiscoreError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        match entries.get(key) {
            Some((stored, snapshot)) if stored.elapsed() <= self.ttl => Ok(Some(snapshot.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, snapshot: &IndicatorSnapshot) -> Result<(), EquiscoreError> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.clone(), (Instant::now(), snapshot.clone()));
        Ok(())
    }
}
