//! SQLite-backed indicator cache.
//!
//! One row per (ticker, as_of, params, indicator name). Entries older than
//! the TTL read as misses and are overwritten on the next put.

use crate::domain::error::EquiscoreError;
use crate::domain::indicator::snapshot::{Confidence, IndicatorSnapshot};
use crate::ports::cache_port::{CacheKey, IndicatorCachePort};
use crate::ports::config_port::ConfigPort;
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::Duration;

pub struct SqliteCacheAdapter {
    pool: Pool<SqliteConnectionManager>,
    ttl: Duration,
}

fn pool_error(e: r2d2::Error) -> EquiscoreError {
    EquiscoreError::Cache {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> EquiscoreError {
    EquiscoreError::Cache {
        reason: e.to_string(),
    }
}

impl SqliteCacheAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EquiscoreError> {
        let db_path = config
            .get_string("cache", "path")
            .ok_or_else(|| EquiscoreError::ConfigMissing {
                section: "cache".into(),
                key: "path".into(),
            })?;
        let ttl_hours = config.get_int("cache", "ttl_hours", 24).max(1) as u64;
        let pool_size = config.get_int("cache", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self {
            pool,
            ttl: Duration::from_secs(ttl_hours * 3600),
        };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory(ttl: Duration) -> Result<Self, EquiscoreError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool, ttl };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), EquiscoreError> {
        let conn = self.pool.get().map_err(pool_error)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS indicator_cache (
                ticker TEXT NOT NULL,
                as_of TEXT NOT NULL,
                params TEXT NOT NULL,
                name TEXT NOT NULL,
                value REAL,
                reduced INTEGER NOT NULL,
                computed_at INTEGER NOT NULL,
                PRIMARY KEY (ticker, as_of, params, name)
            );
            CREATE INDEX IF NOT EXISTS idx_indicator_cache_ticker ON indicator_cache(ticker);",
        )
        .map_err(query_error)?;
        Ok(())
    }

    /// Drop every expired entry. Returns the number of rows removed.
    pub fn purge_expired(&self) -> Result<usize, EquiscoreError> {
        let conn = self.pool.get().map_err(pool_error)?;
        conn.execute(
            "DELETE FROM indicator_cache WHERE computed_at < ?1",
            params![self.cutoff()],
        )
        .map_err(query_error)
    }

    fn cutoff(&self) -> i64 {
        Utc::now().timestamp() - self.ttl.as_secs() as i64
    }
}

impl IndicatorCachePort for SqliteCacheAdapter {
    fn get(&self, key: &CacheKey) -> Result<Option<IndicatorSnapshot>, EquiscoreError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let as_of = key.as_of.format("%Y-%m-%d").to_string();

        let mut stmt = conn
            .prepare(
                "SELECT name, value, reduced, computed_at FROM indicator_cache
                 WHERE ticker = ?1 AND as_of = ?2 AND params = ?3",
            )
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![key.ticker, as_of, key.params], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(query_error)?;

        let cutoff = self.cutoff();
        let mut snapshot = IndicatorSnapshot::default();
        for row in rows {
            let (name, value, reduced, computed_at) = row.map_err(query_error)?;
            if computed_at < cutoff {
                return Ok(None);
            }
            let confidence = if reduced {
                Confidence::Reduced
            } else {
                Confidence::Full
            };
            snapshot.insert_with(name, value, confidence);
        }

        Ok((!snapshot.is_empty()).then_some(snapshot))
    }

    fn put(&self, key: &CacheKey, snapshot: &IndicatorSnapshot) -> Result<(), EquiscoreError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let as_of = key.as_of.format("%Y-%m-%d").to_string();
        let now = Utc::now().timestamp();

        let tx = conn.transaction().map_err(query_error)?;
        tx.execute(
            "DELETE FROM indicator_cache WHERE ticker = ?1 AND as_of = ?2 AND params = ?3",
            params![key.ticker, as_of, key.params],
        )
        .map_err(query_error)?;
        for (name, entry) in snapshot.iter() {
            tx.execute(
                "INSERT INTO indicator_cache (ticker, as_of, params, name, value, reduced, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    key.ticker,
                    as_of,
                    key.params,
                    name,
                    entry.value,
                    entry.confidence == Confidence::Reduced,
                    now
                ],
            )
            .map_err(query_error)?;
        }
        tx.commit().map_err(query_error)?;
        Ok(())
    }
}
