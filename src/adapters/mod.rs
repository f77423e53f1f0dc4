//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_table_adapter;
pub mod file_config_adapter;
pub mod memory_cache_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_cache_adapter;
