//! Port traits (hexagonal boundary).

pub mod cache_port;
pub mod config_port;
pub mod data_port;
pub mod table_port;
