//! Core domain types and logic.

pub mod aggregation;
pub mod config_validation;
pub mod enrich;
pub mod error;
pub mod indicator;
pub mod metric_row;
pub mod ohlcv;
pub mod pipeline;
pub mod reconcile;
pub mod returns;
pub mod scoring;
pub mod universe;
