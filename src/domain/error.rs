//! Domain error types.

/// Top-level error type for equiscore.
#[derive(Debug, thiserror::Error)]
pub enum EquiscoreError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("upstream fetch failed for {ticker}: {reason}")]
    Upstream { ticker: String, reason: String },

    #[error("invalid price series for {ticker}: {source}")]
    InvalidSeries {
        ticker: String,
        #[source]
        source: SeriesError,
    },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("no stock in the universe could be enriched ({failed} failed)")]
    EmptyUniverse { failed: usize },

    #[error("template error: {reason}")]
    Template { reason: String },

    #[error("cache error: {reason}")]
    Cache { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A violation of the [`PriceSeries`](crate::domain::ohlcv::PriceSeries) invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("bar {date}: prices must be finite")]
    NonFinite { date: chrono::NaiveDate },

    #[error("bar {date}: prices must be positive")]
    NonPositive { date: chrono::NaiveDate },

    #[error("bar {date}: high/low do not bracket open and close")]
    BadRange { date: chrono::NaiveDate },

    #[error("bar {date}: negative volume {volume}")]
    NegativeVolume { date: chrono::NaiveDate, volume: i64 },

    #[error("dates not strictly ascending at {date}")]
    Unordered { date: chrono::NaiveDate },
}

impl From<&EquiscoreError> for std::process::ExitCode {
    fn from(err: &EquiscoreError) -> Self {
        let code: u8 = match err {
            EquiscoreError::Io(_) | EquiscoreError::Csv(_) => 1,
            EquiscoreError::ConfigParse { .. }
            | EquiscoreError::ConfigMissing { .. }
            | EquiscoreError::ConfigInvalid { .. } => 2,
            EquiscoreError::Cache { .. } => 3,
            EquiscoreError::Template { .. } => 4,
            EquiscoreError::Upstream { .. }
            | EquiscoreError::InvalidSeries { .. }
            | EquiscoreError::InsufficientData { .. }
            | EquiscoreError::EmptyUniverse { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_universe_message() {
        let err = EquiscoreError::EmptyUniverse { failed: 3 };
        assert_eq!(
            err.to_string(),
            "no stock in the universe could be enriched (3 failed)"
        );
    }

    #[test]
    fn invalid_series_keeps_source() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = EquiscoreError::InvalidSeries {
            ticker: "TCS".into(),
            source: SeriesError::Unordered { date },
        };
        assert!(err.to_string().contains("TCS"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
