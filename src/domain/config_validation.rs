//! Configuration validation.
//!
//! Validates every config field up front, before any data is fetched.

use crate::domain::error::EquiscoreError;
use crate::domain::scoring::ScoreWeights;
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Everything `analyze` needs.
pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    validate_data_config(config)?;
    validate_tickers(config)?;
    validate_indicators(config)?;
    validate_risk_free_rate(config)?;
    validate_weights(config)?;
    validate_macro_score(config)?;
    validate_aggregation(config)?;
    validate_pipeline(config)?;
    validate_cache(config)?;
    Ok(())
}

/// The subset needed by single-ticker commands.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    validate_price_dir(config)?;
    validate_dates(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EquiscoreError {
    EquiscoreError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_price_dir(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    match config.get_string("data", "price_dir") {
        Some(_) => Ok(()),
        None => Err(EquiscoreError::ConfigMissing {
            section: "data".to_string(),
            key: "price_dir".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    let start = parse_optional_date(config, "data", "start_date")?;
    let end = parse_optional_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid("data", "start_date", "start_date must be before end_date"));
        }
    }
    Ok(())
}

/// A `YYYY-MM-DD` value, or `None` when the key is absent.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, EquiscoreError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid(section, key, format!("invalid {} format, expected YYYY-MM-DD", key))),
    }
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    match config.get_string("data", "tickers") {
        Some(s) => parse_tickers(&s)
            .map(|_| ())
            .map_err(|e| invalid("data", "tickers", e.to_string())),
        None => Err(EquiscoreError::ConfigMissing {
            section: "data".to_string(),
            key: "tickers".to_string(),
        }),
    }
}

/// Comma separated positive integers, e.g. `20,50,200`.
pub fn parse_window_list(section: &str, key: &str, raw: &str) -> Result<Vec<usize>, EquiscoreError> {
    raw.split(',')
        .map(|token| {
            token
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|w| *w > 0)
                .ok_or_else(|| invalid(section, key, format!("'{}' is not a positive integer", token.trim())))
        })
        .collect()
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    for key in ["sma_windows", "return_windows", "cagr_years"] {
        if let Some(raw) = config.get_string("indicators", key) {
            parse_window_list("indicators", key, &raw)?;
        }
    }
    if config.get_int("indicators", "rsi_period", 14) < 1 {
        return Err(invalid("indicators", "rsi_period", "rsi_period must be at least 1"));
    }
    if let Some(raw) = config.get_string("indicators", "macd") {
        let parts = parse_window_list("indicators", "macd", &raw)?;
        match parts.as_slice() {
            [fast, slow, _signal] if fast < slow => {}
            [_, _, _] => return Err(invalid("indicators", "macd", "fast period must be below slow period")),
            _ => return Err(invalid("indicators", "macd", "expected fast,slow,signal")),
        }
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    let value = config.get_double("risk", "risk_free_rate", 0.065);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid("risk", "risk_free_rate", "risk_free_rate must be between 0 and 1"));
    }
    Ok(())
}

pub const WEIGHT_KEYS: [&str; 5] = [
    "weight_fundamental",
    "weight_technical",
    "weight_sentiment",
    "weight_macro",
    "weight_risk",
];

/// Raw weights from `[scoring]`, defaulting each missing key.
pub fn read_weights(config: &dyn ConfigPort) -> [f64; 5] {
    let defaults = [0.40, 0.25, 0.15, 0.10, 0.10];
    let mut raw = [0.0; 5];
    for (i, key) in WEIGHT_KEYS.iter().enumerate() {
        raw[i] = config.get_double("scoring", key, defaults[i]);
    }
    raw
}

fn validate_weights(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    ScoreWeights::new(read_weights(config))
        .map(|_| ())
        .map_err(|e| invalid("scoring", "weights", e.to_string()))
}

fn validate_macro_score(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    let value = config.get_double("scoring", "macro_score", 50.0);
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid("scoring", "macro_score", "macro_score must be between 0 and 100"));
    }
    Ok(())
}

fn validate_aggregation(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    for (key, default) in [("weeks", 52), ("months", 24), ("seasonality_years", 5)] {
        if config.get_int("aggregation", key, default) < 1 {
            return Err(invalid("aggregation", key, format!("{} must be at least 1", key)));
        }
    }
    Ok(())
}

fn validate_pipeline(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    for (key, default) in [("max_workers", 4), ("batch_size", 10)] {
        if config.get_int("pipeline", key, default) < 1 {
            return Err(invalid("pipeline", key, format!("{} must be at least 1", key)));
        }
    }
    for key in ["batch_delay_ms", "retry_delay_ms"] {
        if config.get_int("pipeline", key, 0) < 0 {
            return Err(invalid("pipeline", key, format!("{} must be non-negative", key)));
        }
    }
    Ok(())
}

fn validate_cache(config: &dyn ConfigPort) -> Result<(), EquiscoreError> {
    if config.get_int("cache", "ttl_hours", 24) < 1 {
        return Err(invalid("cache", "ttl_hours", "ttl_hours must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[data]
price_dir = data/prices
start_date = 2018-01-01
end_date = 2024-12-31
tickers = RELIANCE.NS,TCS.NS

[indicators]
sma_windows = 20,50,200
macd = 12,26,9

[scoring]
weight_fundamental = 0.5
weight_technical = 0.5
weight_sentiment = 0
weight_macro = 0
weight_risk = 0
"#;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn assert_invalid(content: &str, expected_key: &str) {
        match validate_analysis_config(&config(content)) {
            Err(EquiscoreError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {}, got {:?}", expected_key, other),
        }
    }

    #[test]
    fn valid_config_passes() {
        validate_analysis_config(&config(VALID)).unwrap();
    }

    #[test]
    fn missing_price_dir() {
        let err = validate_analysis_config(&config("[data]\ntickers = TCS\n")).unwrap_err();
        assert!(matches!(err, EquiscoreError::ConfigMissing { ref key, .. } if key == "price_dir"));
    }

    #[test]
    fn missing_tickers() {
        let err = validate_analysis_config(&config("[data]\nprice_dir = x\n")).unwrap_err();
        assert!(matches!(err, EquiscoreError::ConfigMissing { ref key, .. } if key == "tickers"));
    }

    #[test]
    fn duplicate_tickers() {
        assert_invalid("[data]\nprice_dir = x\ntickers = TCS.NS,TCS\n", "tickers");
    }

    #[test]
    fn reversed_dates() {
        assert_invalid(
            "[data]\nprice_dir = x\ntickers = TCS\nstart_date = 2024-01-01\nend_date = 2023-01-01\n",
            "start_date",
        );
    }

    #[test]
    fn bad_date_format() {
        assert_invalid("[data]\nprice_dir = x\ntickers = TCS\nend_date = 31/12/2024\n", "end_date");
    }

    #[test]
    fn bad_window_list() {
        let content = format!("{}\n", VALID.replace("sma_windows = 20,50,200", "sma_windows = 20,abc"));
        assert_invalid(&content, "sma_windows");
    }

    #[test]
    fn macd_fast_must_be_below_slow() {
        assert_invalid(&VALID.replace("macd = 12,26,9", "macd = 26,12,9"), "macd");
        assert_invalid(&VALID.replace("macd = 12,26,9", "macd = 12,26"), "macd");
    }

    #[test]
    fn zero_weights_rejected() {
        let content = VALID
            .replace("weight_fundamental = 0.5", "weight_fundamental = 0")
            .replace("weight_technical = 0.5", "weight_technical = 0");
        assert_invalid(&content, "weights");
    }

    #[test]
    fn negative_weight_rejected() {
        assert_invalid(&VALID.replace("weight_risk = 0", "weight_risk = -1"), "weights");
    }

    #[test]
    fn macro_score_range() {
        let content = format!("{}\nmacro_score = 120\n", VALID);
        assert_invalid(&content, "macro_score");
    }

    #[test]
    fn pipeline_workers() {
        let content = format!("{}\n[pipeline]\nmax_workers = 0\n", VALID);
        assert_invalid(&content, "max_workers");
    }

    #[test]
    fn cache_ttl() {
        let content = format!("{}\n[cache]\nttl_hours = 0\n", VALID);
        assert_invalid(&content, "ttl_hours");
    }

    #[test]
    fn window_list_parses() {
        assert_eq!(parse_window_list("s", "k", " 5, 21 ,63").unwrap(), vec![5, 21, 63]);
        assert!(parse_window_list("s", "k", "5,0").is_err());
    }

    #[test]
    fn weights_default_when_absent() {
        let raw = read_weights(&config("[data]\n"));
        assert_eq!(raw, [0.40, 0.25, 0.15, 0.10, 0.10]);
    }
}
