//! Ticker list parsing for a run's universe.

use crate::domain::reconcile::normalize_ticker;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),

    #[error("ticker list is empty")]
    Empty,
}

/// Split a comma separated list into upper-cased tickers.
///
/// Exchange suffixes are kept (`RELIANCE.NS` stays as written, upper-cased)
/// but two entries naming the same normalized ticker are rejected.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::Empty);
    }

    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(normalize_ticker(&ticker)) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tickers_basic() {
        let result = parse_tickers("RELIANCE.NS,TCS.NS,INFY").unwrap();
        assert_eq!(result, vec!["RELIANCE.NS", "TCS.NS", "INFY"]);
    }

    #[test]
    fn test_parse_tickers_with_whitespace_and_case() {
        let result = parse_tickers("  reliance.ns , tcs ,Infy  ").unwrap();
        assert_eq!(result, vec!["RELIANCE.NS", "TCS", "INFY"]);
    }

    #[test]
    fn test_parse_tickers_empty_token() {
        assert_eq!(parse_tickers("TCS,,INFY"), Err(UniverseError::EmptyToken));
    }

    #[test]
    fn test_parse_tickers_empty_input() {
        assert_eq!(parse_tickers("   "), Err(UniverseError::Empty));
    }

    #[test]
    fn test_parse_tickers_duplicate_after_normalization() {
        let result = parse_tickers("TCS.NS,INFY,tcs.bo");
        assert!(matches!(result, Err(UniverseError::DuplicateTicker(s)) if s == "TCS.BO"));
    }
}
