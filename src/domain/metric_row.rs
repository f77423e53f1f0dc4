//! Per-stock metric rows and the universe table they form.

use crate::domain::indicator::snapshot::IndicatorSnapshot;
use crate::domain::returns::RiskStats;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub ticker: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// Fundamental ratios. Every field is optional; absence is never zero.
///
/// Ratios are plain numbers, margins/growth/yields are in percent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fundamentals {
    pub pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub pb: Option<f64>,
    pub ps: Option<f64>,
    pub peg: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub gross_margin: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fcf_yield: Option<f64>,
    pub interest_coverage: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub market_cap: Option<f64>,
    /// In [-1, 1].
    pub sentiment: Option<f64>,
    /// In [-1, 1].
    pub social_sentiment: Option<f64>,
    /// Analyst consensus, 1 = strong buy .. 5 = strong sell.
    pub analyst_rating: Option<f64>,
}

impl Fundamentals {
    /// `(source key, value)` for every field.
    pub fn as_pairs(&self) -> [(&'static str, Option<f64>); 20] {
        [
            ("pe", self.pe),
            ("forward_pe", self.forward_pe),
            ("pb", self.pb),
            ("ps", self.ps),
            ("peg", self.peg),
            ("roe", self.roe),
            ("roa", self.roa),
            ("operating_margin", self.operating_margin),
            ("net_margin", self.net_margin),
            ("gross_margin", self.gross_margin),
            ("revenue_growth", self.revenue_growth),
            ("earnings_growth", self.earnings_growth),
            ("dividend_yield", self.dividend_yield),
            ("fcf_yield", self.fcf_yield),
            ("interest_coverage", self.interest_coverage),
            ("debt_to_equity", self.debt_to_equity),
            ("market_cap", self.market_cap),
            ("sentiment", self.sentiment),
            ("social_sentiment", self.social_sentiment),
            ("analyst_rating", self.analyst_rating),
        ]
    }
}

/// One line of the fundamentals file. Unparseable numbers read as missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FundamentalsRecord {
    pub ticker: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pe: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub forward_pe: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pb: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub ps: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub peg: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub roe: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub roa: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub operating_margin: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub net_margin: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub gross_margin: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub revenue_growth: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub earnings_growth: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub dividend_yield: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fcf_yield: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub interest_coverage: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub debt_to_equity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub sentiment: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub social_sentiment: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub analyst_rating: Option<f64>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

impl FundamentalsRecord {
    pub fn into_parts(self) -> (Identity, Fundamentals) {
        let identity = Identity {
            ticker: self.ticker.trim().to_string(),
            company_name: non_blank(self.company_name),
            sector: non_blank(self.sector),
            industry: non_blank(self.industry),
        };
        let fundamentals = Fundamentals {
            pe: finite(self.pe),
            forward_pe: finite(self.forward_pe),
            pb: finite(self.pb),
            ps: finite(self.ps),
            peg: finite(self.peg),
            roe: finite(self.roe),
            roa: finite(self.roa),
            operating_margin: finite(self.operating_margin),
            net_margin: finite(self.net_margin),
            gross_margin: finite(self.gross_margin),
            revenue_growth: finite(self.revenue_growth),
            earnings_growth: finite(self.earnings_growth),
            dividend_yield: finite(self.dividend_yield),
            fcf_yield: finite(self.fcf_yield),
            interest_coverage: finite(self.interest_coverage),
            debt_to_equity: finite(self.debt_to_equity),
            market_cap: finite(self.market_cap),
            sentiment: finite(self.sentiment),
            social_sentiment: finite(self.social_sentiment),
            analyst_rating: finite(self.analyst_rating),
        };
        (identity, fundamentals)
    }
}

/// Everything computed for one stock in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub identity: Identity,
    pub fundamentals: Fundamentals,
    pub indicators: IndicatorSnapshot,
    /// Percent return keyed by window length in bars.
    pub returns: BTreeMap<usize, f64>,
    /// Fractional CAGR keyed by years.
    pub cagr: BTreeMap<u32, f64>,
    pub risk: RiskStats,
    pub last_close: f64,
    pub as_of: NaiveDate,
}

impl MetricRow {
    pub fn ticker(&self) -> &str {
        &self.identity.ticker
    }

    pub fn return_over(&self, window: usize) -> Option<f64> {
        self.returns.get(&window).copied()
    }

    /// Whether the last close sits above the named indicator value.
    pub fn above(&self, indicator: &str) -> Option<bool> {
        self.indicators.get(indicator).map(|v| self.last_close > v)
    }
}

/// The complete set of rows for a run, in a stable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniverseTable {
    rows: Vec<MetricRow>,
}

impl UniverseTable {
    pub fn new(rows: Vec<MetricRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.identity.ticker.clone()).collect()
    }

    /// Columnar projection of one metric across the universe.
    pub fn column<F>(&self, f: F) -> Vec<Option<f64>>
    where
        F: Fn(&MetricRow) -> Option<f64>,
    {
        self.rows.iter().map(f).collect()
    }

    /// Every return window present in at least one row, ascending.
    pub fn return_windows(&self) -> Vec<usize> {
        let mut windows: Vec<usize> = self
            .rows
            .iter()
            .flat_map(|r| r.returns.keys().copied())
            .collect();
        windows.sort_unstable();
        windows.dedup();
        windows
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn row(ticker: &str) -> MetricRow {
        MetricRow {
            identity: Identity {
                ticker: ticker.to_string(),
                ..Identity::default()
            },
            fundamentals: Fundamentals::default(),
            indicators: IndicatorSnapshot::default(),
            returns: BTreeMap::new(),
            cagr: BTreeMap::new(),
            risk: RiskStats::default(),
            last_close: 100.0,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        }
    }
}
