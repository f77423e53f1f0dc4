//! Cross-sectional scoring: percentile ranks, pillar sub-scores and the
//! weighted composite.
//!
//! Everything here works on a complete [`UniverseTable`]; a rank is only
//! meaningful against the whole distribution of the run.

use crate::domain::indicator::snapshot::{adx_name, sma_name, IndicatorParams};
use crate::domain::metric_row::{MetricRow, UniverseTable};
use std::cmp::Ordering;
use std::fmt;

pub const DEFAULT_MACRO_SCORE: f64 = 50.0;

/// Percentile rank in `(0, 100]` with average ranks for ties.
///
/// `pct = avg_rank / n_valid * 100`, then `100 - pct` when lower values are
/// better. Missing inputs stay missing, and with one or no valid value every
/// output is missing.
pub fn percentile_rank(values: &[Option<f64>], higher_is_better: bool) -> Vec<Option<f64>> {
    let mut valid: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();
    let mut ranks = vec![None; values.len()];
    if valid.len() <= 1 {
        return ranks;
    }

    valid.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    let n = valid.len() as f64;

    let mut start = 0;
    while start < valid.len() {
        let mut end = start;
        while end + 1 < valid.len() && valid[end + 1].1 == valid[start].1 {
            end += 1;
        }
        // positions start..=end hold ranks start+1 ..= end+1
        let avg_rank = (start + end + 2) as f64 / 2.0;
        let pct = avg_rank / n * 100.0;
        let pct = if higher_is_better { pct } else { 100.0 - pct };
        for &(idx, _) in &valid[start..=end] {
            ranks[idx] = Some(pct);
        }
        start = end + 1;
    }
    ranks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pillar {
    Fundamental,
    Technical,
    Sentiment,
    Macro,
    Risk,
}

impl Pillar {
    pub const ALL: [Pillar; 5] = [
        Pillar::Fundamental,
        Pillar::Technical,
        Pillar::Sentiment,
        Pillar::Macro,
        Pillar::Risk,
    ];
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pillar::Fundamental => "Fundamental",
            Pillar::Technical => "Technical",
            Pillar::Sentiment => "Sentiment",
            Pillar::Macro => "Macro",
            Pillar::Risk => "Risk",
        };
        f.write_str(name)
    }
}

/// Pillar scores for one stock, each in `[0, 100]` when present.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubScores {
    pub fundamental: Option<f64>,
    pub technical: Option<f64>,
    pub sentiment: Option<f64>,
    pub macro_score: Option<f64>,
    pub risk: Option<f64>,
}

impl SubScores {
    pub fn get(&self, pillar: Pillar) -> Option<f64> {
        match pillar {
            Pillar::Fundamental => self.fundamental,
            Pillar::Technical => self.technical,
            Pillar::Sentiment => self.sentiment,
            Pillar::Macro => self.macro_score,
            Pillar::Risk => self.risk,
        }
    }
}

/// Sub-scores aligned with the rows of the universe they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubScoreTable {
    pub tickers: Vec<String>,
    pub scores: Vec<SubScores>,
}

impl SubScoreTable {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

type Extractor = fn(&MetricRow) -> Option<f64>;

/// P/E and PEG only carry meaning when positive.
fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x > 0.0)
}

const FUNDAMENTAL_HIGHER: [Extractor; 10] = [
    |r| r.fundamentals.roe,
    |r| r.fundamentals.roa,
    |r| r.fundamentals.operating_margin,
    |r| r.fundamentals.net_margin,
    |r| r.fundamentals.gross_margin,
    |r| r.fundamentals.revenue_growth,
    |r| r.fundamentals.earnings_growth,
    |r| r.fundamentals.dividend_yield,
    |r| r.fundamentals.fcf_yield,
    |r| r.fundamentals.interest_coverage,
];

const FUNDAMENTAL_LOWER: [Extractor; 5] = [
    |r| positive(r.fundamentals.pe),
    |r| r.fundamentals.pb,
    |r| r.fundamentals.ps,
    |r| r.fundamentals.debt_to_equity,
    |r| positive(r.fundamentals.peg),
];

const RISK_LOWER: [Extractor; 3] = [
    |r| r.risk.volatility_30d,
    |r| r.risk.volatility_90d,
    |r| r.fundamentals.debt_to_equity,
];

// Drawdown is non-positive, so a higher value is a shallower fall.
const RISK_HIGHER: [Extractor; 3] = [
    |r| r.risk.max_drawdown,
    |r| r.risk.sharpe,
    |r| r.fundamentals.interest_coverage,
];

/// Ranked columns for a set of extractors.
fn ranked(universe: &UniverseTable, extractors: &[Extractor], higher_is_better: bool) -> Vec<Vec<Option<f64>>> {
    extractors
        .iter()
        .map(|f| percentile_rank(&universe.column(f), higher_is_better))
        .collect()
}

/// Row-wise mean over the present components.
fn row_means(columns: &[Vec<Option<f64>>], rows: usize) -> Vec<Option<f64>> {
    (0..rows)
        .map(|i| mean(columns.iter().filter_map(|c| c[i])))
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn sentiment_score(row: &MetricRow) -> Option<f64> {
    let rescale = |s: f64| ((s + 1.0) * 50.0).clamp(0.0, 100.0);
    let f = &row.fundamentals;
    let parts = [
        f.sentiment.map(rescale),
        f.social_sentiment.map(rescale),
        f.analyst_rating
            .map(|r| ((5.0 - r.clamp(1.0, 5.0)) / 4.0 * 100.0).clamp(0.0, 100.0)),
    ];
    mean(parts.into_iter().flatten())
}

/// Compute all five pillars for every row of `universe`.
///
/// `indicators` names the snapshot entries the technical pillar reads, so it
/// must be the set the rows were enriched with. `macro_score` applies to
/// every stock alike and defaults to neutral.
pub fn compute_subscores(
    universe: &UniverseTable,
    indicators: &IndicatorParams,
    macro_score: Option<f64>,
) -> SubScoreTable {
    let n = universe.len();
    let macro_value = macro_score
        .filter(|m| m.is_finite())
        .unwrap_or(DEFAULT_MACRO_SCORE)
        .clamp(0.0, 100.0);

    let mut fundamental_cols = ranked(universe, &FUNDAMENTAL_HIGHER, true);
    fundamental_cols.extend(ranked(universe, &FUNDAMENTAL_LOWER, false));
    let fundamental = row_means(&fundamental_cols, n);

    let mut technical_cols: Vec<Vec<Option<f64>>> = universe
        .return_windows()
        .into_iter()
        .map(|w| percentile_rank(&universe.column(|r| r.return_over(w)), true))
        .collect();
    for window in indicators.trend_windows() {
        let name = sma_name(window);
        technical_cols.push(
            universe
                .rows()
                .iter()
                .map(|r| r.above(&name).map(|up| if up { 100.0 } else { 0.0 }))
                .collect(),
        );
    }
    let adx_key = adx_name(indicators.adx_period);
    technical_cols.push(percentile_rank(
        &universe.column(|r| r.indicators.get(&adx_key)),
        true,
    ));
    let technical = row_means(&technical_cols, n);

    let mut risk_cols = ranked(universe, &RISK_LOWER, false);
    risk_cols.extend(ranked(universe, &RISK_HIGHER, true));
    let risk = row_means(&risk_cols, n);

    let scores = (0..n)
        .map(|i| SubScores {
            fundamental: fundamental[i],
            technical: technical[i],
            sentiment: sentiment_score(&universe.rows()[i]),
            macro_score: Some(macro_value),
            risk: risk[i],
        })
        .collect();

    SubScoreTable {
        tickers: universe.tickers(),
        scores,
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    #[error("weight for {pillar} must be finite and non-negative, got {value}")]
    Invalid { pillar: Pillar, value: f64 },

    #[error("weights sum to zero")]
    ZeroSum,
}

/// Composite weights, normalized to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    fundamental: f64,
    technical: f64,
    sentiment: f64,
    macro_score: f64,
    risk: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            fundamental: 0.40,
            technical: 0.25,
            sentiment: 0.15,
            macro_score: 0.10,
            risk: 0.10,
        }
    }
}

impl ScoreWeights {
    /// Validate and normalize raw weights (in pillar order).
    pub fn new(raw: [f64; 5]) -> Result<Self, WeightsError> {
        for (pillar, &value) in Pillar::ALL.iter().zip(raw.iter()) {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::Invalid {
                    pillar: *pillar,
                    value,
                });
            }
        }
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(WeightsError::ZeroSum);
        }
        Ok(Self {
            fundamental: raw[0] / sum,
            technical: raw[1] / sum,
            sentiment: raw[2] / sum,
            macro_score: raw[3] / sum,
            risk: raw[4] / sum,
        })
    }

    pub fn get(&self, pillar: Pillar) -> f64 {
        match pillar {
            Pillar::Fundamental => self.fundamental,
            Pillar::Technical => self.technical,
            Pillar::Sentiment => self.sentiment,
            Pillar::Macro => self.macro_score,
            Pillar::Risk => self.risk,
        }
    }
}

/// Weighted average over the sub-scores that are present, clipped to
/// `[0, 100]`. Missing pillars drop out of numerator and denominator.
pub fn composite(scores: &SubScores, weights: &ScoreWeights) -> Option<f64> {
    let (num, den) = Pillar::ALL
        .iter()
        .filter_map(|&p| scores.get(p).map(|s| (s, weights.get(p))))
        .fold((0.0, 0.0), |(num, den), (s, w)| (num + w * s, den + w));
    (den > 0.0).then(|| (num / den).clamp(0.0, 100.0))
}

pub fn overall_score(subscores: &SubScoreTable, weights: &ScoreWeights) -> Vec<Option<f64>> {
    subscores
        .scores
        .iter()
        .map(|s| composite(s, weights))
        .collect()
}

/// Dense 1-based rank, highest score first. Ties share the lower number;
/// a missing score gets no rank.
pub fn rank_overall(scores: &[Option<f64>]) -> Vec<Option<usize>> {
    let mut distinct: Vec<f64> = scores.iter().flatten().copied().collect();
    distinct.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    distinct.dedup();
    scores
        .iter()
        .map(|s| {
            s.and_then(|v| distinct.iter().position(|d| *d == v))
                .map(|p| p + 1)
        })
        .collect()
}
