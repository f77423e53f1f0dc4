//! Weekly / monthly resampling, trend classification and seasonality.
//!
//! Resampling rules per bucket:
//! - **Open**: first session's open
//! - **High**: max high
//! - **Low**: min low
//! - **Close**: last session's close
//! - **Volume**: sum
//!
//! Weekly buckets are ISO weeks keyed by that week's Friday; monthly buckets
//! are calendar months keyed by the month-end date. Buckets only exist for
//! periods that contain at least one session, so holiday weeks never produce
//! an empty bar.

use crate::domain::indicator::rsi::rsi_values;
use crate::domain::indicator::sma::rolling_mean;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use chrono::{Datelike, Month, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Weekly,
    Monthly,
}

impl Period {
    /// The date a session's bucket is keyed by.
    pub fn bucket_key(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Weekly => {
                let monday = date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64);
                monday + chrono::Duration::days(4)
            }
            Period::Monthly => month_end(date.year(), date.month()),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Weekly => write!(f, "weekly"),
            Period::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" | "week" | "w" => Ok(Period::Weekly),
            "monthly" | "month" | "m" => Ok(Period::Monthly),
            other => Err(format!("unknown period '{}'", other)),
        }
    }
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Sideways,
    NotAvailable,
}

impl Trend {
    pub fn classify(close: f64, short: Option<f64>, long: Option<f64>) -> Self {
        match (short, long) {
            (Some(s), Some(l)) if close > s && s > l => Trend::Up,
            (Some(s), Some(l)) if close < s && s < l => Trend::Down,
            (Some(_), Some(_)) => Trend::Sideways,
            _ => Trend::NotAvailable,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Up => "UP",
            Trend::Down => "DOWN",
            Trend::Sideways => "SIDEWAYS",
            Trend::NotAvailable => "N/A",
        };
        f.write_str(label)
    }
}

/// Parameters for one resampling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationParams {
    pub period: Period,
    pub sma_windows: Vec<usize>,
    pub trend_short: usize,
    pub trend_long: usize,
    pub rsi_period: usize,
    /// Number of most recent rows to report; indicators still see the whole history.
    pub depth: usize,
}

impl AggregationParams {
    pub fn weekly(depth: usize) -> Self {
        Self {
            period: Period::Weekly,
            sma_windows: vec![10, 20],
            trend_short: 10,
            trend_long: 20,
            rsi_period: 14,
            depth,
        }
    }

    pub fn monthly(depth: usize) -> Self {
        Self {
            period: Period::Monthly,
            sma_windows: vec![3, 6, 12],
            trend_short: 3,
            trend_long: 6,
            rsi_period: 14,
            depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedBar {
    pub bar: PriceBar,
    /// Percent change of close against the previous bucket.
    pub change_pct: Option<f64>,
    pub sma: BTreeMap<usize, Option<f64>>,
    pub rsi: Option<f64>,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSeries {
    pub period: Period,
    pub rows: Vec<AggregatedBar>,
}

/// Collapse daily bars into period buckets.
pub fn resample(series: &PriceSeries, period: Period) -> PriceSeries {
    let mut buckets: Vec<PriceBar> = Vec::new();
    for bar in series.bars() {
        let key = period.bucket_key(bar.date);
        match buckets.last_mut() {
            Some(current) if current.date == key => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => buckets.push(PriceBar { date: key, ..bar.clone() }),
        }
    }
    // Keys are monotone in the input dates and each bucket keeps the
    // high/low envelope of valid bars, so the invariants carry over.
    PriceSeries::new(buckets).unwrap_or_default()
}

pub fn resample_and_aggregate(series: &PriceSeries, params: &AggregationParams) -> AggregatedSeries {
    let resampled = resample(series, params.period);
    let closes = resampled.closes();

    let mut windows = params.sma_windows.clone();
    for w in [params.trend_short, params.trend_long] {
        if !windows.contains(&w) {
            windows.push(w);
        }
    }
    let smas: BTreeMap<usize, Vec<Option<f64>>> = windows
        .iter()
        .map(|&w| (w, rolling_mean(&closes, w)))
        .collect();
    let rsi = rsi_values(&closes, params.rsi_period);

    let rows: Vec<AggregatedBar> = resampled
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let change_pct = (i > 0 && closes[i - 1] > 0.0)
                .then(|| (bar.close / closes[i - 1] - 1.0) * 100.0);
            let sma: BTreeMap<usize, Option<f64>> =
                smas.iter().map(|(&w, values)| (w, values[i])).collect();
            let trend = Trend::classify(
                bar.close,
                sma.get(&params.trend_short).copied().flatten(),
                sma.get(&params.trend_long).copied().flatten(),
            );
            AggregatedBar {
                bar: bar.clone(),
                change_pct,
                sma,
                rsi: rsi[i],
                trend,
            }
        })
        .collect();

    let skip = rows.len().saturating_sub(params.depth);
    AggregatedSeries {
        period: params.period,
        rows: rows.into_iter().skip(skip).collect(),
    }
}

/// Average monthly return per calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    /// Indexed January = 0. `None` for months never observed.
    pub averages: [Option<f64>; 12],
    pub observations: [usize; 12],
    pub best_month: Option<Month>,
    pub worst_month: Option<Month>,
}

impl Seasonality {
    pub fn average(&self, month: Month) -> Option<f64> {
        self.averages[month.number_from_month() as usize - 1]
    }
}

/// Seasonality over the trailing `years` of monthly returns.
pub fn seasonality(series: &PriceSeries, years: u32) -> Seasonality {
    let monthly = resample(series, Period::Monthly);
    let bars = monthly.bars();

    let returns: Vec<(u32, f64)> = bars
        .windows(2)
        .filter(|w| w[0].close > 0.0)
        .map(|w| (w[1].date.month(), (w[1].close / w[0].close - 1.0) * 100.0))
        .collect();
    let keep = years as usize * 12;
    let recent = &returns[returns.len().saturating_sub(keep)..];

    let mut sums = [0.0; 12];
    let mut observations = [0usize; 12];
    for &(month, ret) in recent {
        sums[month as usize - 1] += ret;
        observations[month as usize - 1] += 1;
    }

    let mut averages = [None; 12];
    for m in 0..12 {
        if observations[m] > 0 {
            averages[m] = Some(sums[m] / observations[m] as f64);
        }
    }

    let pick = |better: fn(f64, f64) -> bool| {
        let mut best: Option<(usize, f64)> = None;
        for (m, avg) in averages.iter().enumerate() {
            if let Some(avg) = *avg {
                if best.is_none_or(|(_, b)| better(avg, b)) {
                    best = Some((m, avg));
                }
            }
        }
        best.and_then(|(m, _)| Month::try_from(m as u8 + 1).ok())
    };

    Seasonality {
        averages,
        observations,
        best_month: pick(|a, b| a > b),
        worst_month: pick(|a, b| a < b),
    }
}
