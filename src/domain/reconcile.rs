//! Reconciliation of computed rows onto an external template table.
//!
//! Rows are matched by normalized ticker. Each template column resolves its
//! value through an ordered list of source keys taken from a versioned
//! [`CandidateTable`]; the first non-blank source value wins. Columns with no
//! mapping are reported, never guessed.

use crate::domain::error::EquiscoreError;
use crate::domain::indicator::snapshot::{
    adx_name, atr_name, rsi_name, sma_name, IndicatorParams, AROON_DOWN, AROON_UP, BB_LOWER,
    BB_MIDDLE, BB_UPPER, MACD_HISTOGRAM, MACD_LINE, MACD_SIGNAL, MINUS_DI, OBV, PLUS_DI, STOCH_D,
    STOCH_K,
};
use crate::domain::metric_row::MetricRow;
use crate::domain::scoring::SubScores;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Trim, drop an exchange prefix, cut any `.NS`-style suffix, upper-case.
pub fn normalize_ticker(raw: &str) -> String {
    let trimmed = raw.trim();
    let upper = trimmed.to_uppercase();
    let without_prefix = ["NSE:", "BSE:"]
        .iter()
        .find_map(|p| upper.strip_prefix(p))
        .unwrap_or(&upper);
    let base = without_prefix.split('.').next().unwrap_or(without_prefix);
    base.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Blank,
}

impl CellValue {
    /// Read a raw cell: empty is blank, a finite number is numeric,
    /// anything else is text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Blank;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::Number(v),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for CellValue {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(x) if x.is_finite() => CellValue::Number(x),
            _ => CellValue::Blank,
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(v: Option<String>) -> Self {
        v.map(CellValue::Text).unwrap_or_default()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blank => Ok(()),
        }
    }
}

/// Header row plus cells, every row as wide as the header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl OutputTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name.trim())
    }

    /// Append a row, padding or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.headers.len(), CellValue::Blank);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

/// Ordered source keys per template column.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTable {
    version: u32,
    entries: Vec<(String, Vec<String>)>,
}

impl CandidateTable {
    pub fn new(version: u32, entries: Vec<(String, Vec<String>)>) -> Self {
        Self { version, entries }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn candidates(&self, column: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(c, _)| c == column.trim())
            .map(|(_, keys)| keys.as_slice())
    }

    /// Mapped column names in table order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// The mapping for the standard analytics template. Windowed indicator
    /// columns carry the configured periods, e.g. "RSI (14)" or "SMA 50".
    pub fn standard(indicators: &IndicatorParams) -> Self {
        const IDENTITY_AND_FUNDAMENTALS: &[(&str, &[&str])] = &[
            ("Company Name", &["company_name", "ticker"]),
            ("Sector", &["sector"]),
            ("Industry", &["industry"]),
            ("Current Price", &["last_close"]),
            ("Last Updated", &["as_of"]),
            ("Market Cap", &["market_cap"]),
            ("P/E (TTM)", &["pe", "forward_pe"]),
            ("Forward P/E", &["forward_pe"]),
            ("Sector P/E", &["sector_pe"]),
            ("P/B", &["pb"]),
            ("P/S", &["ps"]),
            ("PEG", &["peg"]),
            ("ROE TTM %", &["roe"]),
            ("ROA %", &["roa"]),
            ("Operating Margin %", &["operating_margin"]),
            ("Net Margin %", &["net_margin"]),
            ("Gross Margin %", &["gross_margin"]),
            ("Revenue Growth %", &["revenue_growth"]),
            ("Earnings Growth %", &["earnings_growth"]),
            ("Dividend Yield %", &["dividend_yield"]),
            ("FCF Yield %", &["fcf_yield"]),
            ("Interest Coverage", &["interest_coverage"]),
            ("Debt/Equity", &["debt_to_equity"]),
            ("Sentiment Score", &["sentiment"]),
            ("Social Sentiment", &["social_sentiment"]),
            ("Analyst Rating", &["analyst_rating"]),
        ];
        const MACD: &[(&str, &[&str])] = &[
            ("MACD", &[MACD_LINE]),
            ("MACD Signal", &[MACD_SIGNAL]),
            ("MACD Histogram", &[MACD_HISTOGRAM]),
        ];
        const OSCILLATORS_AND_BANDS: &[(&str, &[&str])] = &[
            ("+DI", &[PLUS_DI]),
            ("-DI", &[MINUS_DI]),
            ("Aroon Up", &[AROON_UP]),
            ("Aroon Down", &[AROON_DOWN]),
            ("Stoch %K", &[STOCH_K]),
            ("Stoch %D", &[STOCH_D]),
            ("BB Upper", &[BB_UPPER]),
            ("BB Middle", &[BB_MIDDLE]),
            ("BB Lower", &[BB_LOWER]),
            ("OBV", &[OBV]),
        ];
        const RETURNS_RISK_SCORES: &[(&str, &[&str])] = &[
            ("1W Return %", &["return_5d"]),
            ("1M Return %", &["return_21d"]),
            ("3M Return %", &["return_63d"]),
            ("6M Return %", &["return_126d"]),
            ("1Y Return %", &["return_252d"]),
            ("CAGR 1Y %", &["cagr_1y"]),
            ("CAGR 3Y %", &["cagr_3y"]),
            ("CAGR 5Y %", &["cagr_5y"]),
            ("Volatility 30D %", &["volatility_30d"]),
            ("Volatility 90D %", &["volatility_90d"]),
            ("Sharpe Ratio", &["sharpe"]),
            ("Max Drawdown %", &["max_drawdown"]),
            ("52W High", &["high_52w"]),
            ("52W Low", &["low_52w"]),
            ("% From 52W High", &["pct_from_52w_high"]),
            ("Score Fundamental (0-100)", &["score_fundamental"]),
            ("Score Technical (0-100)", &["score_technical"]),
            ("Score Sentiment (0-100)", &["score_sentiment"]),
            ("Score Macro (0-100)", &["score_macro"]),
            ("Score Risk (0-100)", &["score_risk"]),
            ("Overall Score (0-100)", &["overall_score"]),
            ("Overall Rank", &["overall_rank"]),
        ];

        type Rows = &'static [(&'static str, &'static [&'static str])];

        fn fixed(rows: Rows) -> impl Iterator<Item = (String, Vec<String>)> {
            rows.iter().map(|(column, keys)| {
                (
                    column.to_string(),
                    keys.iter().map(|k| k.to_string()).collect(),
                )
            })
        }

        let mut entries: Vec<(String, Vec<String>)> = fixed(IDENTITY_AND_FUNDAMENTALS).collect();
        entries.extend(
            indicators
                .sma_windows
                .iter()
                .map(|&w| (format!("SMA {}", w), vec![sma_name(w)])),
        );
        entries.push((
            format!("RSI ({})", indicators.rsi_period),
            vec![rsi_name(indicators.rsi_period)],
        ));
        entries.extend(fixed(MACD));
        entries.push((
            format!("ATR ({})", indicators.atr_period),
            vec![atr_name(indicators.atr_period)],
        ));
        entries.push((
            format!("ADX ({})", indicators.adx_period),
            vec![adx_name(indicators.adx_period)],
        ));
        entries.extend(fixed(OSCILLATORS_AND_BANDS));
        entries.extend(fixed(RETURNS_RISK_SCORES));

        Self::new(1, entries)
    }
}

/// One computed stock flattened to source keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceRow {
    pub ticker: String,
    pub values: BTreeMap<String, CellValue>,
}

impl SourceRow {
    pub fn get(&self, key: &str) -> &CellValue {
        const BLANK: CellValue = CellValue::Blank;
        self.values.get(key).unwrap_or(&BLANK)
    }

    /// First non-blank value among `keys`.
    pub fn resolve(&self, keys: &[String]) -> Option<&CellValue> {
        keys.iter().map(|k| self.get(k)).find(|v| !v.is_blank())
    }
}

/// Flatten a scored MetricRow into source keys.
pub fn source_row(
    row: &MetricRow,
    scores: Option<&SubScores>,
    overall: Option<f64>,
    rank: Option<usize>,
) -> SourceRow {
    let mut values: BTreeMap<String, CellValue> = BTreeMap::new();
    let mut put = |key: String, value: CellValue| {
        values.insert(key, value);
    };

    put("ticker".into(), CellValue::Text(row.identity.ticker.clone()));
    put("company_name".into(), row.identity.company_name.clone().into());
    put("sector".into(), row.identity.sector.clone().into());
    put("industry".into(), row.identity.industry.clone().into());
    put("last_close".into(), Some(row.last_close).into());
    put("as_of".into(), CellValue::Text(row.as_of.format("%Y-%m-%d").to_string()));

    for (key, value) in row.fundamentals.as_pairs() {
        put(key.into(), value.into());
    }
    for (name, entry) in row.indicators.iter() {
        put(name.into(), entry.value.into());
    }
    for (window, value) in &row.returns {
        put(format!("return_{}d", window), Some(*value).into());
    }
    for (years, value) in &row.cagr {
        put(format!("cagr_{}y", years), Some(value * 100.0).into());
    }

    let risk = &row.risk;
    put("volatility_30d".into(), risk.volatility_30d.into());
    put("volatility_90d".into(), risk.volatility_90d.into());
    put("sharpe".into(), risk.sharpe.into());
    put("max_drawdown".into(), risk.max_drawdown.into());
    put("high_52w".into(), risk.high_52w.into());
    put("low_52w".into(), risk.low_52w.into());
    put("pct_from_52w_high".into(), risk.pct_from_52w_high.into());

    if let Some(s) = scores {
        put("score_fundamental".into(), s.fundamental.into());
        put("score_technical".into(), s.technical.into());
        put("score_sentiment".into(), s.sentiment.into());
        put("score_macro".into(), s.macro_score.into());
        put("score_risk".into(), s.risk.into());
    }
    put("overall_score".into(), overall.into());
    put("overall_rank".into(), rank.map(|r| r as f64).into());

    SourceRow {
        ticker: row.identity.ticker.clone(),
        values,
    }
}

/// What reconciliation did, for logging and callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub candidate_version: u32,
    /// Template columns with no candidate mapping; left as they were.
    pub unresolved_columns: Vec<String>,
    /// Template rows that received computed values.
    pub updated: Vec<String>,
    /// Computed tickers added as new rows.
    pub appended: Vec<String>,
    /// Template rows with no computed counterpart.
    pub untouched: Vec<String>,
}

/// Merge `sources` into a copy of `template`.
pub fn reconcile(
    template: &OutputTable,
    sources: &[SourceRow],
    candidates: &CandidateTable,
    ticker_column: &str,
) -> Result<(OutputTable, ReconcileReport), EquiscoreError> {
    let ticker_idx = template
        .column_index(ticker_column)
        .ok_or_else(|| EquiscoreError::Template {
            reason: format!("template has no '{}' column", ticker_column),
        })?;

    let mut report = ReconcileReport {
        candidate_version: candidates.version(),
        ..ReconcileReport::default()
    };

    // Column plan: candidate keys per column index, None for unmapped.
    let plan: Vec<Option<&[String]>> = template
        .headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            if i == ticker_idx {
                return None;
            }
            let keys = candidates.candidates(header);
            if keys.is_none() && !header.trim().is_empty() {
                report.unresolved_columns.push(header.clone());
            }
            keys
        })
        .collect();
    for column in &report.unresolved_columns {
        warn!(column = %column, "template column has no candidate mapping");
    }

    let mut by_ticker: HashMap<String, usize> = HashMap::new();
    for (i, source) in sources.iter().enumerate() {
        by_ticker.entry(normalize_ticker(&source.ticker)).or_insert(i);
    }

    let mut output = OutputTable::new(template.headers.clone());
    let mut used: HashSet<usize> = HashSet::new();

    for row in &template.rows {
        let mut row = row.clone();
        row.resize(template.headers.len(), CellValue::Blank);
        let raw_ticker = row[ticker_idx].to_string();
        let key = normalize_ticker(&raw_ticker);

        match by_ticker.get(&key).filter(|_| !key.is_empty()) {
            Some(&src_idx) => {
                let source = &sources[src_idx];
                for (col, keys) in plan.iter().enumerate() {
                    if let Some(value) = keys.and_then(|k| source.resolve(k)) {
                        row[col] = value.clone();
                    }
                }
                used.insert(src_idx);
                report.updated.push(raw_ticker);
            }
            None => report.untouched.push(raw_ticker),
        }
        output.rows.push(row);
    }

    for (i, source) in sources.iter().enumerate() {
        if used.contains(&i) {
            continue;
        }
        let key = normalize_ticker(&source.ticker);
        if by_ticker.get(&key) != Some(&i) {
            // a duplicate of an earlier source with the same normalized ticker
            debug!(ticker = %source.ticker, "skipping duplicate computed row");
            continue;
        }
        let mut row = vec![CellValue::Blank; template.headers.len()];
        row[ticker_idx] = CellValue::Text(source.ticker.clone());
        for (col, keys) in plan.iter().enumerate() {
            if let Some(value) = keys.and_then(|k| source.resolve(k)) {
                row[col] = value.clone();
            }
        }
        output.rows.push(row);
        report.appended.push(source.ticker.clone());
    }

    info!(
        version = report.candidate_version,
        updated = report.updated.len(),
        appended = report.appended.len(),
        untouched = report.untouched.len(),
        unresolved = report.unresolved_columns.len(),
        "reconciled template"
    );
    Ok((output, report))
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Median of the numeric `pe_col` cells per sector; non-numeric cells and
/// rows without a sector are ignored.
pub fn sector_median(
    table: &OutputTable,
    sector_col: &str,
    pe_col: &str,
) -> Result<BTreeMap<String, f64>, EquiscoreError> {
    let missing = |name: &str| EquiscoreError::Template {
        reason: format!("table has no '{}' column", name),
    };
    let sector_idx = table.column_index(sector_col).ok_or_else(|| missing(sector_col))?;
    let pe_idx = table.column_index(pe_col).ok_or_else(|| missing(pe_col))?;

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        let sector = match row.get(sector_idx) {
            Some(CellValue::Text(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => continue,
        };
        if let Some(pe) = row.get(pe_idx).and_then(CellValue::as_number) {
            groups.entry(sector).or_default().push(pe);
        }
    }

    Ok(groups
        .into_iter()
        .filter_map(|(sector, mut values)| median(&mut values).map(|m| (sector, m)))
        .collect())
}

/// Write each row's sector median into `target_col`. Returns the number of
/// cells written; a template without `target_col` is left alone.
pub fn fill_sector_median(
    table: &mut OutputTable,
    sector_col: &str,
    pe_col: &str,
    target_col: &str,
) -> Result<usize, EquiscoreError> {
    let Some(target_idx) = table.column_index(target_col) else {
        return Ok(0);
    };
    let medians = sector_median(table, sector_col, pe_col)?;
    let sector_idx = table.column_index(sector_col).unwrap_or(target_idx);

    let mut written = 0;
    for row in &mut table.rows {
        let median = match row.get(sector_idx) {
            Some(CellValue::Text(s)) => medians.get(s.trim()).copied(),
            _ => None,
        };
        if let Some(m) = median {
            row[target_idx] = CellValue::Number(m);
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metric_row::test_support::row;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn num(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn source(ticker: &str, pairs: &[(&str, CellValue)]) -> SourceRow {
        SourceRow {
            ticker: ticker.to_string(),
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn template() -> OutputTable {
        let mut t = OutputTable::new(
            ["Ticker", "Sector", "P/E (TTM)", "ROE TTM %", "Notes"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        t.push_row(vec![text("RELIANCE.NS"), text("Energy"), num(20.0), CellValue::Blank, text("keep")]);
        t.push_row(vec![text("HDFC"), text("Banks"), num(18.0), num(15.0), text("old")]);
        t
    }

    mod normalize {
        use super::*;

        #[test]
        fn strips_suffix_and_prefix() {
            assert_eq!(normalize_ticker("reliance.ns"), "RELIANCE");
            assert_eq!(normalize_ticker(" TCS.BO "), "TCS");
            assert_eq!(normalize_ticker("NSE:INFY"), "INFY");
            assert_eq!(normalize_ticker("bse:SBIN.BO"), "SBIN");
            assert_eq!(normalize_ticker("M&M"), "M&M");
            assert_eq!(normalize_ticker(""), "");
        }
    }

    mod cells {
        use super::*;

        #[test]
        fn parse_kinds() {
            assert_eq!(CellValue::parse(" 12.5 "), num(12.5));
            assert_eq!(CellValue::parse("N/A"), text("N/A"));
            assert_eq!(CellValue::parse("   "), CellValue::Blank);
            assert_eq!(CellValue::parse("NaN"), text("NaN"));
        }

        #[test]
        fn display_keeps_full_precision() {
            assert_eq!(num(30.0).to_string(), "30");
            assert_eq!(num(0.000012).to_string(), "0.000012");
            let third = 200.0 / 3.0;
            assert_eq!(CellValue::parse(&num(third).to_string()), num(third));
            assert_eq!(CellValue::Blank.to_string(), "");
        }
    }

    mod merge {
        use super::*;

        #[test]
        fn fills_matched_rows_and_keeps_prior_values() {
            let sources = vec![source(
                "RELIANCE",
                &[("pe", CellValue::Blank), ("forward_pe", num(19.0)), ("roe", num(9.5))],
            )];
            let (out, report) =
                reconcile(&template(), &sources, &CandidateTable::standard(&IndicatorParams::default()), "Ticker").unwrap();

            // first non-blank candidate wins
            assert_eq!(out.cell(0, "P/E (TTM)"), Some(&num(19.0)));
            assert_eq!(out.cell(0, "ROE TTM %"), Some(&num(9.5)));
            // unresolved sector stays
            assert_eq!(out.cell(0, "Sector"), Some(&text("Energy")));
            assert_eq!(out.cell(0, "Notes"), Some(&text("keep")));
            // untouched template row
            assert_eq!(out.rows[1], template().rows[1]);

            assert_eq!(report.updated, vec!["RELIANCE.NS"]);
            assert_eq!(report.untouched, vec!["HDFC"]);
            assert_eq!(report.unresolved_columns, vec!["Notes"]);
            assert_eq!(report.candidate_version, 1);
        }

        #[test]
        fn appends_new_tickers() {
            let sources = vec![
                source("TCS.NS", &[("sector", text("IT")), ("pe", num(30.0))]),
                source("RELIANCE.NS", &[("pe", num(21.0))]),
            ];
            let (out, report) =
                reconcile(&template(), &sources, &CandidateTable::standard(&IndicatorParams::default()), "Ticker").unwrap();

            assert_eq!(out.rows.len(), 3);
            assert_eq!(report.appended, vec!["TCS.NS"]);
            assert_eq!(out.cell(2, "Ticker"), Some(&text("TCS.NS")));
            assert_eq!(out.cell(2, "Sector"), Some(&text("IT")));
            assert_eq!(out.cell(2, "ROE TTM %"), Some(&CellValue::Blank));
            assert_eq!(out.cell(2, "Notes"), Some(&CellValue::Blank));
            assert_eq!(out.cell(0, "P/E (TTM)"), Some(&num(21.0)));
        }

        #[test]
        fn duplicate_sources_use_first() {
            let sources = vec![
                source("TCS.NS", &[("pe", num(30.0))]),
                source("tcs", &[("pe", num(99.0))]),
            ];
            let (out, report) =
                reconcile(&template(), &sources, &CandidateTable::standard(&IndicatorParams::default()), "Ticker").unwrap();
            assert_eq!(report.appended, vec!["TCS.NS"]);
            assert_eq!(out.rows.len(), 3);
        }

        #[test]
        fn indicator_columns_follow_configured_periods() {
            let params = IndicatorParams {
                sma_windows: vec![10, 30],
                rsi_period: 21,
                adx_period: 20,
                ..IndicatorParams::default()
            };
            let candidates = CandidateTable::standard(&params);
            assert_eq!(candidates.candidates("RSI (21)"), Some(&["RSI21".to_string()][..]));
            assert_eq!(candidates.candidates("ADX (20)"), Some(&["ADX20".to_string()][..]));
            assert_eq!(candidates.candidates("SMA 30"), Some(&["SMA30".to_string()][..]));
            assert!(candidates.candidates("RSI (14)").is_none());
            assert!(candidates.candidates("SMA 200").is_none());

            let mut t = OutputTable::new(
                ["Ticker", "RSI (21)", "ADX (20)", "RSI (14)"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            );
            t.push_row(vec![text("SBIN")]);
            let sources = vec![source("SBIN.NS", &[("RSI21", num(58.0)), ("ADX20", num(31.0))])];
            let (out, report) = reconcile(&t, &sources, &candidates, "Ticker").unwrap();

            assert_eq!(out.cell(0, "RSI (21)"), Some(&num(58.0)));
            assert_eq!(out.cell(0, "ADX (20)"), Some(&num(31.0)));
            // a stale period in the template is reported, not silently blank
            assert_eq!(report.unresolved_columns, vec!["RSI (14)"]);
        }

        #[test]
        fn missing_ticker_column_is_an_error() {
            let err = reconcile(&template(), &[], &CandidateTable::standard(&IndicatorParams::default()), "Symbol").unwrap_err();
            assert!(matches!(err, EquiscoreError::Template { .. }));
        }

        #[test]
        fn short_template_rows_are_padded() {
            let mut t = template();
            t.rows.push(vec![text("INFY")]);
            let sources = vec![source("INFY.NS", &[("roe", num(30.0))])];
            let (out, _) = reconcile(&t, &sources, &CandidateTable::standard(&IndicatorParams::default()), "Ticker").unwrap();
            assert_eq!(out.rows[2].len(), 5);
            assert_eq!(out.cell(2, "ROE TTM %"), Some(&num(30.0)));
        }
    }

    mod source_rows {
        use super::*;

        #[test]
        fn flattens_metrics_and_scores() {
            let mut r = row("INFY.NS");
            r.fundamentals.pe = Some(25.0);
            r.indicators.insert("RSI14", Some(61.0));
            r.returns.insert(21, 4.0);
            r.cagr.insert(3, 0.12);
            let scores = SubScores {
                fundamental: Some(70.0),
                ..SubScores::default()
            };
            let s = source_row(&r, Some(&scores), Some(64.0), Some(2));

            assert_eq!(s.get("pe"), &num(25.0));
            assert_eq!(s.get("RSI14"), &num(61.0));
            assert_eq!(s.get("return_21d"), &num(4.0));
            assert!((s.get("cagr_3y").as_number().unwrap() - 12.0).abs() < 1e-9);
            assert_eq!(s.get("score_fundamental"), &num(70.0));
            assert_eq!(s.get("score_technical"), &CellValue::Blank);
            assert_eq!(s.get("overall_rank"), &num(2.0));
            assert_eq!(s.get("as_of"), &text("2024-06-28"));
            assert_eq!(s.get("unknown"), &CellValue::Blank);
        }
    }

    mod sector {
        use super::*;

        fn table() -> OutputTable {
            let mut t = OutputTable::new(
                ["Ticker", "Sector", "P/E (TTM)", "Sector P/E"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            );
            t.push_row(vec![text("A"), text("IT"), num(20.0)]);
            t.push_row(vec![text("B"), text("IT"), num(30.0)]);
            t.push_row(vec![text("C"), text("IT"), text("N/A")]);
            t.push_row(vec![text("D"), text("Banks"), num(12.0)]);
            t.push_row(vec![text("E"), CellValue::Blank, num(50.0)]);
            t
        }

        #[test]
        fn medians_ignore_non_numeric() {
            let medians = sector_median(&table(), "Sector", "P/E (TTM)").unwrap();
            assert_eq!(medians.get("IT"), Some(&25.0));
            assert_eq!(medians.get("Banks"), Some(&12.0));
            assert_eq!(medians.len(), 2);
        }

        #[test]
        fn fill_writes_target_column() {
            let mut t = table();
            let written = fill_sector_median(&mut t, "Sector", "P/E (TTM)", "Sector P/E").unwrap();
            assert_eq!(written, 4);
            assert_eq!(t.cell(2, "Sector P/E"), Some(&num(25.0)));
            assert_eq!(t.cell(4, "Sector P/E"), Some(&CellValue::Blank));
        }

        #[test]
        fn fill_without_target_is_noop() {
            let mut t = template();
            assert_eq!(fill_sector_median(&mut t, "Sector", "P/E (TTM)", "Sector P/E").unwrap(), 0);
        }

        #[test]
        fn odd_count_median() {
            assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
            assert_eq!(median(&mut []), None);
        }
    }
}
