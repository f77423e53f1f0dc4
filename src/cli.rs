//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_table_adapter::CsvTableAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_cache_adapter::MemoryCacheAdapter;
use crate::domain::aggregation::{resample_and_aggregate, seasonality, AggregationParams, Period};
use crate::domain::config_validation::{
    parse_optional_date, parse_window_list, read_weights, validate_analysis_config,
    validate_data_config,
};
use crate::domain::enrich::EnrichParams;
use crate::domain::error::EquiscoreError;
use crate::domain::indicator::snapshot::{Confidence, IndicatorParams};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::pipeline::{
    process_ticker, run_enrichment, HistoryWindow, PipelineConfig, TickerFailure,
};
use crate::domain::reconcile::{
    fill_sector_median, reconcile, source_row, CandidateTable, OutputTable, ReconcileReport,
};
use crate::domain::scoring::{
    compute_subscores, overall_score, rank_overall, Pillar, ScoreWeights, DEFAULT_MACRO_SCORE,
};
use crate::domain::universe::parse_tickers;
use crate::ports::cache_port::IndicatorCachePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::table_port::TablePort;

/// History fetched when `[data] start_date` is absent: enough for a 5-year CAGR.
const DEFAULT_HISTORY_DAYS: i64 = 6 * 366;

#[derive(Parser, Debug)]
#[command(name = "equiscore", about = "Technical, risk and cross-sectional scoring for NSE equities")]
pub struct Cli {
    /// Log filter such as `info` or `equiscore=debug`; overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enrich, score and reconcile the configured universe
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        template: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma separated tickers, replacing `[data] tickers`
        #[arg(long)]
        tickers: Option<String>,
    },
    /// Print the indicator snapshot for one ticker
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
    },
    /// Print weekly or monthly aggregates and seasonality for one ticker
    Aggregate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long, default_value = "weekly")]
        period: Period,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::Analyze {
            config,
            template,
            output,
            tickers,
        } => run_analyze(&config, template.as_ref(), output.as_ref(), tickers.as_deref()),
        Command::Indicators { config, ticker } => run_indicators(&config, &ticker),
        Command::Aggregate {
            config,
            ticker,
            period,
        } => run_aggregate(&config, &ticker, period),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(e: EquiscoreError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EquiscoreError {
    EquiscoreError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn positive_int(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    config.get_int(section, key, default as i64).max(1) as usize
}

pub fn build_indicator_params(config: &dyn ConfigPort) -> Result<IndicatorParams, EquiscoreError> {
    let defaults = IndicatorParams::default();

    let sma_windows = match config.get_string("indicators", "sma_windows") {
        Some(raw) => parse_window_list("indicators", "sma_windows", &raw)?,
        None => defaults.sma_windows.clone(),
    };
    let (macd_fast, macd_slow, macd_signal) = match config.get_string("indicators", "macd") {
        Some(raw) => match parse_window_list("indicators", "macd", &raw)?.as_slice() {
            &[fast, slow, signal] if fast < slow => (fast, slow, signal),
            _ => return Err(invalid("indicators", "macd", "expected fast,slow,signal with fast < slow")),
        },
        None => (defaults.macd_fast, defaults.macd_slow, defaults.macd_signal),
    };

    Ok(IndicatorParams {
        sma_windows,
        rsi_period: positive_int(config, "indicators", "rsi_period", defaults.rsi_period),
        macd_fast,
        macd_slow,
        macd_signal,
        atr_period: positive_int(config, "indicators", "atr_period", defaults.atr_period),
        bollinger_period: positive_int(config, "indicators", "bollinger_period", defaults.bollinger_period),
        adx_period: positive_int(config, "indicators", "adx_period", defaults.adx_period),
        aroon_period: positive_int(config, "indicators", "aroon_period", defaults.aroon_period),
        ..defaults
    })
}

pub fn build_enrich_params(config: &dyn ConfigPort) -> Result<EnrichParams, EquiscoreError> {
    let defaults = EnrichParams::default();

    let return_windows = match config.get_string("indicators", "return_windows") {
        Some(raw) => parse_window_list("indicators", "return_windows", &raw)?,
        None => defaults.return_windows,
    };
    let cagr_years = match config.get_string("indicators", "cagr_years") {
        Some(raw) => parse_window_list("indicators", "cagr_years", &raw)?
            .into_iter()
            .map(|y| y as u32)
            .collect(),
        None => defaults.cagr_years,
    };

    Ok(EnrichParams {
        indicators: build_indicator_params(config)?,
        return_windows,
        cagr_years,
        risk_free_rate: config.get_double("risk", "risk_free_rate", defaults.risk_free_rate),
    })
}

pub fn build_weights(config: &dyn ConfigPort) -> Result<ScoreWeights, EquiscoreError> {
    ScoreWeights::new(read_weights(config)).map_err(|e| invalid("scoring", "weights", e.to_string()))
}

pub fn build_pipeline_config(config: &dyn ConfigPort) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    let millis = |key: &str, default: Duration| {
        let ms = config.get_int("pipeline", key, default.as_millis() as i64).max(0);
        Duration::from_millis(ms as u64)
    };

    PipelineConfig {
        max_workers: positive_int(config, "pipeline", "max_workers", defaults.max_workers),
        batch_size: positive_int(config, "pipeline", "batch_size", defaults.batch_size),
        batch_delay: millis("batch_delay_ms", defaults.batch_delay),
        retry_failed: config.get_bool("pipeline", "retry_failed", defaults.retry_failed),
        retry_delay: millis("retry_delay_ms", defaults.retry_delay),
    }
}

/// `[data] start_date`/`end_date`; the end defaults to `today`.
pub fn build_history_window(
    config: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<HistoryWindow, EquiscoreError> {
    let end = parse_optional_date(config, "data", "end_date")?.unwrap_or(today);
    let start = parse_optional_date(config, "data", "start_date")?
        .unwrap_or(end - chrono::Duration::days(DEFAULT_HISTORY_DAYS));
    if start >= end {
        return Err(invalid("data", "start_date", "start_date must be before end_date"));
    }
    Ok(HistoryWindow { start, end })
}

pub fn build_aggregation_params(config: &dyn ConfigPort, period: Period) -> AggregationParams {
    match period {
        Period::Weekly => AggregationParams::weekly(positive_int(config, "aggregation", "weeks", 52)),
        Period::Monthly => AggregationParams::monthly(positive_int(config, "aggregation", "months", 24)),
    }
}

pub fn resolve_tickers(
    tickers_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, EquiscoreError> {
    let raw = match tickers_override {
        Some(t) => t.to_string(),
        None => config
            .get_string("data", "tickers")
            .ok_or_else(|| EquiscoreError::ConfigMissing {
                section: "data".into(),
                key: "tickers".into(),
            })?,
    };
    parse_tickers(&raw).map_err(|e| invalid("data", "tickers", e.to_string()))
}

pub fn build_data_port(config: &dyn ConfigPort) -> Result<CsvAdapter, EquiscoreError> {
    let price_dir = config
        .get_string("data", "price_dir")
        .ok_or_else(|| EquiscoreError::ConfigMissing {
            section: "data".into(),
            key: "price_dir".into(),
        })?;
    let adapter = CsvAdapter::new(PathBuf::from(price_dir));
    match config.get_string("data", "fundamentals") {
        Some(path) => adapter.with_fundamentals(Path::new(&path)),
        None => Ok(adapter),
    }
}

/// The indicator cache, or `None` when `[cache] enabled = false`.
///
/// `[cache] path` selects the SQLite store; without it (or when it cannot be
/// opened) snapshots are cached in memory for the run.
pub fn build_cache(config: &dyn ConfigPort) -> Option<Box<dyn IndicatorCachePort>> {
    if !config.get_bool("cache", "enabled", true) {
        return None;
    }
    let ttl = Duration::from_secs(positive_int(config, "cache", "ttl_hours", 24) as u64 * 3600);

    if config.get_string("cache", "path").is_some() {
        if let Some(cache) = sqlite_cache(config) {
            return Some(cache);
        }
    }
    Some(Box::new(MemoryCacheAdapter::new(ttl)))
}

#[cfg(feature = "sqlite")]
fn sqlite_cache(config: &dyn ConfigPort) -> Option<Box<dyn IndicatorCachePort>> {
    use crate::adapters::sqlite_cache_adapter::SqliteCacheAdapter;

    match SqliteCacheAdapter::from_config(config) {
        Ok(cache) => {
            if let Err(e) = cache.purge_expired() {
                warn!(error = %e, "failed to purge expired cache entries");
            }
            Some(Box::new(cache))
        }
        Err(e) => {
            warn!(error = %e, "sqlite cache unavailable, using memory cache");
            None
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_cache(_config: &dyn ConfigPort) -> Option<Box<dyn IndicatorCachePort>> {
    warn!("built without the sqlite feature, using memory cache");
    None
}

/// Header used when no template is given: the ticker column followed by
/// every column the candidate table maps.
pub fn default_template(ticker_column: &str, candidates: &CandidateTable) -> OutputTable {
    let mut headers = vec![ticker_column.to_string()];
    headers.extend(candidates.columns().map(str::to_string));
    OutputTable::new(headers)
}

#[derive(Debug)]
pub struct Analysis {
    pub table: OutputTable,
    pub report: ReconcileReport,
    pub failures: Vec<TickerFailure>,
    pub scored: usize,
}

/// Enrich, score and reconcile `tickers` against `template`.
pub fn analyze(
    config: &dyn ConfigPort,
    data: &dyn MarketDataPort,
    tickers: &[String],
    template: Option<OutputTable>,
    today: NaiveDate,
) -> Result<Analysis, EquiscoreError> {
    let params = build_enrich_params(config)?;
    let weights = build_weights(config)?;
    let window = build_history_window(config, today)?;
    let pipeline = build_pipeline_config(config);
    let cache = build_cache(config);
    let macro_score = config.get_double("scoring", "macro_score", DEFAULT_MACRO_SCORE);

    info!(tickers = tickers.len(), start = %window.start, end = %window.end, "starting enrichment");
    let outcome = run_enrichment(tickers, data, window, &params, cache.as_deref(), &pipeline)?;

    let universe = &outcome.universe;
    let subscores = compute_subscores(universe, &params.indicators, Some(macro_score));
    let overall = overall_score(&subscores, &weights);
    let ranks = rank_overall(&overall);

    let sources: Vec<_> = universe
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| source_row(row, subscores.scores.get(i), overall[i], ranks[i]))
        .collect();

    let ticker_column = config
        .get_string("template", "ticker_column")
        .unwrap_or_else(|| "Ticker".to_string());
    let candidates = CandidateTable::standard(&params.indicators);
    let template = template.unwrap_or_else(|| default_template(&ticker_column, &candidates));

    let (mut table, report) = reconcile(&template, &sources, &candidates, &ticker_column)?;

    let sector_column = config
        .get_string("template", "sector_column")
        .unwrap_or_else(|| "Sector".to_string());
    let pe_column = config
        .get_string("template", "pe_column")
        .unwrap_or_else(|| "P/E (TTM)".to_string());
    let sector_pe_column = config
        .get_string("template", "sector_pe_column")
        .unwrap_or_else(|| "Sector P/E".to_string());
    match fill_sector_median(&mut table, &sector_column, &pe_column, &sector_pe_column) {
        Ok(written) => info!(written, "filled sector P/E medians"),
        Err(e) => warn!(error = %e, "sector P/E medians skipped"),
    }

    Ok(Analysis {
        table,
        report,
        failures: outcome.failures,
        scored: universe.len(),
    })
}

fn run_analyze(
    config_path: &PathBuf,
    template_path: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
    tickers_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_analysis_config(&config) {
        return fail(e);
    }

    // Stage 2: Resolve universe and data source
    let tickers = match resolve_tickers(tickers_override, &config) {
        Ok(t) => t,
        Err(e) => return fail(e),
    };
    let data = match build_data_port(&config) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    // Stage 3: Template
    let template = match template_path {
        Some(path) => match CsvTableAdapter.read_table(path) {
            Ok(t) => Some(t),
            Err(e) => return fail(e),
        },
        None => None,
    };

    // Stage 4: Enrich, score, reconcile
    eprintln!("Analyzing {} tickers...", tickers.len());
    let analysis = match analyze(&config, &data, &tickers, template, Local::now().date_naive()) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    // Stage 5: Console summary
    for failure in &analysis.failures {
        eprintln!("warning: skipped {} ({})", failure.ticker, failure.error);
    }
    for column in &analysis.report.unresolved_columns {
        eprintln!("warning: template column '{}' has no mapping and was left unchanged", column);
    }
    eprintln!("\n=== Summary ===");
    eprintln!("Scored:           {}", analysis.scored);
    eprintln!("Failed:           {}", analysis.failures.len());
    eprintln!("Rows updated:     {}", analysis.report.updated.len());
    eprintln!("Rows appended:    {}", analysis.report.appended.len());
    eprintln!("Rows untouched:   {}", analysis.report.untouched.len());

    // Stage 6: Write output
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("equiscore.csv"));
    match CsvTableAdapter.write_table(&analysis.table, &output) {
        Ok(()) => {
            eprintln!("\nOutput written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn run_indicators(config_path: &PathBuf, ticker: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&config) {
        return fail(e);
    }

    let result = build_data_port(&config).and_then(|data| {
        let params = build_enrich_params(&config)?;
        let window = build_history_window(&config, Local::now().date_naive())?;
        process_ticker(&ticker.to_uppercase(), &data, window, &params, None)
    });
    let row = match result {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    println!("{} as of {} (close {:.2})", row.ticker(), row.as_of, row.last_close);
    println!("\nIndicators:");
    for (name, entry) in row.indicators.iter() {
        let marker = match entry.confidence {
            Confidence::Full => "",
            Confidence::Reduced => " (reduced history)",
        };
        println!("  {:<16} {}{}", name, fmt_opt(entry.value), marker);
    }

    println!("\nReturns:");
    for (window, value) in &row.returns {
        println!("  {:>4}d           {:.2}%", window, value);
    }
    for (years, value) in &row.cagr {
        println!("  CAGR {}y         {:.2}%", years, value * 100.0);
    }

    let risk = &row.risk;
    println!("\nRisk:");
    println!("  Volatility 30d   {}", fmt_opt(risk.volatility_30d));
    println!("  Volatility 90d   {}", fmt_opt(risk.volatility_90d));
    println!("  Sharpe           {}", fmt_opt(risk.sharpe));
    println!("  Max Drawdown     {}", fmt_opt(risk.max_drawdown));
    println!("  52w High         {}", fmt_opt(risk.high_52w));
    println!("  52w Low          {}", fmt_opt(risk.low_52w));
    println!("  From 52w High    {}", fmt_opt(risk.pct_from_52w_high));
    ExitCode::SUCCESS
}

fn run_aggregate(config_path: &PathBuf, ticker: &str, period: Period) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&config) {
        return fail(e);
    }

    let ticker = ticker.to_uppercase();
    let series = build_data_port(&config).and_then(|data| {
        let window = build_history_window(&config, Local::now().date_naive())?;
        let bars = data.fetch_history(&ticker, window.start, window.end)?;
        PriceSeries::from_unsorted(bars).map_err(|source| EquiscoreError::InvalidSeries {
            ticker: ticker.clone(),
            source,
        })
    });
    let series = match series {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let params = build_aggregation_params(&config, period);
    let aggregated = resample_and_aggregate(&series, &params);

    println!("{} {} ({} rows)", ticker, aggregated.period, aggregated.rows.len());
    let sma_header: Vec<String> = params.sma_windows.iter().map(|w| format!("SMA{}", w)).collect();
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>8} {} {:>6} {}",
        "Date",
        "Open",
        "High",
        "Low",
        "Close",
        "Volume",
        "Chg%",
        sma_header.iter().map(|h| format!("{:>10}", h)).collect::<Vec<_>>().join(" "),
        "RSI",
        "Trend"
    );
    for row in &aggregated.rows {
        let smas: Vec<String> = params
            .sma_windows
            .iter()
            .map(|w| format!("{:>10}", fmt_opt(row.sma.get(w).copied().flatten())))
            .collect();
        println!(
            "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12} {:>8} {} {:>6} {}",
            row.bar.date,
            row.bar.open,
            row.bar.high,
            row.bar.low,
            row.bar.close,
            row.bar.volume,
            fmt_opt(row.change_pct),
            smas.join(" "),
            fmt_opt(row.rsi),
            row.trend
        );
    }

    let years = positive_int(&config, "aggregation", "seasonality_years", 5) as u32;
    let season = seasonality(&series, years);
    println!("\nSeasonality (last {} years, average monthly return %):", years);
    for month in 1..=12u32 {
        let Some(m) = chrono::Month::try_from(month as u8).ok() else {
            continue;
        };
        println!(
            "  {:<10} {:>8}  ({} obs)",
            m.name(),
            fmt_opt(season.average(m)),
            season.observations[month as usize - 1]
        );
    }
    println!(
        "  Best month:  {}",
        season.best_month.map_or("-", |m| m.name())
    );
    println!(
        "  Worst month: {}",
        season.worst_month.map_or("-", |m| m.name())
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_analysis_config(&config) {
        return fail(e);
    }

    let summary = resolve_tickers(None, &config).and_then(|tickers| {
        let params = build_enrich_params(&config)?;
        let weights = build_weights(&config)?;
        Ok((tickers, params, weights))
    });
    let (tickers, params, weights) = match summary {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    eprintln!("\nUniverse: {}", tickers.join(", "));
    eprintln!("Indicators: {}", params.indicators.fingerprint());
    eprintln!(
        "Return windows: {:?}, CAGR years: {:?}",
        params.return_windows, params.cagr_years
    );
    let weight_list: Vec<String> = Pillar::ALL
        .iter()
        .map(|&p| format!("{} {:.2}", p, weights.get(p)))
        .collect();
    eprintln!("Weights: {}", weight_list.join(", "));
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
