//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart::SvgChartAdapter;
use crate::domain::config_validation::{parse_date, validate_config, validate_data_config};
use crate::domain::decision::{decide, Decision, DecisionConfig, Trend};
use crate::domain::error::SignalError;
use crate::domain::indicator::{compute, IndicatorConfig, IndicatorHistory};
use crate::domain::ohlcv::PriceSeries;
use crate::ports::chart_port::ChartPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "fxsignal",
    about = "CCI and Bollinger Band trade recommendations for daily FX series"
)]
pub struct Cli {
    /// Log debug detail (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

/// Where the series comes from and how indicators are computed.
#[derive(Args, Debug, Clone, Default)]
pub struct SeriesArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long)]
    pub instrument: Option<String>,
    /// First date included (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// First date excluded (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub window: Option<usize>,
    /// backfill or expanding
    #[arg(long)]
    pub warmup: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DecisionArgs {
    #[arg(long)]
    pub trend_window: Option<usize>,
    #[arg(long)]
    pub portfolio_value: Option<f64>,
    #[arg(long)]
    pub risk_tolerance: Option<f64>,
    /// self or prior
    #[arg(long)]
    pub ma_comparison: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute indicators and print a trade recommendation
    Decide {
        #[command(flatten)]
        series: SeriesArgs,
        #[command(flatten)]
        decision: DecisionArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Directory for SVG charts
        #[arg(long)]
        charts: Option<PathBuf>,
    },
    /// Print the indicator history as CSV
    Indicators {
        #[command(flatten)]
        series: SeriesArgs,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in a data directory
    List {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Resolved data source for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub dir: PathBuf,
    pub instrument: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Everything one run produces. Charts and the decision read the same history.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub series: PriceSeries,
    pub history: IndicatorHistory,
    pub decision: Decision,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    instrument: &'a str,
    first_date: NaiveDate,
    last_date: NaiveDate,
    bars: usize,
    indicators: &'a IndicatorConfig,
    decision: &'a Decision,
}

pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Decide {
            series,
            decision,
            format,
            charts,
        } => run_decide(&series, &decision, format, charts),
        Command::Indicators { series } => run_indicators(&series),
        Command::Validate { config } => run_validate(&config),
        Command::List { data_dir, config } => run_list(data_dir, config.as_ref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, SignalError> {
    match path {
        None => Ok(FileConfigAdapter::empty()),
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path).map_err(|e| SignalError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Command-line flags win over file values.
pub fn apply_overrides(
    adapter: &mut FileConfigAdapter,
    series: &SeriesArgs,
    decision: Option<&DecisionArgs>,
) {
    if let Some(dir) = &series.data_dir {
        adapter.set("data", "dir", dir.display());
    }
    if let Some(instrument) = &series.instrument {
        adapter.set("data", "instrument", instrument);
    }
    if let Some(start) = &series.start {
        adapter.set("data", "start_date", start);
    }
    if let Some(end) = &series.end {
        adapter.set("data", "end_date", end);
    }
    if let Some(window) = series.window {
        adapter.set("indicators", "window", window);
    }
    if let Some(warmup) = &series.warmup {
        adapter.set("indicators", "warmup", warmup);
    }

    let Some(decision) = decision else {
        return;
    };
    if let Some(n) = decision.trend_window {
        adapter.set("decision", "trend_window", n);
    }
    if let Some(v) = decision.portfolio_value {
        adapter.set("decision", "portfolio_value", v);
    }
    if let Some(v) = decision.risk_tolerance {
        adapter.set("decision", "risk_tolerance", v);
    }
    if let Some(v) = &decision.ma_comparison {
        adapter.set("decision", "ma_comparison", v);
    }
}

fn parse_enum<T: std::str::FromStr<Err = String> + Default>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<T, SignalError> {
    match config.get_string(section, key) {
        None => Ok(T::default()),
        Some(raw) => raw.parse().map_err(|reason| SignalError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason,
        }),
    }
}

pub fn build_indicator_config(config: &dyn ConfigPort) -> Result<IndicatorConfig, SignalError> {
    let defaults = IndicatorConfig::default();
    let window = config.get_int("indicators", "window", defaults.window as i64);
    if window < 1 {
        return Err(SignalError::ConfigInvalid {
            section: "indicators".into(),
            key: "window".into(),
            reason: "window must be at least 1".into(),
        });
    }
    Ok(IndicatorConfig {
        window: window as usize,
        warmup: parse_enum(config, "indicators", "warmup")?,
    })
}

pub fn build_decision_config(config: &dyn ConfigPort) -> Result<DecisionConfig, SignalError> {
    let d = DecisionConfig::default();
    let trend_window = config.get_int("decision", "trend_window", d.trend_window as i64);
    if trend_window < 1 {
        return Err(SignalError::ConfigInvalid {
            section: "decision".into(),
            key: "trend_window".into(),
            reason: "trend_window must be at least 1".into(),
        });
    }
    Ok(DecisionConfig {
        trend_window: trend_window as usize,
        portfolio_value: config.get_double("decision", "portfolio_value", d.portfolio_value),
        risk_tolerance: config.get_double("decision", "risk_tolerance", d.risk_tolerance),
        bullish_threshold: config.get_double("decision", "bullish_threshold", d.bullish_threshold),
        bearish_threshold: config.get_double("decision", "bearish_threshold", d.bearish_threshold),
        aux_value: config.get_double("decision", "aux_value", d.aux_value),
        aux_threshold: config.get_double("decision", "aux_threshold", d.aux_threshold),
        buy_min_bullish_pct: config.get_double(
            "decision",
            "buy_min_bullish_pct",
            d.buy_min_bullish_pct,
        ),
        sell_min_bearish_pct: config.get_double(
            "decision",
            "sell_min_bearish_pct",
            d.sell_min_bearish_pct,
        ),
        ma_comparison: parse_enum(config, "decision", "ma_comparison")?,
    })
}

pub fn build_data_request(config: &dyn ConfigPort) -> Result<DataRequest, SignalError> {
    validate_data_config(config)?;
    let require = |key: &str| {
        config
            .get_string("data", key)
            .ok_or_else(|| SignalError::ConfigMissing {
                section: "data".into(),
                key: key.into(),
            })
    };
    let dir = PathBuf::from(require("dir")?.trim());
    let instrument = require("instrument")?.trim().to_string();

    let start = match config.get_string("data", "start_date") {
        Some(s) => parse_date(&s, "start_date")?,
        None => NaiveDate::MIN,
    };
    let end = match config.get_string("data", "end_date") {
        Some(s) => parse_date(&s, "end_date")?,
        None => NaiveDate::MAX,
    };

    Ok(DataRequest {
        dir,
        instrument,
        start,
        end,
    })
}

/// Fetch, compute and decide. The history is computed once and shared.
pub fn analyse(
    data_port: &dyn DataPort,
    request: &DataRequest,
    indicator_config: &IndicatorConfig,
    decision_config: &DecisionConfig,
) -> Result<Analysis, SignalError> {
    let series = data_port.fetch_series(&request.instrument, request.start, request.end)?;
    log::info!(
        "Computing indicators: {} bars, {} to {}, window {}",
        series.len(),
        series.first_date(),
        series.last_date(),
        indicator_config.window
    );
    let history = compute(&series, indicator_config);
    let decision = decide(&history, decision_config)?;
    for diagnostic in &decision.diagnostics {
        log::info!("{}", diagnostic);
    }
    Ok(Analysis {
        series,
        history,
        decision,
    })
}

/// Human-readable summary; percentages to two decimals.
pub fn render_summary(instrument: &str, analysis: &Analysis) -> String {
    let d = &analysis.decision;
    let mut out = format!(
        "{} daily bars for {}: {} to {}\n",
        analysis.series.len(),
        instrument,
        analysis.series.first_date(),
        analysis.series.last_date()
    );

    if !d.has_signal() {
        out.push_str("\nInsufficient historical data for trend prediction.\n");
    } else {
        match d.trend {
            Some(Trend::Bullish) => out.push_str(&format!(
                "\nBullish trend expected based on historical signals: {:.2}% bullish signals\n",
                d.bullish_percentage
            )),
            Some(Trend::Bearish) => out.push_str(&format!(
                "\nBearish trend expected based on historical signals: {:.2}% bearish signals\n",
                d.bearish_percentage
            )),
            _ => out.push_str("\nNo clear trend based on historical signals.\n"),
        }
        out.push_str(&format!(
            "\n MA for upcoming day: {:.4}\n CCI for upcoming day: {:.2}\n Week CCI mean: {}\n",
            d.last_moving_average,
            d.last_cci,
            d.week_cci_mean
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "undefined".to_string())
        ));
    }

    out.push_str(&format!(
        "\nDecision for the upcoming day and week: {}\n",
        d.label
    ));
    out.push_str(&format!("Bullish Percentage: {:.2}%\n", d.bullish_percentage));
    out.push_str(&format!("Bearish Percentage: {:.2}%\n", d.bearish_percentage));
    out.push_str(&format!("Position size: {:.2}\n", d.position_size));

    for diagnostic in &d.diagnostics {
        out.push_str(&format!("note: {}\n", diagnostic));
    }
    out
}

pub fn render_json(instrument: &str, analysis: &Analysis) -> Result<String, SignalError> {
    let report = JsonReport {
        instrument,
        first_date: analysis.series.first_date(),
        last_date: analysis.series.last_date(),
        bars: analysis.series.len(),
        indicators: analysis.history.config(),
        decision: &analysis.decision,
    };
    serde_json::to_string_pretty(&report).map_err(|e| SignalError::Io(io::Error::other(e)))
}

pub fn write_indicator_csv<W: Write>(history: &IndicatorHistory, writer: W) -> Result<(), SignalError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in history.rows() {
        wtr.serialize(row)
            .map_err(|e| SignalError::Io(io::Error::other(e)))?;
    }
    wtr.flush()?;
    Ok(())
}

fn resolve(
    series: &SeriesArgs,
    decision: Option<&DecisionArgs>,
) -> Result<(FileConfigAdapter, DataRequest, IndicatorConfig), SignalError> {
    let mut adapter = load_config(series.config.as_ref())?;
    apply_overrides(&mut adapter, series, decision);
    validate_config(&adapter)?;
    let request = build_data_request(&adapter)?;
    let indicator_config = build_indicator_config(&adapter)?;
    Ok((adapter, request, indicator_config))
}

fn run_decide(
    series: &SeriesArgs,
    decision: &DecisionArgs,
    format: OutputFormat,
    charts: Option<PathBuf>,
) -> Result<(), SignalError> {
    let (adapter, request, indicator_config) = resolve(series, Some(decision))?;
    let decision_config = build_decision_config(&adapter)?;

    let data_port = CsvAdapter::new(request.dir.clone());
    let analysis = analyse(&data_port, &request, &indicator_config, &decision_config)?;

    let chart_dir = charts.or_else(|| {
        adapter
            .get_string("charts", "output_dir")
            .map(PathBuf::from)
    });
    if let Some(dir) = chart_dir {
        let chart_port = SvgChartAdapter::new(dir);
        let written = chart_port.render(&request.instrument, &analysis.series, &analysis.history)?;
        log::info!("Wrote {} chart(s)", written.len());
    }

    match format {
        OutputFormat::Text => print!("{}", render_summary(&request.instrument, &analysis)),
        OutputFormat::Json => println!("{}", render_json(&request.instrument, &analysis)?),
    }
    Ok(())
}

fn run_indicators(series: &SeriesArgs) -> Result<(), SignalError> {
    let (_, request, indicator_config) = resolve(series, None)?;
    let data_port = CsvAdapter::new(request.dir.clone());
    let price_series = data_port.fetch_series(&request.instrument, request.start, request.end)?;
    let history = compute(&price_series, &indicator_config);
    write_indicator_csv(&history, io::stdout().lock())
}

fn run_validate(config_path: &PathBuf) -> Result<(), SignalError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(Some(config_path))?;
    validate_config(&adapter)?;

    let indicators = build_indicator_config(&adapter)?;
    let decision = build_decision_config(&adapter)?;

    eprintln!("\nIndicators:");
    eprintln!("  window:               {}", indicators.window);
    eprintln!("  warmup:               {}", indicators.warmup);
    eprintln!("\nDecision:");
    eprintln!("  trend_window:         {}", decision.trend_window);
    eprintln!("  portfolio_value:      {}", decision.portfolio_value);
    eprintln!("  risk_tolerance:       {}", decision.risk_tolerance);
    eprintln!("  bullish_threshold:    {}", decision.bullish_threshold);
    eprintln!("  bearish_threshold:    {}", decision.bearish_threshold);
    eprintln!("  aux_value:            {}", decision.aux_value);
    eprintln!("  aux_threshold:        {}", decision.aux_threshold);
    eprintln!("  buy_min_bullish_pct:  {}", decision.buy_min_bullish_pct);
    eprintln!("  sell_min_bearish_pct: {}", decision.sell_min_bearish_pct);
    eprintln!("  ma_comparison:        {}", decision.ma_comparison);

    match build_data_request(&adapter) {
        Ok(request) => {
            eprintln!("\nData:");
            eprintln!("  dir:        {}", request.dir.display());
            eprintln!("  instrument: {}", request.instrument);
        }
        Err(e) => log::warn!("{e}; supply it on the command line"),
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list(data_dir: Option<PathBuf>, config_path: Option<&PathBuf>) -> Result<(), SignalError> {
    let adapter = load_config(config_path)?;
    let dir = data_dir
        .or_else(|| adapter.get_string("data", "dir").map(PathBuf::from))
        .ok_or_else(|| SignalError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;

    let instruments = CsvAdapter::new(dir.clone()).list_instruments()?;
    if instruments.is_empty() {
        eprintln!("No instruments found in {}", dir.display());
    } else {
        for instrument in &instruments {
            println!("{}", instrument);
        }
        eprintln!("{} instruments found", instruments.len());
    }
    Ok(())
}
