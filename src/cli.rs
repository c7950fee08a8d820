//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestJob, BacktestReport, run_batch};
use crate::domain::config_validation::{
    parse_date, parse_tickers, validate_backtest_config, validate_strategy_config,
    validate_strategy_type,
};
use crate::domain::error::MacrossError;
use crate::domain::indicator::MovingAverage;
use crate::domain::signal::StrategyId;
use crate::domain::strategy::{AdaptiveMaParams, CrossoverParams, Strategy, TripleMaParams};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "macross", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for every configured ticker
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding one <TICKER>.csv per ticker
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List tickers available in a data directory
    ListTickers {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            ticker,
            dry_run,
        } => run_backtest(&config, &data, ticker.as_deref(), dry_run),
        Command::Validate { config } => run_validate(&config),
        Command::ListTickers { data } => run_list_tickers(&data),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| report_error(&e))
}

fn report_error(e: &MacrossError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

/// Everything a run needs from a validated configuration.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub config: BacktestConfig,
    pub strategy: Strategy,
    pub tickers: Vec<String>,
}

pub fn build_plan(adapter: &dyn ConfigPort, ticker_override: Option<&str>) -> Result<RunPlan, MacrossError> {
    validate_backtest_config(adapter)?;
    validate_strategy_config(adapter)?;
    Ok(RunPlan {
        config: build_backtest_config(adapter)?,
        strategy: build_strategy(adapter)?,
        tickers: resolve_tickers(ticker_override, adapter),
    })
}

fn run_backtest(
    config_path: &PathBuf,
    data_path: &PathBuf,
    ticker_override: Option<&str>,
    dry_run: bool,
) -> ExitCode {
    tracing::info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let plan = match build_plan(&adapter, ticker_override) {
        Ok(p) => p,
        Err(e) => return report_error(&e),
    };

    if dry_run {
        print_plan(&plan);
        println!("Dry run complete: configuration is valid");
        return ExitCode::SUCCESS;
    }

    let data_port = CsvAdapter::new(data_path.clone());
    run_backtest_pipeline(&data_port, &adapter, &plan)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, MacrossError> {
    Ok(BacktestConfig {
        start_date: parse_date(adapter, "start_date")?,
        end_date: parse_date(adapter, "end_date")?,
        initial_cash: adapter.get_double("backtest", "initial_cash", 100_000.0),
    })
}

fn window_param(adapter: &dyn ConfigPort, key: &str, default: usize) -> usize {
    adapter.get_int("strategy", key, default as i64).max(0) as usize
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, MacrossError> {
    let id = validate_strategy_type(adapter)?;
    let allocation = adapter.get_double("strategy", "allocation", 1.0);

    let crossover = |d: CrossoverParams| CrossoverParams {
        short_window: window_param(adapter, "short_window", d.short_window),
        long_window: window_param(adapter, "long_window", d.long_window),
        allocation,
    };

    let strategy = match id {
        StrategyId::SmaCrossover => Strategy::SmaCrossover(crossover(CrossoverParams::sma_defaults())),
        StrategyId::EmaCrossover => Strategy::EmaCrossover(crossover(CrossoverParams::ema_defaults())),
        StrategyId::TripleMa => {
            let d = TripleMaParams::default();
            Strategy::TripleMa(TripleMaParams {
                fast_window: window_param(adapter, "fast_window", d.fast_window),
                medium_window: window_param(adapter, "medium_window", d.medium_window),
                slow_window: window_param(adapter, "slow_window", d.slow_window),
                allocation,
            })
        }
        StrategyId::AdaptiveMa => {
            let d = AdaptiveMaParams::default();
            let average = adapter
                .get_string("strategy", "average")
                .and_then(|s| MovingAverage::parse(&s))
                .unwrap_or(d.average);
            Strategy::AdaptiveMa(AdaptiveMaParams {
                short_window: window_param(adapter, "short_window", d.short_window),
                long_window: window_param(adapter, "long_window", d.long_window),
                average,
                volatility_window: window_param(adapter, "volatility_window", d.volatility_window),
                volatility_threshold: adapter.get_double(
                    "strategy",
                    "volatility_threshold",
                    d.volatility_threshold,
                ),
                confirmation_days: adapter
                    .get_int("strategy", "confirmation_days", d.confirmation_days as i64)
                    .clamp(0, u32::MAX as i64) as u32,
                allocation,
            })
        }
    };

    strategy.validate()?;
    Ok(strategy)
}

/// Allocation for `ticker`: its `[allocations]` entry if present, else `default`.
pub fn resolve_allocation(config: &dyn ConfigPort, ticker: &str, default: f64) -> f64 {
    config.get_double("allocations", ticker, default)
}

pub fn resolve_tickers(ticker_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    if let Some(t) = ticker_override {
        return parse_tickers(t);
    }
    config
        .get_string("backtest", "tickers")
        .map(|s| parse_tickers(&s))
        .unwrap_or_default()
}

/// Loads every ticker's full history up to the end date. Tickers that fail
/// to load are logged and left out.
pub fn collect_jobs(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    plan: &RunPlan,
) -> Vec<BacktestJob> {
    let mut jobs = Vec::with_capacity(plan.tickers.len());

    for ticker in &plan.tickers {
        let prices = match data_port.fetch_prices(ticker, NaiveDate::MIN, plan.config.end_date) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%ticker, error = %e, "skipping ticker");
                continue;
            }
        };

        let allocation = resolve_allocation(config, ticker, plan.strategy.allocation());
        jobs.push(BacktestJob {
            ticker: ticker.clone(),
            prices,
            strategy: plan.strategy.clone().with_allocation(allocation),
        });
    }

    jobs
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    plan: &RunPlan,
) -> ExitCode {
    let jobs = collect_jobs(data_port, config, plan);
    if jobs.is_empty() {
        eprintln!("error: no tickers with data to backtest");
        return ExitCode::from(5);
    }

    tracing::info!(
        jobs = jobs.len(),
        strategy = %plan.strategy.id(),
        start = %plan.config.start_date,
        end = %plan.config.end_date,
        "running backtests"
    );

    let results = run_batch(&jobs, &plan.config);

    println!("{}", summary_header());
    let mut first_error: Option<&MacrossError> = None;
    for (job, result) in jobs.iter().zip(&results) {
        match result {
            Ok(report) => println!("{}", summary_row(report)),
            Err(e) => {
                println!("{:<8} error: {}", job.ticker, e);
                // protocol violations outrank ordinary failures
                if first_error.is_none_or(|prev| e.is_protocol_violation() && !prev.is_protocol_violation()) {
                    first_error = Some(e);
                }
            }
        }
    }

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    match first_error {
        Some(e) if e.is_protocol_violation() || succeeded == 0 => e.into(),
        _ => ExitCode::SUCCESS,
    }
}

fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn fmt_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}", v))
}

pub fn summary_header() -> String {
    format!(
        "{:<8} {:<14} {:>10} {:>10} {:>10} {:>9} {:>7} {:>8} {:>7}",
        "Ticker", "Strategy", "Return", "B&H", "Annual", "MaxDD", "Sharpe", "WinRate", "Trades"
    )
}

pub fn summary_row(report: &BacktestReport) -> String {
    let m = &report.metrics;
    format!(
        "{:<8} {:<14} {:>10} {:>10} {:>10} {:>9} {:>7} {:>8} {:>7}",
        report.ticker,
        report.strategy.as_str(),
        fmt_pct(Some(m.total_return)),
        fmt_pct(Some(report.benchmark_return)),
        fmt_pct(Some(m.annualized_return)),
        format!("-{:.1}%", m.max_drawdown * 100.0),
        fmt_ratio(m.sharpe_ratio),
        fmt_pct(m.win_rate),
        m.transaction_count,
    )
}

fn print_plan(plan: &RunPlan) {
    println!("Strategy:     {:?}", plan.strategy);
    println!(
        "Window:       {} to {}",
        plan.config.start_date, plan.config.end_date
    );
    println!("Initial cash: {:.2}", plan.config.initial_cash);
    println!("Tickers:      {}", plan.tickers.join(", "));
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    tracing::info!(path = %config_path.display(), "validating config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match build_plan(&adapter, None) {
        Ok(plan) => {
            print_plan(&plan);
            println!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn run_list_tickers(data_path: &PathBuf) -> ExitCode {
    let adapter = CsvAdapter::new(data_path.clone());
    match adapter.list_tickers() {
        Ok(tickers) if tickers.is_empty() => {
            eprintln!("No tickers found in {}", data_path.display());
            ExitCode::SUCCESS
        }
        Ok(tickers) => {
            for ticker in &tickers {
                println!("{}", ticker);
            }
            tracing::info!(count = tickers.len(), "tickers found");
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}
