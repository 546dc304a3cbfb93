//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::console_notifier::ConsoleNotifier;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestResult;
use crate::domain::config_validation::{
    DataSource, read_backtest_config, read_codes, read_data_source, read_lookback_days,
    read_strategy_name, read_strategy_params, validate_config,
};
use crate::domain::error::MeanrevError;
use crate::domain::history::RunMetadata;
use crate::domain::live_signal::check_live_signals;
use crate::domain::strategy::StrategyParams;
use crate::domain::universe::{UniverseSummary, backtest_universe, load_universe, parse_codes};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[cfg(feature = "sqlite")]
use crate::adapters::sqlite_adapter::SqliteAdapter;
#[cfg(feature = "sqlite")]
use crate::ports::persistence_port::PersistencePort;

#[derive(Parser, Debug)]
#[command(name = "meanrev", about = "Mean-reversion strategy backtester")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the configured codes
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated codes, replacing the configured list
        #[arg(long)]
        code: Option<String>,
        /// Directory for CSV reports
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not record the run in the SQLite history
        #[arg(long)]
        no_save: bool,
    },
    /// Scan the latest bar of each code for a buy signal
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        /// Scan as of this date (YYYY-MM-DD), default today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List stored runs, show one run in detail, or summarise one code across runs
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, conflicts_with = "ticker")]
        run: Option<i64>,
        /// Summarise this code over recent runs
        #[arg(long)]
        ticker: Option<String>,
        /// Window for --ticker, in days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Import a price CSV into the SQLite price table
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        code: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), MeanrevError> {
    match command {
        Command::Backtest {
            config,
            code,
            output,
            no_save,
        } => run_backtest(&config, code.as_deref(), output.as_deref(), no_save),
        Command::Signals {
            config,
            code,
            as_of,
        } => run_signals(&config, code.as_deref(), as_of),
        Command::Validate { config } => run_validate(&config),
        Command::History {
            config,
            limit,
            run,
            ticker,
            days,
        } => match ticker {
            Some(code) => run_ticker_statistics(&config, &code, days),
            None => run_history(&config, limit, run),
        },
        Command::Import { config, file, code } => run_import(&config, &file, &code),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, MeanrevError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// The `--code` override when given, otherwise the configured list.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, MeanrevError> {
    match code_override {
        Some(codes) => Ok(parse_codes(codes)?),
        None => read_codes(config),
    }
}

pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, MeanrevError> {
    match read_data_source(config)? {
        DataSource::Csv { dir } => {
            info!(dir = %dir.display(), "reading prices from CSV");
            Ok(Box::new(CsvAdapter::new(dir)))
        }
        #[cfg(feature = "sqlite")]
        DataSource::Sqlite { path } => {
            info!(%path, "reading prices from SQLite");
            Ok(Box::new(SqliteAdapter::from_config(config)?))
        }
        #[cfg(not(feature = "sqlite"))]
        DataSource::Sqlite { .. } => Err(MeanrevError::config_invalid(
            "data",
            "source",
            "built without sqlite support",
        )),
    }
}

fn run_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    output: Option<&Path>,
    no_save: bool,
) -> Result<(), MeanrevError> {
    let config = load_config(config_path)?;
    let params = read_strategy_params(&config)?;
    let bt_config = read_backtest_config(&config)?;
    let codes = resolve_codes(code_override, &config)?;
    let data_port = open_data_port(&config)?;

    info!(
        codes = codes.len(),
        start = %bt_config.start_date,
        end = %bt_config.end_date,
        "running backtest"
    );

    let universe = load_universe(
        data_port.as_ref(),
        &codes,
        bt_config.start_date,
        bt_config.end_date,
    )?;
    for skipped in &universe.skipped {
        eprintln!("warning: skipping {} ({:?})", skipped.code, skipped.reason);
    }

    let mut results = Vec::with_capacity(universe.instruments.len());
    for outcome in backtest_universe(&universe.instruments, &params, bt_config.risk_free_rate) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => warn!(error = %e, "backtest failed"),
        }
    }

    let summary = UniverseSummary::from_results(codes.len(), &results);
    print_results(&params, &results, &summary);

    let output_dir = output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output_dir").map(PathBuf::from));
    if let Some(dir) = output_dir {
        CsvReportAdapter::new().write(&results, &summary, &dir)?;
        eprintln!("\nReport written to: {}", dir.display());
    }

    if no_save {
        return Ok(());
    }

    let metadata = RunMetadata {
        strategy_name: read_strategy_name(&config),
        params,
        start_date: bt_config.start_date,
        end_date: bt_config.end_date,
        codes,
        run_at: Local::now().naive_local(),
    };
    save_run(&config, &metadata, &results)
}

#[cfg(feature = "sqlite")]
fn save_run(
    config: &dyn ConfigPort,
    metadata: &RunMetadata,
    results: &[BacktestResult],
) -> Result<(), MeanrevError> {
    if config.get_string("sqlite", "path").is_none() {
        info!("no [sqlite] path configured, run not saved");
        return Ok(());
    }
    let store = SqliteAdapter::from_config(config)?;
    let run_id = store.persist(metadata, results)?;
    eprintln!("Saved as run {run_id}");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn save_run(
    _config: &dyn ConfigPort,
    _metadata: &RunMetadata,
    _results: &[BacktestResult],
) -> Result<(), MeanrevError> {
    info!("built without sqlite support, run not saved");
    Ok(())
}

fn print_results(params: &StrategyParams, results: &[BacktestResult], summary: &UniverseSummary) {
    eprintln!(
        "\nStrategy: RSI({}) < {}, {} red days, exit at {:.1}%",
        params.rsi_period,
        params.rsi_threshold,
        params.red_days,
        params.exit_percentage * 100.0
    );

    eprintln!("\n=== Per-Code Results ===");
    eprintln!(
        "  {:<8} {:>6} {:>9} {:>9} {:>10} {:>8} {:>7}",
        "Code", "Trades", "Win Rate", "Avg Ret", "Total Ret", "Max DD", "Sharpe"
    );
    for r in results {
        let s = &r.summary;
        eprintln!(
            "  {:<8} {:>6} {:>8.1}% {:>8.2}% {:>9.2}% {:>7.1}% {:>7.2}",
            r.code,
            s.total_trades,
            s.win_rate * 100.0,
            s.avg_return,
            s.total_return,
            s.max_drawdown,
            s.sharpe_ratio,
        );
    }

    eprintln!("\n=== Aggregate Results ===");
    eprintln!(
        "Instruments:      {} of {}",
        summary.successful_tickers, summary.total_tickers
    );
    eprintln!("Total Trades:     {}", summary.total_trades);
    eprintln!("Avg Win Rate:     {:.1}%", summary.avg_win_rate * 100.0);
    eprintln!("Avg Return:       {:.2}%", summary.avg_return);
    eprintln!("Profitable:       {}", summary.profitable_tickers);
}

fn run_signals(
    config_path: &Path,
    code_override: Option<&str>,
    as_of: Option<NaiveDate>,
) -> Result<(), MeanrevError> {
    let config = load_config(config_path)?;
    let params = read_strategy_params(&config)?;
    let codes = resolve_codes(code_override, &config)?;
    let lookback_days = read_lookback_days(&config)?;
    let data_port = open_data_port(&config)?;
    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());

    info!(codes = codes.len(), %as_of, lookback_days, "scanning for signals");
    let signals = check_live_signals(
        data_port.as_ref(),
        &ConsoleNotifier,
        &codes,
        &params,
        as_of,
        lookback_days,
    )?;

    eprintln!("{} signal(s) across {} code(s)", signals.len(), codes.len());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), MeanrevError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let params = read_strategy_params(&config)?;
    let bt_config = read_backtest_config(&config)?;
    let codes = read_codes(&config)?;

    eprintln!("Strategy: {}", read_strategy_name(&config));
    eprintln!("  rsi_threshold:   {}", params.rsi_threshold);
    eprintln!("  exit_percentage: {}", params.exit_percentage);
    eprintln!("  red_days:        {}", params.red_days);
    eprintln!("  rsi_period:      {}", params.rsi_period);
    eprintln!(
        "Backtest: {} to {}, risk-free rate {}",
        bt_config.start_date, bt_config.end_date, bt_config.risk_free_rate
    );
    eprintln!("Codes: {}", codes.join(", "));
    eprintln!("\nConfiguration is valid");
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_history(config_path: &Path, limit: usize, run_id: Option<i64>) -> Result<(), MeanrevError> {
    let config = load_config(config_path)?;
    let store = SqliteAdapter::from_config(&config)?;

    let Some(run_id) = run_id else {
        let runs = store.recent_runs(limit)?;
        if runs.is_empty() {
            eprintln!("No runs recorded");
            return Ok(());
        }
        eprintln!(
            "  {:>4}  {:<19}  {:<16}  {:>6}  {:>7}  {:>8}  Codes",
            "Id", "Run At", "Strategy", "Trades", "Win %", "Avg Ret"
        );
        for run in &runs {
            let m = &run.metadata;
            eprintln!(
                "  {:>4}  {:<19}  {:<16}  {:>6}  {:>6.1}%  {:>7.2}%  {}",
                run.id,
                m.run_at.format("%Y-%m-%d %H:%M:%S"),
                m.strategy_name,
                run.summary.total_trades,
                run.summary.avg_win_rate * 100.0,
                run.summary.avg_return,
                m.codes.join(","),
            );
        }
        return Ok(());
    };

    let details = store
        .run_details(run_id)?
        .ok_or_else(|| MeanrevError::DatabaseQuery {
            reason: format!("run {run_id} not found"),
        })?;

    let m = &details.run.metadata;
    eprintln!("Run {} ({}) at {}", details.run.id, m.strategy_name, m.run_at);
    eprintln!(
        "  RSI({}) < {}, {} red days, exit at {:.1}%, {} to {}",
        m.params.rsi_period,
        m.params.rsi_threshold,
        m.params.red_days,
        m.params.exit_percentage * 100.0,
        m.start_date,
        m.end_date
    );
    eprintln!("\n=== Per-Code Results ===");
    for p in &details.performance {
        eprintln!(
            "  {:<8} {:>4} trades, {:>5.1}% win rate, avg {:>6.2}%, best {:>6.2}%, worst {:>6.2}%",
            p.code,
            p.num_trades,
            p.win_rate_pct,
            p.avg_return_pct,
            p.best_trade_pct,
            p.worst_trade_pct
        );
    }
    eprintln!("\n=== Trades ===");
    for t in &details.trades {
        eprintln!(
            "  {:<8} {} @ {:.2} -> {} @ {:.2}  {:>6.2}%  {}",
            t.code,
            t.trade.entry_date,
            t.trade.entry_price,
            t.trade.exit_date,
            t.trade.exit_price,
            t.trade.return_pct,
            t.trade.exit_reason
        );
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_ticker_statistics(config_path: &Path, code: &str, days: i64) -> Result<(), MeanrevError> {
    let config = load_config(config_path)?;
    let store = SqliteAdapter::from_config(&config)?;
    let code = code.trim().to_uppercase();

    let Some(stats) = store.ticker_statistics(&code, days)? else {
        eprintln!("No runs for {code} in the last {days} days");
        return Ok(());
    };

    eprintln!("{} over the last {} days", stats.code, days);
    eprintln!("Backtests:        {}", stats.backtest_count);
    eprintln!("Avg Return:       {:.2}%", stats.avg_return);
    eprintln!("Avg Win Rate:     {:.1}%", stats.avg_win_rate_pct);
    eprintln!("Best:             {:.2}%", stats.best_performance);
    eprintln!("Worst:            {:.2}%", stats.worst_performance);
    eprintln!("Consistency:      {:.1}", stats.consistency_score);
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_ticker_statistics(_config_path: &Path, _code: &str, _days: i64) -> Result<(), MeanrevError> {
    Err(MeanrevError::Database {
        reason: "built without sqlite support".into(),
    })
}

#[cfg(not(feature = "sqlite"))]
fn run_history(_config_path: &Path, _limit: usize, _run_id: Option<i64>) -> Result<(), MeanrevError> {
    Err(MeanrevError::Database {
        reason: "built without sqlite support".into(),
    })
}

#[cfg(feature = "sqlite")]
fn run_import(config_path: &Path, file: &Path, code: &str) -> Result<(), MeanrevError> {
    use crate::adapters::csv_adapter::read_price_file;
    use crate::domain::ohlcv::PriceSeries;

    let config = load_config(config_path)?;
    let code = code.trim().to_uppercase();
    let bars = read_price_file(file)?;
    // Reject the whole file if it would not form a valid series.
    let series = PriceSeries::new(bars)?;

    let store = SqliteAdapter::from_config(&config)?;
    let written = store.insert_bars(&code, series.bars())?;
    eprintln!("Imported {written} bars for {code}");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import(_config_path: &Path, _file: &Path, _code: &str) -> Result<(), MeanrevError> {
    Err(MeanrevError::Database {
        reason: "built without sqlite support".into(),
    })
}
