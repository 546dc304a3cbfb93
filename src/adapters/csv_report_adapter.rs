//! CSV report adapter implementing ReportPort.
//!
//! Writes into `output_dir`:
//! - `trades.csv`: every trade, tagged with its code
//! - `summary.csv`: one performance row per code
//! - `universe.csv`: the cross-instrument aggregate
//! - `signals_<CODE>.csv`: the signal frame per code, for charting

use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MeanrevError;
use crate::domain::position::ExitReason;
use crate::domain::universe::UniverseSummary;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct TradeRow<'a> {
    code: &'a str,
    entry_date: NaiveDate,
    entry_price: f64,
    exit_date: NaiveDate,
    exit_price: f64,
    return_pct: f64,
    holding_days: i64,
    exit_reason: ExitReason,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    code: &'a str,
    total_trades: usize,
    winning_trades: usize,
    losing_trades: usize,
    win_rate: f64,
    avg_return: f64,
    total_return: f64,
    best_trade: f64,
    worst_trade: f64,
    largest_win: f64,
    largest_loss: f64,
    median_return: f64,
    std_return: f64,
    avg_win: f64,
    avg_loss: f64,
    profit_factor: f64,
    avg_holding_days: f64,
    max_drawdown: f64,
    sharpe_ratio: f64,
}

#[derive(Serialize)]
struct SignalRow {
    date: NaiveDate,
    close: f64,
    rsi: Option<f64>,
    red_run: usize,
    buy_signal: bool,
}

fn report_err(e: csv::Error) -> MeanrevError {
    MeanrevError::Report {
        reason: e.to_string(),
    }
}

fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), MeanrevError> {
    let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;
    for row in rows {
        wtr.serialize(row).map_err(report_err)?;
    }
    wtr.flush()?;
    Ok(())
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        results: &[BacktestResult],
        summary: &UniverseSummary,
        output_dir: &Path,
    ) -> Result<(), MeanrevError> {
        fs::create_dir_all(output_dir)?;

        // Header rows are only emitted with the first record, so an empty
        // trade list still gets them through an explicit write.
        let trades_path = output_dir.join("trades.csv");
        if results.iter().all(|r| r.trades.is_empty()) {
            let mut wtr = csv::Writer::from_path(&trades_path).map_err(report_err)?;
            wtr.write_record([
                "code",
                "entry_date",
                "entry_price",
                "exit_date",
                "exit_price",
                "return_pct",
                "holding_days",
                "exit_reason",
            ])
            .map_err(report_err)?;
            wtr.flush()?;
        } else {
            write_rows(
                &trades_path,
                results.iter().flat_map(|r| {
                    r.trades.iter().map(|t| TradeRow {
                        code: &r.code,
                        entry_date: t.entry_date,
                        entry_price: t.entry_price,
                        exit_date: t.exit_date,
                        exit_price: t.exit_price,
                        return_pct: t.return_pct,
                        holding_days: t.holding_days,
                        exit_reason: t.exit_reason,
                    })
                }),
            )?;
        }

        write_rows(
            &output_dir.join("summary.csv"),
            results.iter().map(|r| {
                let s = &r.summary;
                SummaryRow {
                    code: &r.code,
                    total_trades: s.total_trades,
                    winning_trades: s.winning_trades,
                    losing_trades: s.losing_trades,
                    win_rate: s.win_rate,
                    avg_return: s.avg_return,
                    total_return: s.total_return,
                    best_trade: s.best_trade,
                    worst_trade: s.worst_trade,
                    largest_win: s.largest_win,
                    largest_loss: s.largest_loss,
                    median_return: s.median_return,
                    std_return: s.std_return,
                    avg_win: s.avg_win,
                    avg_loss: s.avg_loss,
                    profit_factor: s.profit_factor,
                    avg_holding_days: s.avg_holding_days,
                    max_drawdown: s.max_drawdown,
                    sharpe_ratio: s.sharpe_ratio,
                }
            }),
        )?;

        write_rows(&output_dir.join("universe.csv"), [summary])?;

        for result in results {
            write_rows(
                &output_dir.join(format!("signals_{}.csv", result.code)),
                result.signals.rows.iter().map(|row| SignalRow {
                    date: row.date,
                    close: row.close,
                    rsi: row.rsi,
                    red_run: row.red_run,
                    buy_signal: row.buy_signal,
                }),
            )?;
        }

        info!(dir = %output_dir.display(), instruments = results.len(), "report written");
        Ok(())
    }
}
