//! SQLite adapter: price storage and run history.

use chrono::{Local, NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, params};
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::config_validation::read_pool_size;
use crate::domain::error::MeanrevError;
use crate::domain::history::{
    CodePerformance, RunDetails, RunMetadata, StoredRun, StoredTrade, TickerStatistics,
    history_cutoff,
};
use crate::domain::ohlcv::PriceBar;
use crate::domain::position::{ExitReason, Trade};
use crate::domain::strategy::StrategyParams;
use crate::domain::universe::UniverseSummary;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::persistence_port::PersistencePort;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS prices (
    code TEXT NOT NULL,
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    PRIMARY KEY (code, date)
);
CREATE TABLE IF NOT EXISTS backtest_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    strategy_name TEXT NOT NULL,
    rsi_threshold INTEGER NOT NULL,
    exit_percentage REAL NOT NULL,
    red_days INTEGER NOT NULL,
    rsi_period INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    codes TEXT NOT NULL,
    run_at TEXT NOT NULL,
    total_tickers INTEGER NOT NULL,
    successful_tickers INTEGER NOT NULL,
    total_trades INTEGER NOT NULL,
    avg_win_rate REAL NOT NULL,
    avg_return REAL NOT NULL,
    profitable_tickers INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS ticker_performance (
    run_id INTEGER NOT NULL REFERENCES backtest_runs(id),
    code TEXT NOT NULL,
    num_trades INTEGER NOT NULL,
    avg_return_pct REAL NOT NULL,
    win_rate_pct REAL NOT NULL,
    total_return_pct REAL NOT NULL,
    best_trade_pct REAL NOT NULL,
    worst_trade_pct REAL NOT NULL,
    PRIMARY KEY (run_id, code)
);
CREATE TABLE IF NOT EXISTS trade_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES backtest_runs(id),
    code TEXT NOT NULL,
    entry_date TEXT NOT NULL,
    entry_price REAL NOT NULL,
    exit_date TEXT NOT NULL,
    exit_price REAL NOT NULL,
    return_pct REAL NOT NULL,
    holding_days INTEGER NOT NULL,
    exit_reason TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trade_records_run ON trade_records(run_id);
";

const RUN_COLUMNS: &str = "id, strategy_name, rsi_threshold, exit_percentage, red_days, rsi_period,
    start_date, end_date, codes, run_at, total_tickers, successful_tickers, total_trades,
    avg_win_rate, avg_return, profitable_tickers";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> MeanrevError {
    MeanrevError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> MeanrevError {
    MeanrevError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_err(idx, e))
}

fn timestamp_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(|e| conversion_err(idx, e))
}

fn count_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    let n: i64 = row.get(idx)?;
    Ok(n.max(0) as usize)
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRun> {
    let codes: String = row.get(8)?;
    Ok(StoredRun {
        id: row.get(0)?,
        metadata: RunMetadata {
            strategy_name: row.get(1)?,
            params: StrategyParams {
                rsi_threshold: row.get(2)?,
                exit_percentage: row.get(3)?,
                red_days: count_col(row, 4)?,
                rsi_period: count_col(row, 5)?,
            },
            start_date: date_col(row, 6)?,
            end_date: date_col(row, 7)?,
            codes: codes
                .split(',')
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            run_at: timestamp_col(row, 9)?,
        },
        summary: UniverseSummary {
            total_tickers: count_col(row, 10)?,
            successful_tickers: count_col(row, 11)?,
            total_trades: count_col(row, 12)?,
            avg_win_rate: row.get(13)?,
            avg_return: row.get(14)?,
            profitable_tickers: count_col(row, 15)?,
        },
    })
}

fn performance_from_row(row: &Row<'_>) -> rusqlite::Result<CodePerformance> {
    Ok(CodePerformance {
        code: row.get(0)?,
        num_trades: count_col(row, 1)?,
        avg_return_pct: row.get(2)?,
        win_rate_pct: row.get(3)?,
        total_return_pct: row.get(4)?,
        best_trade_pct: row.get(5)?,
        worst_trade_pct: row.get(6)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<StoredTrade> {
    let reason: String = row.get(7)?;
    let exit_reason = reason.parse::<ExitReason>().map_err(|e| {
        conversion_err(7, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    Ok(StoredTrade {
        code: row.get(0)?,
        trade: Trade {
            entry_date: date_col(row, 1)?,
            entry_price: row.get(2)?,
            exit_date: date_col(row, 3)?,
            exit_price: row.get(4)?,
            return_pct: row.get(5)?,
            holding_days: row.get(6)?,
            exit_reason,
        },
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MeanrevError> {
        let db_path = config
            .get_string("sqlite", "path")
            .ok_or_else(|| MeanrevError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })?;
        let pool_size = read_pool_size(config)?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    /// A private in-memory database. Limited to one connection so every
    /// checkout sees the same data.
    pub fn in_memory() -> Result<Self, MeanrevError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, MeanrevError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), MeanrevError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    /// Upserts price bars for `code`; returns the number of rows written.
    pub fn insert_bars(&self, code: &str, bars: &[PriceBar]) -> Result<usize, MeanrevError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO prices (code, date, open, high, low, close)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(query_err)?;
            for bar in bars {
                stmt.execute(params![
                    code,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close
                ])
                .map_err(query_err)?;
            }
        }

        tx.commit().map_err(query_err)?;
        info!(code, bars = bars.len(), "imported price bars");
        Ok(bars.len())
    }

    /// Per-run performance rows for `code` from runs at or after `since`, oldest first.
    pub fn performance_since(
        &self,
        code: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<CodePerformance>, MeanrevError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT p.code, p.num_trades, p.avg_return_pct, p.win_rate_pct,
                     p.total_return_pct, p.best_trade_pct, p.worst_trade_pct
                 FROM ticker_performance p
                 JOIN backtest_runs r ON r.id = p.run_id
                 WHERE p.code = ?1 AND r.run_at >= ?2
                 ORDER BY r.run_at, r.id",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![code, since.format(TIMESTAMP_FORMAT).to_string()],
                performance_from_row,
            )
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MeanrevError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close
                 FROM prices
                 WHERE code = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    code,
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                |row| {
                    Ok(PriceBar::new(
                        date_col(row, 0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}

impl PersistencePort for SqliteAdapter {
    fn persist(
        &self,
        metadata: &RunMetadata,
        results: &[BacktestResult],
    ) -> Result<i64, MeanrevError> {
        let summary = UniverseSummary::from_results(metadata.codes.len(), results);
        let params = &metadata.params;

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "INSERT INTO backtest_runs (strategy_name, rsi_threshold, exit_percentage, red_days,
                 rsi_period, start_date, end_date, codes, run_at, total_tickers,
                 successful_tickers, total_trades, avg_win_rate, avg_return, profitable_tickers)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                metadata.strategy_name,
                params.rsi_threshold,
                params.exit_percentage,
                params.red_days as i64,
                params.rsi_period as i64,
                metadata.start_date.format(DATE_FORMAT).to_string(),
                metadata.end_date.format(DATE_FORMAT).to_string(),
                metadata.codes.join(","),
                metadata.run_at.format(TIMESTAMP_FORMAT).to_string(),
                summary.total_tickers as i64,
                summary.successful_tickers as i64,
                summary.total_trades as i64,
                summary.avg_win_rate,
                summary.avg_return,
                summary.profitable_tickers as i64,
            ],
        )
        .map_err(query_err)?;
        let run_id = tx.last_insert_rowid();

        {
            let mut perf_stmt = tx
                .prepare(
                    "INSERT INTO ticker_performance (run_id, code, num_trades, avg_return_pct,
                         win_rate_pct, total_return_pct, best_trade_pct, worst_trade_pct)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(query_err)?;
            let mut trade_stmt = tx
                .prepare(
                    "INSERT INTO trade_records (run_id, code, entry_date, entry_price, exit_date,
                         exit_price, return_pct, holding_days, exit_reason)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(query_err)?;

            for result in results {
                let perf = CodePerformance::from_summary(&result.code, &result.summary);
                perf_stmt
                    .execute(params![
                        run_id,
                        perf.code,
                        perf.num_trades as i64,
                        perf.avg_return_pct,
                        perf.win_rate_pct,
                        perf.total_return_pct,
                        perf.best_trade_pct,
                        perf.worst_trade_pct,
                    ])
                    .map_err(query_err)?;

                for trade in &result.trades {
                    trade_stmt
                        .execute(params![
                            run_id,
                            result.code,
                            trade.entry_date.format(DATE_FORMAT).to_string(),
                            trade.entry_price,
                            trade.exit_date.format(DATE_FORMAT).to_string(),
                            trade.exit_price,
                            trade.return_pct,
                            trade.holding_days,
                            trade.exit_reason.as_str(),
                        ])
                        .map_err(query_err)?;
                }
            }
        }

        tx.commit().map_err(query_err)?;
        info!(run_id, instruments = results.len(), "run saved");
        Ok(run_id)
    }

    fn recent_runs(&self, limit: usize) -> Result<Vec<StoredRun>, MeanrevError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM backtest_runs ORDER BY run_at DESC, id DESC LIMIT ?1"
            ))
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![limit as i64], run_from_row)
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn run_details(&self, run_id: i64) -> Result<Option<RunDetails>, MeanrevError> {
        let conn = self.conn()?;

        let run = conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM backtest_runs WHERE id = ?1"),
                params![run_id],
                run_from_row,
            )
            .optional()
            .map_err(query_err)?;
        let Some(run) = run else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT code, num_trades, avg_return_pct, win_rate_pct, total_return_pct,
                     best_trade_pct, worst_trade_pct
                 FROM ticker_performance WHERE run_id = ?1 ORDER BY rowid",
            )
            .map_err(query_err)?;
        let performance = stmt
            .query_map(params![run_id], performance_from_row)
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT code, entry_date, entry_price, exit_date, exit_price, return_pct,
                     holding_days, exit_reason
                 FROM trade_records WHERE run_id = ?1 ORDER BY id",
            )
            .map_err(query_err)?;
        let trades = stmt
            .query_map(params![run_id], trade_from_row)
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;

        Ok(Some(RunDetails {
            run,
            performance,
            trades,
        }))
    }

    fn ticker_statistics(
        &self,
        code: &str,
        days: i64,
    ) -> Result<Option<TickerStatistics>, MeanrevError> {
        let since = history_cutoff(Local::now().naive_local(), days)?;
        let rows = self.performance_since(code, since)?;
        Ok(TickerStatistics::from_performances(code, &rows))
    }
}
