//! Property tests for the indicator, signal, simulation and metric invariants.

mod common;

use common::*;
use meanrev::domain::backtest::{run_backtest, simulate};
use meanrev::domain::indicator::rsi::compute_rsi;
use meanrev::domain::metrics::{PerformanceSummary, compute_max_drawdown};
use meanrev::domain::pattern::compute_red_run;
use meanrev::domain::position::ExitReason;
use meanrev::domain::signal::generate_signals;
use meanrev::domain::strategy::StrategyParams;
use proptest::prelude::*;

fn closes_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..500.0, 1..120)
}

fn params_strategy() -> impl Strategy<Value = StrategyParams> {
    (0u32..=100, 0.005f64..0.5, 0usize..6, 1usize..20).prop_map(
        |(rsi_threshold, exit_percentage, red_days, rsi_period)| StrategyParams {
            rsi_threshold,
            exit_percentage,
            red_days,
            rsi_period,
        },
    )
}

proptest! {
    #[test]
    fn rsi_bounded_and_defined_after_warmup(closes in closes_strategy(), period in 1usize..30) {
        let rsi = compute_rsi(&closes, period).unwrap();
        prop_assert_eq!(rsi.len(), closes.len());
        for (i, value) in rsi.iter().enumerate() {
            match value {
                Some(v) => {
                    prop_assert!(i >= period);
                    prop_assert!((0.0..=100.0).contains(v));
                }
                None => prop_assert!(i < period),
            }
        }
    }

    #[test]
    fn red_run_recurrence(closes in closes_strategy()) {
        let run = compute_red_run(&closes);
        prop_assert_eq!(run.len(), closes.len());
        prop_assert_eq!(run[0], 0);
        for i in 1..closes.len() {
            let expected = if closes[i] < closes[i - 1] { run[i - 1] + 1 } else { 0 };
            prop_assert_eq!(run[i], expected);
        }
    }

    #[test]
    fn signal_requires_all_conditions(closes in closes_strategy(), params in params_strategy()) {
        let frame = generate_signals(&make_series(&closes), &params).unwrap();
        for row in &frame.rows {
            if row.buy_signal {
                let rsi = row.rsi.unwrap();
                prop_assert!(rsi < f64::from(params.rsi_threshold));
                prop_assert!(row.red_run >= params.red_days);
            }
        }
    }

    #[test]
    fn signals_do_not_look_ahead(
        closes in closes_strategy(),
        extra in prop::collection::vec(1.0f64..500.0, 1..20),
        params in params_strategy(),
    ) {
        let short = generate_signals(&make_series(&closes), &params).unwrap();
        let mut extended = closes.clone();
        extended.extend(extra);
        let long = generate_signals(&make_series(&extended), &params).unwrap();

        prop_assert_eq!(&short.rows[..], &long.rows[..closes.len()]);
    }

    #[test]
    fn simulated_trades_are_well_formed(
        closes in closes_strategy(),
        params in params_strategy(),
    ) {
        let series = make_series(&closes);
        let result = run_backtest("P", &series, &params, 0.02).unwrap();
        let last_date = series.last().date;
        let threshold_pct = params.exit_percentage * 100.0;

        for (i, t) in result.trades.iter().enumerate() {
            prop_assert!(t.entry_date < t.exit_date);
            prop_assert_eq!(t.holding_days, (t.exit_date - t.entry_date).num_days());
            match t.exit_reason {
                ExitReason::TargetHit => {
                    prop_assert!(t.return_pct.abs() >= threshold_pct - 1e-9);
                }
                ExitReason::EndOfData => {
                    prop_assert_eq!(i, result.trades.len() - 1);
                    prop_assert_eq!(t.exit_date, last_date);
                    prop_assert!(t.return_pct.abs() < threshold_pct + 1e-9);
                }
            }
        }
        for pair in result.trades.windows(2) {
            prop_assert!(pair[0].exit_date <= pair[1].entry_date);
        }
        prop_assert!(result.trades.len() <= result.signals.signal_count());
        if result.signals.signals()[..closes.len() - 1].iter().any(|&s| s) {
            prop_assert!(!result.trades.is_empty());
        }
    }

    #[test]
    fn simulate_with_arbitrary_signals(
        closes in closes_strategy(),
        seed in prop::collection::vec(any::<bool>(), 120),
        exit in 0.005f64..0.5,
    ) {
        let series = make_series(&closes);
        let signals = &seed[..closes.len()];
        let trades = simulate(&series, signals, exit).unwrap();

        // Every trade opens on a signalling bar.
        for t in &trades {
            let idx = series.bars().iter().position(|b| b.date == t.entry_date).unwrap();
            prop_assert!(signals[idx]);
        }

        // Replay the signals: a flat state opens on any signal before the last bar,
        // and an open position closes on its first bracket breach or on the last bar.
        let last = closes.len() - 1;
        let mut entry: Option<f64> = None;
        let mut eligible = Vec::new();
        for (i, &close) in closes.iter().enumerate() {
            match entry {
                None if signals[i] && i < last => {
                    entry = Some(close);
                    eligible.push(i);
                }
                None => {}
                Some(price) => {
                    if ((close - price) / price).abs() >= exit || i == last {
                        entry = None;
                    }
                }
            }
        }

        prop_assert_eq!(trades.len(), eligible.len());
        let entries: Vec<_> = trades.iter().map(|t| t.entry_date).collect();
        let expected: Vec<_> = eligible.iter().map(|&i| series.bars()[i].date).collect();
        prop_assert_eq!(entries, expected);
    }

    #[test]
    fn metrics_are_bounded(returns in prop::collection::vec(-50.0f64..50.0, 0..40)) {
        let drawdown = compute_max_drawdown(&returns);
        prop_assert!(drawdown >= 0.0);
        prop_assert!(drawdown <= 100.0);

        let closes: Vec<f64> = std::iter::once(100.0)
            .chain(returns.iter().map(|r| 100.0 * (1.0 + r / 100.0)))
            .collect();
        let series = make_series(&closes);
        let trades: Vec<_> = (1..closes.len())
            .map(|i| {
                meanrev::domain::position::Position::open(series.bars()[0].date, closes[0])
                    .close(series.bars()[i].date, closes[i], ExitReason::TargetHit)
            })
            .collect();

        let summary = PerformanceSummary::compute(&trades, 0.02);
        prop_assert!((0.0..=1.0).contains(&summary.win_rate));
        prop_assert_eq!(summary.total_trades, trades.len());
        prop_assert!(summary.max_drawdown >= 0.0);
        prop_assert_eq!(&summary, &PerformanceSummary::compute(&trades, 0.02));
    }
}
