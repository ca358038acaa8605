use std::time::Instant;

use common::{
    BacktestConfig, BacktestError, BacktestResult, EquityPoint, PriceBar, Result, Strategy,
    StrategyConfig,
};
use tracing::debug;

use crate::metrics::PerformanceAnalyzer;
use crate::signals::SignalGenerator;
use crate::simulator::PositionSimulator;
use crate::trades::TradeRecorder;

/// Signal generation → position simulation → trade reconstruction →
/// performance analysis
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run backtest on provided bar data
    pub fn run(&self, bars: &[PriceBar], strategy: &Strategy) -> Result<BacktestResult> {
        validate_capital(self.config.initial_capital)?;
        validate_bars(bars)?;
        Ok(self.run_validated(bars, strategy))
    }

    /// Run without re-checking inputs. Callers must have validated `bars`
    /// and the capital.
    pub(crate) fn run_validated(&self, bars: &[PriceBar], strategy: &Strategy) -> BacktestResult {
        let start_time = Instant::now();
        let capital = self.config.initial_capital;

        let signals = SignalGenerator::new(strategy).generate(bars);
        let simulation = PositionSimulator::simulate(bars, &signals, capital);
        let trades = TradeRecorder::new(capital, self.config.position_size_pct).record(bars, &signals);
        let report =
            PerformanceAnalyzer::analyze(bars, &simulation, &trades, self.config.risk_free_rate);

        let equity_curve = bars
            .iter()
            .zip(&simulation.equity)
            .map(|(bar, &equity)| EquityPoint {
                date: bar.date,
                equity,
            })
            .collect();

        debug!(
            strategy = strategy.name(),
            bars = bars.len(),
            trades = trades.len(),
            total_return = report.metrics.total_return,
            elapsed_us = start_time.elapsed().as_micros() as u64,
            "backtest complete"
        );

        BacktestResult {
            performance_metrics: report.metrics,
            trades,
            monthly_returns: report.monthly_returns,
            equity_curve,
        }
    }
}

/// Resolve the strategy block and run one backtest
pub fn run_backtest(
    bars: &[PriceBar],
    strategy: &StrategyConfig,
    initial_capital: f64,
) -> Result<BacktestResult> {
    let strategy = Strategy::from_config(strategy)?;
    let config = BacktestConfig::default().with_capital(initial_capital);
    BacktestEngine::new(config).run(bars, &strategy)
}

/// Reject series the pipeline cannot interpret: non-positive or non-finite
/// closes, and dates that do not strictly increase.
pub fn validate_bars(bars: &[PriceBar]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(BacktestError::InvalidInput(format!(
                "bar {} ({}) has invalid close {}",
                i, bar.date, bar.close
            )));
        }
    }

    if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(BacktestError::InvalidInput(format!(
            "dates must strictly increase: {} followed by {}",
            w[0].date, w[1].date
        )));
    }

    Ok(())
}

pub fn validate_capital(capital: f64) -> Result<()> {
    if capital.is_finite() && capital > 0.0 {
        Ok(())
    } else {
        Err(BacktestError::InvalidInput(format!(
            "initial capital must be positive, got {}",
            capital
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use common::Side;

    fn generate_test_bars(n: usize, base_price: f64) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let price = base_price + (i as f64 * 0.1).sin() * 5.0;
                PriceBar {
                    date: start + Duration::days(i as i64),
                    open: price - 0.1,
                    high: price + 0.5,
                    low: price - 0.5,
                    close: price,
                    volume: 1000000,
                }
            })
            .collect()
    }

    #[test]
    fn test_backtest_runs() {
        let engine = BacktestEngine::new(BacktestConfig::default());
        let bars = generate_test_bars(200, 50.0);
        let strategy = Strategy::MaCross { short: 5, long: 20 };

        let result = engine.run(&bars, &strategy).unwrap();

        assert_eq!(result.equity_curve.len(), bars.len());
        assert_eq!(result.equity_curve[0].equity, 1_000_000.0);
        assert!(!result.trades.is_empty());
        assert_eq!(result.trades[0].side, Side::Buy);
        assert!(result.performance_metrics.win_rate >= 0.0);
        assert!(result.performance_metrics.win_rate <= 1.0);
    }

    #[test]
    fn test_unsupported_strategy_zeroed() {
        let engine = BacktestEngine::new(BacktestConfig::default().with_capital(5000.0));
        let bars = generate_test_bars(50, 50.0);

        let result = engine
            .run(&bars, &Strategy::Unsupported("kd".to_string()))
            .unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.performance_metrics.total_return, 0.0);
        assert_eq!(result.performance_metrics.max_drawdown, 0.0);
        assert!(result.equity_curve.iter().all(|p| p.equity == 5000.0));
    }

    #[test]
    fn test_empty_series_is_accepted() {
        let engine = BacktestEngine::new(BacktestConfig::default());
        let result = engine
            .run(&[], &Strategy::MaCross { short: 5, long: 20 })
            .unwrap();

        assert!(result.equity_curve.is_empty());
        assert_eq!(result.performance_metrics.total_return, 0.0);
    }

    #[test]
    fn test_rejects_bad_close() {
        let mut bars = generate_test_bars(10, 50.0);
        bars[4].close = -1.0;

        let engine = BacktestEngine::new(BacktestConfig::default());
        let err = engine
            .run(&bars, &Strategy::MaCross { short: 2, long: 3 })
            .unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let mut bars = generate_test_bars(10, 50.0);
        bars.swap(3, 4);
        assert!(validate_bars(&bars).is_err());

        let mut bars = generate_test_bars(10, 50.0);
        bars[5].date = bars[4].date;
        assert!(validate_bars(&bars).is_err());
    }

    #[test]
    fn test_rejects_bad_capital() {
        let bars = generate_test_bars(10, 50.0);
        let strategy = StrategyConfig::new("rsi");
        for capital in [0.0, -10.0, f64::NAN] {
            assert!(run_backtest(&bars, &strategy, capital).is_err());
        }
    }
}
