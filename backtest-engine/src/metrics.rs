use common::{MonthlyReturn, PerformanceMetrics, PriceBar, Side, Trade};

use crate::indicators::sample_std;
use crate::simulator::Simulation;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

/// Metrics plus the per-month return breakdown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceReport {
    pub metrics: PerformanceMetrics,
    pub monthly_returns: Vec<MonthlyReturn>,
}

/// Derive performance metrics from a simulation and its trades
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    /// Calculate all performance metrics.
    ///
    /// Degenerate inputs (empty series, zero day span, zero volatility)
    /// yield 0 for the affected metric rather than NaN or infinity.
    pub fn analyze(
        bars: &[PriceBar],
        simulation: &Simulation,
        trades: &[Trade],
        risk_free_rate: f64,
    ) -> PerformanceReport {
        let total_return = Self::calculate_total_return(simulation);
        let annualized_return = Self::calculate_annualized_return(bars, total_return);
        let sharpe_ratio =
            Self::calculate_sharpe_ratio(simulation, annualized_return, risk_free_rate);
        let max_drawdown = Self::calculate_max_drawdown(&simulation.equity);
        let (win_rate, total_trades) = Self::calculate_win_rate(trades);

        PerformanceReport {
            metrics: PerformanceMetrics {
                total_return,
                annualized_return,
                sharpe_ratio,
                max_drawdown,
                win_rate,
                total_trades,
            },
            monthly_returns: Self::calculate_monthly_returns(bars, simulation),
        }
    }

    fn calculate_total_return(simulation: &Simulation) -> f64 {
        simulation
            .cum_strategy_returns
            .last()
            .map(|c| c - 1.0)
            .unwrap_or(0.0)
    }

    /// Compound over the calendar-day span between first and last bar
    fn calculate_annualized_return(bars: &[PriceBar], total_return: f64) -> f64 {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return 0.0;
        };

        let days = (last.date - first.date).num_days();
        if days <= 0 {
            return 0.0;
        }

        let annualized = (1.0 + total_return).powf(CALENDAR_DAYS_PER_YEAR / days as f64) - 1.0;
        finite_or_zero(annualized)
    }

    /// Annualized excess return over annualized sample volatility of the
    /// per-bar strategy returns
    fn calculate_sharpe_ratio(
        simulation: &Simulation,
        annualized_return: f64,
        risk_free_rate: f64,
    ) -> f64 {
        let returns: Vec<f64> = simulation.defined_strategy_returns().collect();
        if returns.is_empty() {
            return 0.0;
        }

        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        match sample_std(&returns, mean) {
            Some(std) if std > 0.0 => finite_or_zero(
                (annualized_return - risk_free_rate) / (std * TRADING_DAYS_PER_YEAR.sqrt()),
            ),
            _ => 0.0,
        }
    }

    /// Most negative fractional decline from the running equity peak
    pub fn calculate_max_drawdown(equity: &[f64]) -> f64 {
        let Some(&first) = equity.first() else {
            return 0.0;
        };

        let mut peak = first;
        let mut max_drawdown = 0.0_f64;

        for &value in equity {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                max_drawdown = max_drawdown.min((value - peak) / peak);
            }
        }

        max_drawdown
    }

    /// Fraction of closing trades with positive pnl, and the closing-trade count
    fn calculate_win_rate(trades: &[Trade]) -> (f64, u32) {
        let closed: Vec<&Trade> = trades.iter().filter(|t| t.side == Side::Sell).collect();
        if closed.is_empty() {
            return (0.0, 0);
        }

        let winning = closed.iter().filter(|t| t.pnl > 0).count();
        (winning as f64 / closed.len() as f64, closed.len() as u32)
    }

    /// Sum strategy returns per `YYYY-MM`, in first-seen order
    fn calculate_monthly_returns(bars: &[PriceBar], simulation: &Simulation) -> Vec<MonthlyReturn> {
        let mut monthly: Vec<MonthlyReturn> = Vec::new();

        for (bar, ret) in bars.iter().zip(&simulation.strategy_returns) {
            let month = bar.date.format("%Y-%m").to_string();
            let ret = ret.unwrap_or(0.0);

            match monthly.iter_mut().rev().find(|m| m.month == month) {
                Some(entry) => entry.value += ret,
                None => monthly.push(MonthlyReturn { month, value: ret }),
            }
        }

        monthly
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
