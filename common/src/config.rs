use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::PerformanceMetrics;

/// Backtest settings shared by every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction of initial capital committed to each long entry
    pub position_size_pct: f64,
    /// Annual risk-free rate used by the Sharpe ratio
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            position_size_pct: 0.1,
            risk_free_rate: 0.02,
        }
    }
}

impl BacktestConfig {
    pub fn with_capital(mut self, capital: f64) -> Self {
        self.initial_capital = capital;
        self
    }

    pub fn with_position_size(mut self, position_size_pct: f64) -> Self {
        self.position_size_pct = position_size_pct;
        self
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }
}

/// Metric used to rank grid points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetMetric {
    TotalReturn,
    AnnualizedReturn,
    SharpeRatio,
    MaxDrawdown,
    WinRate,
    /// Any other name; always evaluates to 0
    Other(String),
}

impl TargetMetric {
    pub fn parse(name: &str) -> Self {
        match name {
            "total_return" => TargetMetric::TotalReturn,
            "annualized_return" => TargetMetric::AnnualizedReturn,
            "sharpe_ratio" => TargetMetric::SharpeRatio,
            "max_drawdown" => TargetMetric::MaxDrawdown,
            "win_rate" => TargetMetric::WinRate,
            other => TargetMetric::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TargetMetric::TotalReturn => "total_return",
            TargetMetric::AnnualizedReturn => "annualized_return",
            TargetMetric::SharpeRatio => "sharpe_ratio",
            TargetMetric::MaxDrawdown => "max_drawdown",
            TargetMetric::WinRate => "win_rate",
            TargetMetric::Other(name) => name,
        }
    }

    /// Extract this metric from a metrics block
    pub fn value_of(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            TargetMetric::TotalReturn => metrics.total_return,
            TargetMetric::AnnualizedReturn => metrics.annualized_return,
            TargetMetric::SharpeRatio => metrics.sharpe_ratio,
            TargetMetric::MaxDrawdown => metrics.max_drawdown,
            TargetMetric::WinRate => metrics.win_rate,
            TargetMetric::Other(_) => 0.0,
        }
    }

    /// Whether lower values rank first
    pub fn is_minimized(&self) -> bool {
        matches!(self, TargetMetric::MaxDrawdown)
    }
}

impl Default for TargetMetric {
    fn default() -> Self {
        TargetMetric::SharpeRatio
    }
}

impl From<String> for TargetMetric {
    fn from(name: String) -> Self {
        TargetMetric::parse(&name)
    }
}

impl From<TargetMetric> for String {
    fn from(metric: TargetMetric) -> Self {
        metric.as_str().to_string()
    }
}

impl fmt::Display for TargetMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search method requested by the caller.
///
/// Only grid search exists; other names are accepted and run the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OptimizationMethod {
    Grid,
    Other(String),
}

impl OptimizationMethod {
    pub fn parse(name: &str) -> Self {
        match name {
            "grid" => OptimizationMethod::Grid,
            other => OptimizationMethod::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OptimizationMethod::Grid => "grid",
            OptimizationMethod::Other(name) => name,
        }
    }
}

impl Default for OptimizationMethod {
    fn default() -> Self {
        OptimizationMethod::Grid
    }
}

impl From<String> for OptimizationMethod {
    fn from(name: String) -> Self {
        OptimizationMethod::parse(&name)
    }
}

impl From<OptimizationMethod> for String {
    fn from(method: OptimizationMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optimization request settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub method: OptimizationMethod,
    pub target_metric: TargetMetric,
    /// Candidate values per parameter name; missing names use the built-in grid
    pub param_ranges: BTreeMap<String, Vec<f64>>,
}

impl OptimizationConfig {
    pub fn with_target(mut self, target: TargetMetric) -> Self {
        self.target_metric = target;
        self
    }

    pub fn with_range(mut self, name: &str, values: Vec<f64>) -> Self {
        self.param_ranges.insert(name.to_string(), values);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtest_config_defaults() {
        let config = BacktestConfig::default();
        assert_eq!(config.initial_capital, 1_000_000.0);
        assert_eq!(config.position_size_pct, 0.1);
        assert_eq!(config.risk_free_rate, 0.02);
    }

    #[test]
    fn test_backtest_config_partial_json() {
        let config: BacktestConfig = serde_json::from_str(r#"{"initial_capital": 50000}"#).unwrap();
        assert_eq!(config.initial_capital, 50000.0);
        assert_eq!(config.position_size_pct, 0.1);
    }

    #[test]
    fn test_target_metric_lookup() {
        let metrics = PerformanceMetrics {
            total_return: 0.1,
            annualized_return: 0.2,
            sharpe_ratio: 1.5,
            max_drawdown: -0.3,
            win_rate: 0.6,
            total_trades: 5,
        };
        assert_eq!(TargetMetric::parse("total_return").value_of(&metrics), 0.1);
        assert_eq!(TargetMetric::parse("annualized_return").value_of(&metrics), 0.2);
        assert_eq!(TargetMetric::parse("sharpe_ratio").value_of(&metrics), 1.5);
        assert_eq!(TargetMetric::parse("max_drawdown").value_of(&metrics), -0.3);
        assert_eq!(TargetMetric::parse("win_rate").value_of(&metrics), 0.6);
        // "sharpe" is not a metric name
        assert_eq!(TargetMetric::parse("sharpe").value_of(&metrics), 0.0);
    }

    #[test]
    fn test_optimization_config_from_json() {
        let config: OptimizationConfig = serde_json::from_str(
            r#"{"method":"genetic","target_metric":"max_drawdown","param_ranges":{"short":[5,10]}}"#,
        )
        .unwrap();
        assert_eq!(config.method, OptimizationMethod::Other("genetic".to_string()));
        assert!(config.target_metric.is_minimized());
        assert_eq!(config.param_ranges["short"], vec![5.0, 10.0]);

        let round_trip = serde_json::to_value(&config).unwrap();
        assert_eq!(round_trip["target_metric"], "max_drawdown");
    }
}
