pub mod data;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod optimizer;
pub mod signals;
pub mod simulator;
pub mod trades;

pub use data::{generate_synthetic_bars, load_file};
pub use engine::{run_backtest, BacktestEngine};
pub use metrics::{PerformanceAnalyzer, PerformanceReport};
pub use optimizer::{optimize_parameters, parse_candidates, ParameterGrid, ParameterOptimizer};
pub use signals::{generate_signals, SignalGenerator};
pub use simulator::{PositionSimulator, Simulation};
pub use trades::TradeRecorder;

// Re-export common types
pub use common::{
    BacktestConfig, BacktestError, BacktestResult, Direction, EquityPoint, MonthlyReturn,
    OptimizationConfig, OptimizationMethod, OptimizationResult, ParamSet, PerformanceMetrics,
    PriceBar, RankedResult, Result, Side, Strategy, StrategyConfig, TargetMetric, Trade,
};
