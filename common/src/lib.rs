pub mod config;
pub mod error;
pub mod strategy;
pub mod types;

pub use config::{BacktestConfig, OptimizationConfig, OptimizationMethod, TargetMetric};
pub use error::{BacktestError, Result};
pub use strategy::{Strategy, StrategyConfig};
pub use types::*;
