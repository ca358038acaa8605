use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};
use crate::types::ParamSet;

pub const MA_CROSS: &str = "ma_cross";
pub const RSI: &str = "rsi";
pub const BOLLINGER: &str = "bollinger";

/// Strategy block as it arrives on the wire: `{"type": "...", "params": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub params: ParamSet,
}

impl StrategyConfig {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            params: ParamSet::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }
}

/// Strategy with every parameter resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    MaCross {
        short: usize,
        long: usize,
    },
    Rsi {
        period: usize,
        overbought: f64,
        oversold: f64,
    },
    Bollinger {
        period: usize,
        std_dev: f64,
    },
    /// Unknown strategy type. Generates no signals.
    Unsupported(String),
}

impl Strategy {
    /// Resolve a wire strategy, filling in defaults for missing parameters
    pub fn from_config(config: &StrategyConfig) -> Result<Self> {
        let params = &config.params;
        let strategy = match config.kind.as_str() {
            MA_CROSS => Strategy::MaCross {
                short: window(params, "short", 5)?,
                long: window(params, "long", 20)?,
            },
            RSI => Strategy::Rsi {
                period: window(params, "period", 14)?,
                overbought: threshold(params, "overbought", 70.0)?,
                oversold: threshold(params, "oversold", 30.0)?,
            },
            BOLLINGER => Strategy::Bollinger {
                period: window(params, "period", 20)?,
                std_dev: threshold(params, "std", 2.0)?,
            },
            other => Strategy::Unsupported(other.to_string()),
        };
        Ok(strategy)
    }

    pub fn name(&self) -> &str {
        match self {
            Strategy::MaCross { .. } => MA_CROSS,
            Strategy::Rsi { .. } => RSI,
            Strategy::Bollinger { .. } => BOLLINGER,
            Strategy::Unsupported(name) => name,
        }
    }

    /// Resolved parameters in wire form
    pub fn params(&self) -> ParamSet {
        let pairs: Vec<(&str, f64)> = match self {
            Strategy::MaCross { short, long } => {
                vec![("short", *short as f64), ("long", *long as f64)]
            }
            Strategy::Rsi {
                period,
                overbought,
                oversold,
            } => vec![
                ("period", *period as f64),
                ("overbought", *overbought),
                ("oversold", *oversold),
            ],
            Strategy::Bollinger { period, std_dev } => {
                vec![("period", *period as f64), ("std", *std_dev)]
            }
            Strategy::Unsupported(_) => vec![],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

/// Rolling window length: a positive whole number
fn window(params: &ParamSet, name: &str, default: usize) -> Result<usize> {
    match params.get(name) {
        None => Ok(default),
        Some(&v) if v.is_finite() && v >= 1.0 && v.fract() == 0.0 => Ok(v as usize),
        Some(&v) => Err(BacktestError::InvalidInput(format!(
            "parameter '{}' must be a positive integer, got {}",
            name, v
        ))),
    }
}

fn threshold(params: &ParamSet, name: &str, default: f64) -> Result<f64> {
    match params.get(name) {
        None => Ok(default),
        Some(&v) if v.is_finite() => Ok(v),
        Some(&v) => Err(BacktestError::InvalidInput(format!(
            "parameter '{}' must be finite, got {}",
            name, v
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let strategy = Strategy::from_config(&StrategyConfig::new("ma_cross")).unwrap();
        assert_eq!(strategy, Strategy::MaCross { short: 5, long: 20 });

        let strategy = Strategy::from_config(&StrategyConfig::new("rsi")).unwrap();
        assert_eq!(
            strategy,
            Strategy::Rsi {
                period: 14,
                overbought: 70.0,
                oversold: 30.0
            }
        );

        let strategy = Strategy::from_config(&StrategyConfig::new("bollinger")).unwrap();
        assert_eq!(
            strategy,
            Strategy::Bollinger {
                period: 20,
                std_dev: 2.0
            }
        );
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let strategy = Strategy::from_config(&StrategyConfig::new("macd")).unwrap();
        assert_eq!(strategy, Strategy::Unsupported("macd".to_string()));
        assert!(strategy.params().is_empty());
    }

    #[test]
    fn test_invalid_window_rejected() {
        for bad in [0.0, -3.0, 2.5, f64::NAN] {
            let config = StrategyConfig::new("ma_cross").with_param("short", bad);
            assert!(matches!(
                Strategy::from_config(&config),
                Err(BacktestError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_params_round_trip() {
        let config = StrategyConfig::new("bollinger")
            .with_param("period", 10.0)
            .with_param("std", 1.5);
        let strategy = Strategy::from_config(&config).unwrap();
        assert_eq!(strategy.params(), config.params);
        assert_eq!(strategy.name(), "bollinger");
    }

    #[test]
    fn test_wire_shape() {
        let config: StrategyConfig =
            serde_json::from_str(r#"{"type":"rsi","params":{"period":7}}"#).unwrap();
        assert_eq!(config.kind, "rsi");
        assert_eq!(config.params["period"], 7.0);
    }
}
