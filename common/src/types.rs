use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Named numeric strategy parameters, e.g. `{"short": 5, "long": 20}`
pub type ParamSet = BTreeMap<String, f64>;

/// Write whole-valued parameters as JSON integers (`"short": 5`), others as floats
pub fn serialize_params<S: Serializer>(params: &ParamSet, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(params.len()))?;
    for (name, &value) in params {
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            map.serialize_entry(name, &(value as i64))?;
        } else {
            map.serialize_entry(name, &value)?;
        }
    }
    map.end()
}

/// Daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bar with every price set to `close`
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self::new(date, close, close, close, close, 0)
    }
}

/// Market direction of a signal or a held position.
///
/// Serialized as the integers `-1`, `0` and `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Short,
    #[default]
    Flat,
    Long,
}

impl Direction {
    pub fn value(self) -> i8 {
        match self {
            Direction::Short => -1,
            Direction::Flat => 0,
            Direction::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    pub fn is_flat(self) -> bool {
        self == Direction::Flat
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        direction.value()
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Short),
            0 => Ok(Direction::Flat),
            1 => Ok(Direction::Long),
            other => Err(format!("direction must be -1, 0 or 1, got {}", other)),
        }
    }
}

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "BUY", alias = "買入")]
    Buy,
    #[serde(rename = "SELL", alias = "賣出")]
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Individual trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub side: Side,
    pub price: f64,
    pub shares: i64,
    pub amount: i64,
    pub pnl: i64,
}

/// Performance metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    /// Number of closing (SELL) trades
    pub total_trades: u32,
}

/// Summed strategy return for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    /// `YYYY-MM`
    pub month: String,
    #[serde(rename = "return")]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Backtest result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub performance_metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub equity_curve: Vec<EquityPoint>,
}

/// One evaluated grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(serialize_with = "serialize_params")]
    pub params: ParamSet,
    pub metrics: PerformanceMetrics,
}

/// Parameter optimization result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    #[serde(serialize_with = "serialize_params")]
    pub best_params: ParamSet,
    /// Stays at the initial bound (±inf, written as `null` in JSON) when no grid point ran
    pub best_metric_value: f64,
    pub results: Vec<RankedResult>,
}
