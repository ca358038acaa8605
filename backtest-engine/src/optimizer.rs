use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use common::strategy::{MA_CROSS, RSI};
use common::{
    BacktestConfig, BacktestError, OptimizationConfig, OptimizationMethod, OptimizationResult, ParamSet,
    PriceBar, RankedResult, Result, Strategy, StrategyConfig, TargetMetric,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::engine::{validate_bars, validate_capital, BacktestEngine};

/// Number of ranked results returned to the caller
pub const TOP_RESULTS: usize = 10;

/// Largest candidate list a stepped range may expand to
pub const MAX_CANDIDATES: usize = 10_000;

/// Cartesian grid of candidate values, one dimension per parameter
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    dimensions: Vec<(String, Vec<f64>)>,
    is_valid: fn(&ParamSet) -> bool,
}

impl ParameterGrid {
    /// Built-in grid for a strategy type, with `ranges` replacing the default
    /// candidates per parameter name. Strategies without a grid return None.
    pub fn for_strategy(strategy_type: &str, ranges: &BTreeMap<String, Vec<f64>>) -> Option<Self> {
        let (defaults, is_valid): (Vec<(&str, Vec<f64>)>, fn(&ParamSet) -> bool) =
            match strategy_type {
                MA_CROSS => (
                    vec![
                        ("short", vec![5.0, 10.0, 15.0]),
                        ("long", vec![20.0, 30.0, 40.0, 50.0]),
                    ],
                    short_below_long as fn(&ParamSet) -> bool,
                ),
                RSI => (
                    vec![
                        ("period", vec![7.0, 14.0, 21.0]),
                        ("overbought", vec![65.0, 70.0, 75.0, 80.0]),
                        ("oversold", vec![20.0, 25.0, 30.0, 35.0]),
                    ],
                    oversold_below_overbought as fn(&ParamSet) -> bool,
                ),
                _ => return None,
            };

        let dimensions = defaults
            .into_iter()
            .map(|(name, default)| {
                let values = ranges.get(name).cloned().unwrap_or(default);
                (name.to_string(), values)
            })
            .collect();

        Some(Self {
            dimensions,
            is_valid,
        })
    }

    /// Every valid point, first dimension outermost
    pub fn points(&self) -> Vec<ParamSet> {
        let mut points = vec![ParamSet::new()];

        for (name, values) in &self.dimensions {
            points = points
                .into_iter()
                .flat_map(|point| {
                    values.iter().map(move |&value| {
                        let mut next = point.clone();
                        next.insert(name.clone(), value);
                        next
                    })
                })
                .collect();
        }

        points.retain(|p| (self.is_valid)(p));
        points
    }
}

fn short_below_long(p: &ParamSet) -> bool {
    p["short"] < p["long"]
}

fn oversold_below_overbought(p: &ParamSet) -> bool {
    p["oversold"] < p["overbought"]
}

/// Exhaustive grid search over strategy parameters
pub struct ParameterOptimizer {
    engine: BacktestEngine,
}

impl ParameterOptimizer {
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            engine: BacktestEngine::new(config),
        }
    }

    /// Backtest every grid point and rank by the target metric.
    ///
    /// Grid points run on the rayon pool; results are gathered in
    /// enumeration order before ranking, so the output matches a
    /// sequential run exactly.
    pub fn optimize(
        &self,
        bars: &[PriceBar],
        strategy_type: &str,
        settings: &OptimizationConfig,
    ) -> Result<OptimizationResult> {
        validate_capital(self.engine.config().initial_capital)?;
        validate_bars(bars)?;

        if let OptimizationMethod::Other(name) = &settings.method {
            warn!(method = %name, "only grid search is available, running grid");
        }

        let target = &settings.target_metric;
        let points = ParameterGrid::for_strategy(strategy_type, &settings.param_ranges)
            .map(|grid| grid.points())
            .unwrap_or_default();

        let start_time = Instant::now();
        let mut results = points
            .into_par_iter()
            .map(|params| self.evaluate(bars, strategy_type, params))
            .collect::<Result<Vec<RankedResult>>>()?;

        let (best_params, best_metric_value) = select_best(&results, target);
        let evaluated = results.len();

        rank(&mut results, target);
        results.truncate(TOP_RESULTS);

        info!(
            strategy = strategy_type,
            target = %target,
            evaluated,
            best_metric_value,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "grid search complete"
        );

        Ok(OptimizationResult {
            best_params,
            best_metric_value,
            results,
        })
    }

    fn evaluate(&self, bars: &[PriceBar], strategy_type: &str, params: ParamSet) -> Result<RankedResult> {
        let strategy = Strategy::from_config(&StrategyConfig {
            kind: strategy_type.to_string(),
            params: params.clone(),
        })?;
        let result = self.engine.run_validated(bars, &strategy);
        debug!(?params, total_return = result.performance_metrics.total_return, "grid point");

        Ok(RankedResult {
            params,
            metrics: result.performance_metrics,
        })
    }
}

/// Track the best point in enumeration order; earlier points win ties.
///
/// `max_drawdown` keeps the smallest value, i.e. the deepest drawdown.
fn select_best(results: &[RankedResult], target: &TargetMetric) -> (ParamSet, f64) {
    let minimize = target.is_minimized();
    let mut best_params = ParamSet::new();
    let mut best_value = if minimize {
        f64::INFINITY
    } else {
        f64::NEG_INFINITY
    };

    for result in results {
        let value = target.value_of(&result.metrics);
        let better = if minimize {
            value < best_value
        } else {
            value > best_value
        };
        if better {
            best_value = value;
            best_params = result.params.clone();
        }
    }

    (best_params, best_value)
}

/// Stable sort: descending, or ascending for `max_drawdown`
fn rank(results: &mut [RankedResult], target: &TargetMetric) {
    let minimize = target.is_minimized();
    results.sort_by(|a, b| {
        let (va, vb) = (target.value_of(&a.metrics), target.value_of(&b.metrics));
        let ord = if minimize {
            va.partial_cmp(&vb)
        } else {
            vb.partial_cmp(&va)
        };
        ord.unwrap_or(Ordering::Equal)
    });
}

/// Run a grid search with an explicit capital
pub fn optimize_parameters(
    bars: &[PriceBar],
    strategy_type: &str,
    param_ranges: BTreeMap<String, Vec<f64>>,
    method: &str,
    target_metric: &str,
    initial_capital: f64,
) -> Result<OptimizationResult> {
    let settings = OptimizationConfig {
        method: OptimizationMethod::parse(method),
        target_metric: TargetMetric::parse(target_metric),
        param_ranges,
    };
    ParameterOptimizer::new(BacktestConfig::default().with_capital(initial_capital))
        .optimize(bars, strategy_type, &settings)
}

/// Parse a candidate list: `5,10,15` or an inclusive stepped range `5:15:5`
pub fn parse_candidates(spec: &str) -> Result<Vec<f64>> {
    let invalid = |what: &str| BacktestError::InvalidInput(format!("{} in range '{}'", what, spec));
    let number = |s: &str| s.trim().parse::<f64>().map_err(|_| invalid("bad number"));

    let parts: Vec<&str> = spec.split(':').collect();
    match parts[..] {
        [list] => list.split(',').map(number).collect(),
        [min, max, step] => {
            let (min, max, step) = (number(min)?, number(max)?, number(step)?);
            if !(step > 0.0) || max < min {
                return Err(invalid("step must be positive and max >= min"));
            }
            let steps = ((max - min) / step + 1e-9).floor();
            if !steps.is_finite() || steps >= MAX_CANDIDATES as f64 {
                return Err(invalid(&format!("more than {} candidates", MAX_CANDIDATES)));
            }
            let count = steps as usize + 1;
            Ok((0..count).map(|i| min + i as f64 * step).collect())
        }
        _ => Err(invalid("expected v1,v2,... or min:max:step")),
    }
}
