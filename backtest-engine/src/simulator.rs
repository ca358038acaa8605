use common::{Direction, PriceBar};

/// Per-bar curves produced by replaying a signal series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Simulation {
    /// Signals forward-filled through flat bars, starting flat
    pub positions: Vec<Direction>,
    /// Close-to-close return; None at the first bar
    pub returns: Vec<Option<f64>>,
    /// Previous bar's position times this bar's return; None at the first bar
    pub strategy_returns: Vec<Option<f64>>,
    pub cum_returns: Vec<f64>,
    pub cum_strategy_returns: Vec<f64>,
    pub equity: Vec<f64>,
}

impl Simulation {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Strategy returns with the undefined first bar dropped
    pub fn defined_strategy_returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.strategy_returns.iter().flatten().copied()
    }
}

/// Replays signals against closes to build position and equity curves
pub struct PositionSimulator;

impl PositionSimulator {
    /// Simulate holding the forward-filled signal.
    ///
    /// The position is lagged one bar, so a signal on bar t earns the return
    /// of bar t+1. Undefined returns contribute a factor of 1 to the
    /// cumulative curves.
    pub fn simulate(bars: &[PriceBar], signals: &[Direction], initial_capital: f64) -> Simulation {
        let n = bars.len().min(signals.len());
        let mut sim = Simulation {
            positions: Vec::with_capacity(n),
            returns: Vec::with_capacity(n),
            strategy_returns: Vec::with_capacity(n),
            cum_returns: Vec::with_capacity(n),
            cum_strategy_returns: Vec::with_capacity(n),
            equity: Vec::with_capacity(n),
        };

        let mut position = Direction::Flat;
        let mut cum = 1.0;
        let mut cum_strategy = 1.0;

        for i in 0..n {
            let prev_position = position;
            if !signals[i].is_flat() {
                position = signals[i];
            }

            let ret = (i > 0).then(|| bars[i].close / bars[i - 1].close - 1.0);
            let strategy_ret = ret.map(|r| prev_position.as_f64() * r);

            cum *= 1.0 + ret.unwrap_or(0.0);
            cum_strategy *= 1.0 + strategy_ret.unwrap_or(0.0);

            sim.positions.push(position);
            sim.returns.push(ret);
            sim.strategy_returns.push(strategy_ret);
            sim.cum_returns.push(cum);
            sim.cum_strategy_returns.push(cum_strategy);
            sim.equity.push(initial_capital * cum_strategy);
        }

        sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use common::Direction::{Flat, Long, Short};

    fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::flat(start + Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn test_positions_forward_fill() {
        let bars = make_bars(&[10.0; 7]);
        let signals = vec![Flat, Flat, Long, Flat, Flat, Short, Flat];

        let sim = PositionSimulator::simulate(&bars, &signals, 1000.0);
        assert_eq!(sim.positions, vec![Flat, Flat, Long, Long, Long, Short, Short]);
    }

    #[test]
    fn test_position_is_lagged_one_bar() {
        let bars = make_bars(&[100.0, 110.0, 99.0, 99.0]);
        let signals = vec![Long, Flat, Short, Flat];

        let sim = PositionSimulator::simulate(&bars, &signals, 1000.0);

        assert_eq!(sim.returns[0], None);
        assert_eq!(sim.strategy_returns[0], None);
        // long from bar 0 earns +10%
        assert_relative_eq!(sim.strategy_returns[1].unwrap(), 0.1, epsilon = 1e-9);
        // still long during bar 2 (signal on bar 2 only counts from bar 3)
        assert_relative_eq!(sim.strategy_returns[2].unwrap(), -0.1, epsilon = 1e-9);
        // short during bar 3, flat price
        assert_relative_eq!(sim.strategy_returns[3].unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cumulative_and_equity() {
        let bars = make_bars(&[100.0, 110.0, 121.0]);
        let signals = vec![Long, Flat, Flat];

        let sim = PositionSimulator::simulate(&bars, &signals, 1000.0);

        assert_eq!(sim.cum_returns[0], 1.0);
        assert_relative_eq!(sim.cum_returns[2], 1.21, epsilon = 1e-9);
        assert_relative_eq!(sim.cum_strategy_returns[2], 1.21, epsilon = 1e-9);
        assert_eq!(sim.equity[0], 1000.0);
        assert_relative_eq!(sim.equity[2], 1210.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_position_gains_on_fall() {
        let bars = make_bars(&[100.0, 90.0]);
        let signals = vec![Short, Flat];

        let sim = PositionSimulator::simulate(&bars, &signals, 1000.0);
        assert_relative_eq!(sim.equity[1], 1100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_signals_keep_capital() {
        let bars = make_bars(&[100.0, 80.0, 120.0]);
        let sim = PositionSimulator::simulate(&bars, &[Flat; 3], 5000.0);

        assert!(sim.equity.iter().all(|&e| e == 5000.0));
        assert_eq!(sim.len(), 3);
        assert_eq!(sim.defined_strategy_returns().count(), 2);
    }
}
