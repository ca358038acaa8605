use common::{Direction, PriceBar, Strategy};
use tracing::debug;

use crate::indicators::{calculate_bollinger_bands, calculate_rsi, calculate_sma};

/// Turns a price series into one signal per bar.
///
/// Undefined indicator values (warmup, flat RSI windows) always produce
/// `Direction::Flat`.
pub struct SignalGenerator {
    strategy: Strategy,
}

impl SignalGenerator {
    pub fn new(strategy: &Strategy) -> Self {
        Self {
            strategy: strategy.clone(),
        }
    }

    /// Generate the signal series, aligned 1:1 with `bars`
    pub fn generate(&self, bars: &[PriceBar]) -> Vec<Direction> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        match &self.strategy {
            Strategy::MaCross { short, long } => Self::ma_cross(&closes, *short, *long),
            Strategy::Rsi {
                period,
                overbought,
                oversold,
            } => Self::rsi(&closes, *period, *overbought, *oversold),
            Strategy::Bollinger { period, std_dev } => {
                Self::bollinger(&closes, *period, *std_dev)
            }
            Strategy::Unsupported(name) => {
                debug!(strategy = %name, "unsupported strategy type, emitting no signals");
                vec![Direction::Flat; bars.len()]
            }
        }
    }

    /// Buy when the short SMA crosses above the long SMA, sell on the
    /// opposite cross. Both bars of the comparison need defined averages.
    fn ma_cross(closes: &[f64], short: usize, long: usize) -> Vec<Direction> {
        let short_ma = calculate_sma(closes, short);
        let long_ma = calculate_sma(closes, long);

        (0..closes.len())
            .map(|i| {
                if i == 0 {
                    return Direction::Flat;
                }
                let (Some(s), Some(l), Some(prev_s), Some(prev_l)) =
                    (short_ma[i], long_ma[i], short_ma[i - 1], long_ma[i - 1])
                else {
                    return Direction::Flat;
                };

                if s > l && prev_s <= prev_l {
                    Direction::Long
                } else if s < l && prev_s >= prev_l {
                    Direction::Short
                } else {
                    Direction::Flat
                }
            })
            .collect()
    }

    /// Buy below the oversold line, sell above the overbought line
    fn rsi(closes: &[f64], period: usize, overbought: f64, oversold: f64) -> Vec<Direction> {
        calculate_rsi(closes, period)
            .into_iter()
            .map(|rsi| match rsi {
                Some(v) if v > overbought => Direction::Short,
                Some(v) if v < oversold => Direction::Long,
                _ => Direction::Flat,
            })
            .collect()
    }

    /// Breakout: buy above the upper band, sell below the lower band.
    /// Sell wins when both hold (negative multiplier).
    fn bollinger(closes: &[f64], period: usize, std_dev: f64) -> Vec<Direction> {
        let bb = calculate_bollinger_bands(closes, period, std_dev);

        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| match (bb.upper[i], bb.lower[i]) {
                (_, Some(lower)) if close < lower => Direction::Short,
                (Some(upper), _) if close > upper => Direction::Long,
                _ => Direction::Flat,
            })
            .collect()
    }
}

/// Generate signals for `strategy` over `bars`
pub fn generate_signals(bars: &[PriceBar], strategy: &Strategy) -> Vec<Direction> {
    SignalGenerator::new(strategy).generate(bars)
}
