use super::sma::calculate_sma;

/// Calculate RSI from simple rolling means of gains and losses
///
/// # Arguments
/// * `prices` - Slice of closing prices
/// * `period` - RSI period (typically 14)
///
/// # Returns
/// Vector of Option<f64>, None during warmup and for flat windows.
/// The change at index 0 counts as zero, so the first RSI lands at `period - 1`.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];

    for i in 1..n {
        let delta = prices[i] - prices[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else if delta < 0.0 {
            losses[i] = -delta;
        }
    }

    let avg_gain = calculate_sma(&gains, period);
    let avg_loss = calculate_sma(&losses, period);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(gain, loss)| match (gain, loss) {
            (Some(gain), Some(loss)) => rsi_value(gain, loss),
            _ => None,
        })
        .collect()
}

/// RSI for one pair of averages. A flat window has no defined RSI.
fn rsi_value(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { Some(100.0) } else { None };
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}
