/// Simple moving average over a trailing window
///
/// Entry `i` is the mean of `values[i + 1 - period..=i]`; the first
/// `period - 1` entries are `None`. A zero period yields all `None`.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let warmup = std::iter::repeat(None).take(period - 1);
    let means = values
        .windows(period)
        .map(|window| Some(window.iter().sum::<f64>() / period as f64));

    warmup.chain(means).collect()
}
