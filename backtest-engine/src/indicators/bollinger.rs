/// Bollinger Bands result
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands
///
/// # Arguments
/// * `prices` - Slice of closing prices
/// * `period` - Period for moving average (typically 20)
/// * `std_dev` - Number of standard deviations (typically 2.0)
///
/// # Returns
/// BollingerBands struct containing upper, middle (SMA), and lower bands.
/// Band width uses the sample standard deviation, so a window of one
/// price has no bands.
pub fn calculate_bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    let n = prices.len();
    let mut bb = BollingerBands {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
    };

    if n < period || period == 0 {
        return bb;
    }

    for i in (period - 1)..n {
        let window = &prices[i + 1 - period..=i];
        let mean: f64 = window.iter().sum::<f64>() / period as f64;
        bb.middle[i] = Some(mean);

        if let Some(std) = sample_std(window, mean) {
            bb.upper[i] = Some(mean + std * std_dev);
            bb.lower[i] = Some(mean - std * std_dev);
        }
    }

    bb
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance: f64 =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bollinger_bands_basic() {
        let prices = vec![
            22.27, 22.19, 22.08, 22.17, 22.18, 22.13, 22.23, 22.43, 22.24, 22.29, 22.15, 22.39,
            22.38, 22.61, 23.36, 24.05, 23.75, 23.83, 23.95, 23.63,
        ];
        let bb = calculate_bollinger_bands(&prices, 20, 2.0);

        assert_eq!(bb.middle.len(), prices.len());
        assert!(bb.middle[18].is_none());

        let middle = bb.middle[19].unwrap();
        assert!(bb.upper[19].unwrap() > middle);
        assert!(bb.lower[19].unwrap() < middle);
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        let prices = vec![1.0, 2.0, 3.0];
        let bb = calculate_bollinger_bands(&prices, 3, 2.0);

        // mean 2, sample variance (1 + 0 + 1) / 2 = 1
        assert_relative_eq!(bb.middle[2].unwrap(), 2.0);
        assert_relative_eq!(bb.upper[2].unwrap(), 4.0);
        assert_relative_eq!(bb.lower[2].unwrap(), 0.0);
    }

    #[test]
    fn test_bollinger_single_bar_window() {
        let prices = vec![5.0, 6.0];
        let bb = calculate_bollinger_bands(&prices, 1, 2.0);

        assert_eq!(bb.middle, vec![Some(5.0), Some(6.0)]);
        assert!(bb.upper.iter().all(Option::is_none));
    }

    #[test]
    fn test_sample_std() {
        assert_eq!(sample_std(&[4.0], 4.0), None);
        assert_relative_eq!(sample_std(&[2.0, 4.0], 3.0).unwrap(), 2.0_f64.sqrt());
    }
}
