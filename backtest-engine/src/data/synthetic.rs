use chrono::{Duration, NaiveDate};
use common::PriceBar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

const DAILY_VOLATILITY: f64 = 0.01;

/// Generate a daily random-walk price series for demos and tests.
///
/// One bar per calendar day ending at `end_date`. Daily returns are
/// normal with a 1% standard deviation. The same `seed` always yields
/// the same series.
pub fn generate_synthetic_bars(
    days: usize,
    base_price: f64,
    end_date: NaiveDate,
    seed: u64,
) -> Vec<PriceBar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(days);
    let start_date = end_date - Duration::days(days as i64 - 1);

    let mut price = base_price;

    for i in 0..days {
        let shock: f64 = rng.sample(StandardNormal);
        let close = price * (1.0 + DAILY_VOLATILITY * shock);

        bars.push(PriceBar {
            date: start_date + Duration::days(i as i64),
            open: close * (1.0 - rng.gen::<f64>() * 0.01),
            high: close * (1.0 + rng.gen::<f64>() * 0.015),
            low: close * (1.0 - rng.gen::<f64>() * 0.015),
            close,
            volume: (rng.gen::<f64>() * 10_000_000.0 + 5_000_000.0) as u64,
        });

        price = close;
    }

    bars
}
