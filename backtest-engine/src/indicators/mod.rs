pub mod bollinger;
pub mod rsi;
pub mod sma;

pub use bollinger::{calculate_bollinger_bands, sample_std, BollingerBands};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
