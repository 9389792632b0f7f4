use super::average::sma_of;
use crate::Candle;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Stochastic oscillator %K and %D at one index.
///
/// `d` is `None` until enough %K values exist for its moving average.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize, Constructor)]
pub struct StochasticValue {
    pub k: f64,
    pub d: Option<f64>,
}

/// Stochastic oscillator.
///
/// `%K = 100 * (close - lowest_low) / (highest_high - lowest_low)` over the trailing `k_period`
/// candles and `%D = SMA(d_period)` of %K. A flat window (`highest_high == lowest_low`) yields
/// `%K = 50`.
pub fn stochastic(
    candles: &[Candle],
    k_period: usize,
    d_period: usize,
) -> Vec<Option<StochasticValue>> {
    if k_period == 0 || candles.len() < k_period {
        return vec![None; candles.len()];
    }

    let mut percent_k = vec![None; candles.len()];

    for (window, slot) in candles.windows(k_period).zip(percent_k[k_period - 1..].iter_mut()) {
        let highest = window
            .iter()
            .map(|candle| candle.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let lowest = window
            .iter()
            .map(|candle| candle.low)
            .fold(f64::INFINITY, f64::min);

        let close = window[window.len() - 1].close;
        let range = highest - lowest;

        *slot = Some(if range > 0.0 {
            (100.0 * (close - lowest) / range).clamp(0.0, 100.0)
        } else {
            50.0
        });
    }

    let percent_d = sma_of(&percent_k, d_period);

    percent_k
        .into_iter()
        .zip(percent_d)
        .map(|(k, d)| k.map(|k| StochasticValue::new(k, d)))
        .collect()
}
