use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Bollinger Bands at one index.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize, Constructor)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands: `middle = SMA(period)`, `upper/lower = middle ± std_dev * σ` where σ is the
/// population standard deviation of the trailing `period` closes.
pub fn bollinger(closes: &[f64], period: usize, std_dev: f64) -> Vec<Option<BollingerValue>> {
    let mut output = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return output;
    }

    let period_f64 = period as f64;
    for (window, slot) in closes.windows(period).zip(output[period - 1..].iter_mut()) {
        let middle = window.iter().sum::<f64>() / period_f64;
        let variance = window
            .iter()
            .map(|close| (close - middle).powi(2))
            .sum::<f64>()
            / period_f64;

        let width = std_dev * variance.sqrt();
        *slot = Some(BollingerValue::new(middle + width, middle, middle - width));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bollinger_population_std_dev() {
        // mean 5, population variance 4
        let closes = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let actual = bollinger(&closes, 8, 2.0);

        assert!(actual[..7].iter().all(Option::is_none));
        assert_eq!(actual[7], Some(BollingerValue::new(9.0, 5.0, 1.0)));
    }
}
