use super::average::{ema, ema_of};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// MACD line, signal line and histogram at one index.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize, Constructor)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
///
/// `macd = EMA(fast) - EMA(slow)`, `signal = EMA(signal) of macd` and
/// `histogram = macd - signal`. Defined once the signal line exists.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<Option<MacdValue>> {
    let fast = ema(closes, fast);
    let slow = ema(closes, slow);

    let line = fast
        .iter()
        .zip(slow.iter())
        .map(|(fast, slow)| Some((*fast)? - (*slow)?))
        .collect::<Vec<_>>();

    let signal = ema_of(&line, signal);

    line.iter()
        .zip(signal.iter())
        .map(|(macd, signal)| {
            let (macd, signal) = ((*macd)?, (*signal)?);
            Some(MacdValue::new(macd, signal, macd - signal))
        })
        .collect()
}
