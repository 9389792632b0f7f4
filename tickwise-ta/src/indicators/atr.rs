use crate::Candle;
use itertools::Itertools;

/// Average True Range using Wilder's smoothing.
///
/// True Range is `max(high - low, |high - prev_close|, |low - prev_close|)` and so is only
/// defined from index 1. The first ATR is the mean of the first `period` True Ranges, placed at
/// index `period`.
pub fn atr(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut output = vec![None; candles.len()];
    if period == 0 || candles.len() <= period {
        return output;
    }

    let true_ranges = candles
        .iter()
        .tuple_windows()
        .map(|(prev, curr)| true_range(prev.close, curr))
        .collect::<Vec<_>>();

    let period_f64 = period as f64;
    let mut average = true_ranges[..period].iter().sum::<f64>() / period_f64;
    output[period] = Some(average);

    for (index, range) in true_ranges.iter().enumerate().skip(period) {
        average = (average * (period_f64 - 1.0) + range) / period_f64;
        output[index + 1] = Some(average);
    }

    output
}

fn true_range(prev_close: f64, candle: &Candle) -> f64 {
    candle
        .range()
        .max((candle.high - prev_close).abs())
        .max((candle.low - prev_close).abs())
}
