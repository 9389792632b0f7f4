/// Simple moving average of the trailing `period` values.
///
/// Output has the same length as `values`, with `None` until `period` values are available.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut output = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return output;
    }

    for (window, slot) in values.windows(period).zip(output[period - 1..].iter_mut()) {
        *slot = Some(window.iter().sum::<f64>() / period as f64);
    }

    output
}

/// Exponential moving average seeded with the [`sma`] of the first `period` values.
///
/// Thereafter `ema[i] = ema[i-1] + (value[i] - ema[i-1]) * k` where `k = 2 / (period + 1)`, which
/// is algebraically `value * k + prev * (1 - k)` and exact for a constant input.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut output = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return output;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    output[period - 1] = Some(prev);

    for (value, slot) in values[period..].iter().zip(output[period..].iter_mut()) {
        prev += (value - prev) * multiplier;
        *slot = Some(prev);
    }

    output
}

/// [`sma`] over a partially defined series, eg/ the output of another indicator.
///
/// The leading `None` prefix is preserved and the average is computed over the contiguous run of
/// `Some` values that follows it.
pub fn sma_of(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    apply_dense(values, |dense| sma(dense, period))
}

/// [`ema`] over a partially defined series, eg/ the MACD line.
pub fn ema_of(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    apply_dense(values, |dense| ema(dense, period))
}

fn apply_dense<F>(values: &[Option<f64>], indicator: F) -> Vec<Option<f64>>
where
    F: FnOnce(&[f64]) -> Vec<Option<f64>>,
{
    let start = values
        .iter()
        .position(Option::is_some)
        .unwrap_or(values.len());

    let dense = values[start..]
        .iter()
        .map_while(|value| *value)
        .collect::<Vec<_>>();

    let mut output = vec![None; start];
    output.extend(indicator(&dense));
    output.resize(values.len(), None);
    output
}
