use itertools::Itertools;

/// Relative Strength Index using Wilder's smoothing.
///
/// The first value appears at index `period`, seeded with the simple average gain and loss of the
/// first `period` price changes. An average loss of zero yields `100.0`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut output = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return output;
    }

    let changes = closes
        .iter()
        .tuple_windows()
        .map(|(prev, curr)| curr - prev)
        .collect::<Vec<_>>();

    let (gains, losses) = changes[..period]
        .iter()
        .fold((0.0, 0.0), |(gain, loss), change| {
            (gain + change.max(0.0), loss + (-change).max(0.0))
        });

    let period_f64 = period as f64;
    let mut avg_gain = gains / period_f64;
    let mut avg_loss = losses / period_f64;
    output[period] = Some(relative_strength_index(avg_gain, avg_loss));

    for (index, change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period_f64 - 1.0) + change.max(0.0)) / period_f64;
        avg_loss = (avg_loss * (period_f64 - 1.0) + (-change).max(0.0)) / period_f64;
        output[index + 1] = Some(relative_strength_index(avg_gain, avg_loss));
    }

    output
}

fn relative_strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }

    let relative_strength = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + relative_strength)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_warm_up() {
        let actual = rsi(&[1.0, 2.0, 3.0], 3);
        assert_eq!(actual, vec![None, None, None]);
    }

    #[test]
    fn test_rsi_all_losses() {
        let closes = (0..20).map(|i| 100.0 - i as f64).collect::<Vec<_>>();
        let actual = rsi(&closes, 14);

        assert_eq!(actual[13], None);
        assert_eq!(actual[14], Some(0.0));
        assert_eq!(actual[19], Some(0.0));
    }

    #[test]
    fn test_rsi_mixed() {
        // gains 1, 1 and loss 2 over period 3: avg_gain = 2/3, avg_loss = 2/3
        let actual = rsi(&[10.0, 11.0, 12.0, 10.0], 3);
        assert_eq!(actual[3], Some(50.0));
    }
}
