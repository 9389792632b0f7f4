use serde::{Deserialize, Serialize};

/// Type of crossover event detected between two data series.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Cross {
    Above,
    Below,
}

/// Determine if a crossover occurred between the previous and current values.
pub fn crossover(prev_fast: f64, prev_slow: f64, fast: f64, slow: f64) -> Option<Cross> {
    if prev_fast <= prev_slow && fast > slow {
        Some(Cross::Above)
    } else if prev_fast >= prev_slow && fast < slow {
        Some(Cross::Below)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossover() {
        assert_eq!(crossover(1.0, 2.0, 3.0, 2.0), Some(Cross::Above));
        assert_eq!(crossover(3.0, 2.0, 1.0, 2.0), Some(Cross::Below));
        assert_eq!(crossover(2.0, 2.0, 3.0, 2.0), Some(Cross::Above));
        assert_eq!(crossover(3.0, 2.0, 4.0, 2.0), None);
        assert_eq!(crossover(1.0, 2.0, 2.0, 2.0), None);
    }
}
