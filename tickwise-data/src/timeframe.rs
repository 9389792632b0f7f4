use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Candle bucket width in seconds (eg/ 60 = M1).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Timeframe(u32);

impl Timeframe {
    pub const M1: Self = Self(60);
    pub const M5: Self = Self(300);
    pub const M15: Self = Self(900);
    pub const H1: Self = Self(3_600);
    pub const H4: Self = Self(14_400);
    pub const D1: Self = Self(86_400);

    /// Construct a [`Timeframe`] of the provided seconds. A zero width is clamped to one second.
    pub fn from_secs(secs: u32) -> Self {
        Self(secs.max(1))
    }

    pub fn secs(&self) -> u32 {
        self.0
    }

    /// Start of the bucket containing `time`: `floor(time / secs) * secs`.
    pub fn bucket_start(&self, time: i64) -> i64 {
        let secs = i64::from(self.0.max(1));
        time.div_euclid(secs) * secs
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::M1
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            secs if secs % 86_400 == 0 => write!(f, "D{}", secs / 86_400),
            secs if secs % 3_600 == 0 => write!(f, "H{}", secs / 3_600),
            secs if secs % 60 == 0 => write!(f, "M{}", secs / 60),
            secs => write!(f, "S{secs}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_start() {
        struct TestCase {
            timeframe: Timeframe,
            time: i64,
            expected: i64,
        }

        let tests = vec![
            TestCase {
                // TC0: aligned
                timeframe: Timeframe::M1,
                time: 120,
                expected: 120,
            },
            TestCase {
                // TC1: mid bucket
                timeframe: Timeframe::M1,
                time: 179,
                expected: 120,
            },
            TestCase {
                // TC2: negative time floors downwards
                timeframe: Timeframe::M1,
                time: -1,
                expected: -60,
            },
            TestCase {
                // TC3: hourly
                timeframe: Timeframe::H1,
                time: 7_199,
                expected: 3_600,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(
                test.timeframe.bucket_start(test.time),
                test.expected,
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Timeframe::M1.to_string(), "M1");
        assert_eq!(Timeframe::M15.to_string(), "M15");
        assert_eq!(Timeframe::H4.to_string(), "H4");
        assert_eq!(Timeframe::D1.to_string(), "D1");
        assert_eq!(Timeframe::from_secs(45).to_string(), "S45");
        assert_eq!(Timeframe::from_secs(0).secs(), 1);
    }
}
