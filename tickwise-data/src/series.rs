use crate::error::DataError;
use serde::{Deserialize, Serialize};
use tickwise_ta::Candle;

/// Outcome of a [`CandleSeries::append_or_update`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum SeriesUpdate {
    /// The last (still open) bar was replaced in place. Indicator windows did not shift.
    Updated,
    /// A new bar was pushed, so every indicator window shifted by one.
    Appended,
}

/// Ordered [`Candle`]s for one (symbol, timeframe), capped at a retention window.
///
/// Invariants upheld after every mutation:
/// - `time` is strictly increasing.
/// - `len() <= retention()`, the oldest bars being evicted first.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    retention: usize,
}

impl CandleSeries {
    /// Construct an empty [`CandleSeries`] retaining at most `retention` bars (minimum 1).
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            candles: Vec::with_capacity(retention),
            retention,
        }
    }

    /// Apply a [`Candle`] to the end of the series.
    ///
    /// - Same `time` as the last bar: replace it ([`SeriesUpdate::Updated`]).
    /// - Later `time`: push a new bar ([`SeriesUpdate::Appended`]).
    /// - Earlier `time`: rejected with [`DataError::StaleUpdate`], the series is untouched.
    pub fn append_or_update(&mut self, candle: Candle) -> Result<SeriesUpdate, DataError> {
        let Some(last) = self.candles.last_mut() else {
            self.candles.push(candle);
            return Ok(SeriesUpdate::Appended);
        };

        match candle.time.cmp(&last.time) {
            std::cmp::Ordering::Equal => {
                *last = candle;
                Ok(SeriesUpdate::Updated)
            }
            std::cmp::Ordering::Greater => {
                self.candles.push(candle);
                self.retention_trim();
                Ok(SeriesUpdate::Appended)
            }
            std::cmp::Ordering::Less => Err(DataError::StaleUpdate {
                time: candle.time,
                last: last.time,
            }),
        }
    }

    /// Last `n` bars, oldest first. Returns the whole series if it holds fewer than `n` bars.
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }

    /// Drop the oldest bars beyond the retention cap.
    pub fn retention_trim(&mut self) {
        if self.candles.len() > self.retention {
            let excess = self.candles.len() - self.retention;
            self.candles.drain(..excess);
        }
    }

    /// Replace the series contents with the provided bars.
    ///
    /// Bars are sorted by `time`, duplicates keep the latest occurrence, and the result is
    /// trimmed to the retention cap.
    pub fn replace<Iter>(&mut self, candles: Iter)
    where
        Iter: IntoIterator<Item = Candle>,
    {
        let mut candles = candles.into_iter().collect::<Vec<_>>();

        // Stable sort keeps the feed delivery order for equal times
        candles.sort_by_key(|candle| candle.time);
        candles.reverse();
        candles.dedup_by_key(|candle| candle.time);
        candles.reverse();

        self.candles = candles;
        self.retention_trim();
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, close: f64) -> Candle {
        Candle::from_price(time, close)
    }

    #[test]
    fn test_append_or_update() {
        struct TestCase {
            input: Candle,
            expected: Result<SeriesUpdate, DataError>,
            expected_times: Vec<i64>,
        }

        let mut series = CandleSeries::new(10);

        let tests = vec![
            TestCase {
                // TC0: first bar is appended
                input: bar(60, 1.0),
                expected: Ok(SeriesUpdate::Appended),
                expected_times: vec![60],
            },
            TestCase {
                // TC1: same time replaces the open bar
                input: bar(60, 2.0),
                expected: Ok(SeriesUpdate::Updated),
                expected_times: vec![60],
            },
            TestCase {
                // TC2: later time appends
                input: bar(120, 3.0),
                expected: Ok(SeriesUpdate::Appended),
                expected_times: vec![60, 120],
            },
            TestCase {
                // TC3: earlier time is stale
                input: bar(60, 4.0),
                expected: Err(DataError::StaleUpdate {
                    time: 60,
                    last: 120,
                }),
                expected_times: vec![60, 120],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = series.append_or_update(test.input);
            assert_eq!(actual, test.expected, "TC{} failed", index);

            let times = series
                .candles()
                .iter()
                .map(|candle| candle.time)
                .collect::<Vec<_>>();
            assert_eq!(times, test.expected_times, "TC{} failed", index);
        }

        assert_eq!(series.candles()[0].close, 2.0);
    }

    #[test]
    fn test_retention_is_enforced_after_every_append() {
        let mut series = CandleSeries::new(3);

        for time in 0..10 {
            series.append_or_update(bar(time * 60, time as f64)).unwrap();
            assert!(series.len() <= 3);
        }

        let times = series.tail(10).iter().map(|c| c.time).collect::<Vec<_>>();
        assert_eq!(times, vec![420, 480, 540]);
    }

    #[test]
    fn test_tail() {
        let mut series = CandleSeries::new(10);
        for time in 1..=4 {
            series.append_or_update(bar(time, 0.0)).unwrap();
        }

        assert_eq!(series.tail(0).len(), 0);
        assert_eq!(series.tail(2).iter().map(|c| c.time).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(series.tail(100).len(), 4);
    }

    #[test]
    fn test_replace_sorts_dedups_and_trims() {
        let mut series = CandleSeries::new(3);
        series.replace(vec![
            bar(180, 3.0),
            bar(60, 1.0),
            bar(120, 2.0),
            bar(120, 2.5),
            bar(0, 0.0),
        ]);

        let actual = series
            .candles()
            .iter()
            .map(|candle| (candle.time, candle.close))
            .collect::<Vec<_>>();

        assert_eq!(actual, vec![(60, 1.0), (120, 2.5), (180, 3.0)]);
    }
}
