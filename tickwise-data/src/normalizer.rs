use crate::{
    error::DataError,
    series::{CandleSeries, SeriesUpdate},
    timeframe::Timeframe,
};
use tickwise_ta::Candle;
use tracing::debug;

/// Translates heterogeneous feed updates (raw ticks or full-bar OHLC pushes) into
/// [`CandleSeries`] mutations for the active [`Timeframe`].
///
/// Owned by a single writer per (symbol, timeframe).
#[derive(Debug, Clone)]
pub struct StreamNormalizer {
    timeframe: Timeframe,
    series: CandleSeries,
    last_tick_time: Option<i64>,
}

impl StreamNormalizer {
    pub fn new(timeframe: Timeframe, retention: usize) -> Self {
        Self {
            timeframe,
            series: CandleSeries::new(retention),
            last_tick_time: None,
        }
    }

    /// Apply a raw tick to the bar of its timeframe bucket.
    ///
    /// The first tick of a bucket opens a new bar at `price`; later ticks extend `high`/`low` and
    /// set `close`. A tick older than the last observed tick, or belonging to a bucket before the
    /// current bar, is a late delivery and is rejected with [`DataError::StaleUpdate`] without
    /// touching the series. Replaying an identical tick leaves the series unchanged.
    pub fn on_tick(&mut self, price: f64, time: i64) -> Result<SeriesUpdate, DataError> {
        if !price.is_finite() {
            return Err(DataError::MalformedMessage(format!(
                "tick price is not finite: {price}"
            )));
        }

        if let Some(last_tick_time) = self.last_tick_time {
            if time < last_tick_time {
                return Err(DataError::StaleUpdate {
                    time,
                    last: last_tick_time,
                });
            }
        }

        let bucket = self.timeframe.bucket_start(time);

        let update = match self.series.last() {
            Some(last) if last.time == bucket => {
                let mut bar = *last;
                bar.apply_price(price);
                self.series.append_or_update(bar)?
            }
            _ => self
                .series
                .append_or_update(Candle::from_price(bucket, price))?,
        };

        self.last_tick_time = Some(time);
        Ok(update)
    }

    /// Apply an explicit OHLC push, aligned to the start of its timeframe bucket.
    pub fn on_candle(&mut self, mut candle: Candle) -> Result<SeriesUpdate, DataError> {
        if !candle.is_valid() {
            return Err(DataError::MalformedMessage(format!(
                "candle violates OHLC invariants: {candle:?}"
            )));
        }

        candle.time = self.timeframe.bucket_start(candle.time);
        self.series.append_or_update(candle)
    }

    /// Seed the series with historical bars.
    ///
    /// History replaces every bar it covers, filling gaps left by a disconnect. Bars at or after
    /// the last historical bar (eg/ ticks that raced ahead of the history response) take
    /// precedence, as do bars older than the first historical bar. Invalid historical bars are
    /// skipped. Returns the resulting series length.
    pub fn seed<Iter>(&mut self, history: Iter) -> usize
    where
        Iter: IntoIterator<Item = Candle>,
    {
        let timeframe = self.timeframe;

        let history = history
            .into_iter()
            .filter(|candle| {
                let valid = candle.is_valid();
                if !valid {
                    debug!(?candle, "skipping invalid historical candle");
                }
                valid
            })
            .map(|mut candle| {
                candle.time = timeframe.bucket_start(candle.time);
                candle
            })
            .collect::<Vec<_>>();

        let (Some(first), Some(last)) = (
            history.iter().map(|candle| candle.time).min(),
            history.iter().map(|candle| candle.time).max(),
        ) else {
            return self.series.len();
        };

        let existing = self.series.candles();
        let older = existing
            .iter()
            .filter(|candle| candle.time < first)
            .copied()
            .collect::<Vec<_>>();
        let live = existing
            .iter()
            .filter(|candle| candle.time >= last)
            .copied()
            .collect::<Vec<_>>();

        self.series.replace(older.into_iter().chain(history).chain(live));
        self.series.len()
    }

    /// Switch to a new [`Timeframe`], discarding the in-memory series until a fresh seed.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
        self.series.clear();
        self.last_tick_time = None;
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }
}
