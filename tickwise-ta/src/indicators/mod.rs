use crate::Candle;
use derive_more::Display;
use serde::{Deserialize, Serialize};

pub use atr::atr;
pub use average::{ema, ema_of, sma, sma_of};
pub use bollinger::{BollingerValue, bollinger};
pub use macd::{MacdValue, macd};
pub use rsi::rsi;
pub use stochastic::{StochasticValue, stochastic};

pub mod atr;
pub mod average;
pub mod bollinger;
pub mod macd;
pub mod rsi;
pub mod stochastic;

/// Closed set of supported indicators, dispatched by pattern match in [`Indicator::compute`].
///
/// ### Notes
/// Serialised with an internal `kind` tag, eg/ `{"kind": "rsi", "period": 14}`.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize, Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Indicator {
    #[display("SMA({period})")]
    Sma { period: usize },
    #[display("EMA({period})")]
    Ema { period: usize },
    #[display("RSI({period})")]
    Rsi { period: usize },
    #[display("MACD({fast},{slow},{signal})")]
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    #[display("BB({period},{std_dev})")]
    Bollinger { period: usize, std_dev: f64 },
    #[display("ATR({period})")]
    Atr { period: usize },
    #[display("STOCH({k_period},{d_period})")]
    Stochastic { k_period: usize, d_period: usize },
}

impl Indicator {
    /// Compute the full output series of this [`Indicator`] over the provided candles.
    ///
    /// The output always has one entry per input candle.
    pub fn compute(&self, candles: &[Candle]) -> IndicatorSeries {
        match *self {
            Self::Sma { period } => IndicatorSeries::Line(sma(&closes(candles), period)),
            Self::Ema { period } => IndicatorSeries::Line(ema(&closes(candles), period)),
            Self::Rsi { period } => IndicatorSeries::Line(rsi(&closes(candles), period)),
            Self::Macd { fast, slow, signal } => {
                IndicatorSeries::Macd(macd(&closes(candles), fast, slow, signal))
            }
            Self::Bollinger { period, std_dev } => {
                IndicatorSeries::Bands(bollinger(&closes(candles), period, std_dev))
            }
            Self::Atr { period } => IndicatorSeries::Line(atr(candles, period)),
            Self::Stochastic { k_period, d_period } => {
                IndicatorSeries::Stochastic(stochastic(candles, k_period, d_period))
            }
        }
    }

    /// Compute only the value at the last candle, if enough history exists.
    pub fn latest(&self, candles: &[Candle]) -> Option<IndicatorValue> {
        self.compute(candles).latest()
    }
}

/// Output series of an [`Indicator`], one entry per input candle.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub enum IndicatorSeries {
    Line(Vec<Option<f64>>),
    Macd(Vec<Option<MacdValue>>),
    Bands(Vec<Option<BollingerValue>>),
    Stochastic(Vec<Option<StochasticValue>>),
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        match self {
            Self::Line(series) => series.len(),
            Self::Macd(series) => series.len(),
            Self::Bands(series) => series.len(),
            Self::Stochastic(series) => series.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at the last index, `None` if the series is empty or still warming up.
    pub fn latest(&self) -> Option<IndicatorValue> {
        match self {
            Self::Line(series) => series.last().copied().flatten().map(IndicatorValue::Line),
            Self::Macd(series) => series.last().copied().flatten().map(IndicatorValue::Macd),
            Self::Bands(series) => series.last().copied().flatten().map(IndicatorValue::Bands),
            Self::Stochastic(series) => series
                .last()
                .copied()
                .flatten()
                .map(IndicatorValue::Stochastic),
        }
    }
}

/// Single [`Indicator`] output value.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize, Serialize)]
pub enum IndicatorValue {
    Line(f64),
    Macd(MacdValue),
    Bands(BollingerValue),
    Stochastic(StochasticValue),
}

impl IndicatorValue {
    pub fn into_line(self) -> Option<f64> {
        match self {
            Self::Line(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_macd(self) -> Option<MacdValue> {
        match self {
            Self::Macd(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bands(self) -> Option<BollingerValue> {
        match self {
            Self::Bands(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_stochastic(self) -> Option<StochasticValue> {
        match self {
            Self::Stochastic(value) => Some(value),
            _ => None,
        }
    }
}

/// Extract the close prices of the provided candles.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|candle| candle.close).collect()
}
