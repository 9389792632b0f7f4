use crate::{
    Candle,
    indicators::{BollingerValue, Indicator, IndicatorValue, MacdValue, StochasticValue},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Overall directional bias derived from the [`IndicatorSnapshot`] buy and sell scores.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    #[display("strong_buy")]
    StrongBuy,
    #[display("buy")]
    Buy,
    #[default]
    #[display("neutral")]
    Neutral,
    #[display("sell")]
    Sell,
    #[display("strong_sell")]
    StrongSell,
}

impl Bias {
    /// Derive the [`Bias`] from `buy_score - sell_score`.
    pub fn from_scores(buy_score: u32, sell_score: u32) -> Self {
        match i64::from(buy_score) - i64::from(sell_score) {
            diff if diff >= 3 => Self::StrongBuy,
            diff if diff >= 1 => Self::Buy,
            diff if diff <= -3 => Self::StrongSell,
            diff if diff <= -1 => Self::Sell,
            _ => Self::Neutral,
        }
    }
}

/// Indicator values computed from a candle series at a point in time.
///
/// Every indicator field is `None` while the series is too short for its lookback. Immutable once
/// produced; the next update produces a new snapshot.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    /// Open time of the last candle used.
    pub time: i64,
    /// Close of the last candle used.
    pub price: f64,
    pub rsi: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub ema20: Option<f64>,
    pub macd: Option<MacdValue>,
    pub bollinger: Option<BollingerValue>,
    pub atr: Option<f64>,
    pub stochastic: Option<StochasticValue>,
    #[serde(rename = "overallBias")]
    pub bias: Bias,
    pub buy_score: u32,
    pub sell_score: u32,
}

impl IndicatorSnapshot {
    pub const RSI: Indicator = Indicator::Rsi { period: 14 };
    pub const SMA_20: Indicator = Indicator::Sma { period: 20 };
    pub const SMA_50: Indicator = Indicator::Sma { period: 50 };
    pub const EMA_20: Indicator = Indicator::Ema { period: 20 };
    pub const MACD: Indicator = Indicator::Macd {
        fast: 12,
        slow: 26,
        signal: 9,
    };
    pub const BOLLINGER: Indicator = Indicator::Bollinger {
        period: 20,
        std_dev: 2.0,
    };
    pub const ATR: Indicator = Indicator::Atr { period: 14 };
    pub const STOCHASTIC: Indicator = Indicator::Stochastic {
        k_period: 14,
        d_period: 3,
    };

    pub const RSI_OVERSOLD: f64 = 30.0;
    pub const RSI_OVERBOUGHT: f64 = 70.0;

    /// Compute an [`IndicatorSnapshot`] at the last of the provided candles.
    ///
    /// Returns `None` for an empty slice.
    pub fn compute(candles: &[Candle]) -> Option<Self> {
        let last = candles.last()?;

        let line = |indicator: Indicator| {
            indicator
                .latest(candles)
                .and_then(IndicatorValue::into_line)
        };

        let mut snapshot = Self {
            time: last.time,
            price: last.close,
            rsi: line(Self::RSI),
            sma20: line(Self::SMA_20),
            sma50: line(Self::SMA_50),
            ema20: line(Self::EMA_20),
            macd: Self::MACD
                .latest(candles)
                .and_then(IndicatorValue::into_macd),
            bollinger: Self::BOLLINGER
                .latest(candles)
                .and_then(IndicatorValue::into_bands),
            atr: line(Self::ATR),
            stochastic: Self::STOCHASTIC
                .latest(candles)
                .and_then(IndicatorValue::into_stochastic),
            bias: Bias::Neutral,
            buy_score: 0,
            sell_score: 0,
        };

        snapshot.score();
        Some(snapshot)
    }

    /// Tally buy and sell weights and derive the overall [`Bias`].
    ///
    /// Weights: RSI beyond 30/70 is 2, price vs SMA20 and vs SMA50 are 1 each, MACD line vs
    /// signal line is 1, and a Bollinger band breach is 2.
    fn score(&mut self) {
        let (mut buy, mut sell) = (0, 0);

        if let Some(rsi) = self.rsi {
            if rsi < Self::RSI_OVERSOLD {
                buy += 2;
            } else if rsi > Self::RSI_OVERBOUGHT {
                sell += 2;
            }
        }

        for average in [self.sma20, self.sma50].into_iter().flatten() {
            if self.price > average {
                buy += 1;
            } else if self.price < average {
                sell += 1;
            }
        }

        if let Some(macd) = self.macd {
            if macd.macd > macd.signal {
                buy += 1;
            } else if macd.macd < macd.signal {
                sell += 1;
            }
        }

        if let Some(bands) = self.bollinger {
            if self.price < bands.lower {
                buy += 2;
            } else if self.price > bands.upper {
                sell += 2;
            }
        }

        self.buy_score = buy;
        self.sell_score = sell;
        self.bias = Bias::from_scores(buy, sell);
    }
}
