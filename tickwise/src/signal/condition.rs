use derive_more::{Display, From};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;
use std::{fmt::Formatter, str::FromStr};
use tickwise_ta::{
    cross::{Cross, crossover},
    patterns::{CandlePattern, PatternKind},
    snapshot::IndicatorSnapshot,
};

use super::SignalKind;

/// Unique identifier of a [`SignalCondition`].
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
#[serde(transparent)]
pub struct ConditionId(pub SmolStr);

impl ConditionId {
    pub fn new<S>(id: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self(id.into())
    }
}

impl From<&str> for ConditionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Value a [`SignalCondition`] reads from an [`IndicatorSnapshot`] and its pattern set.
///
/// Serialised as a lowercase string, eg/ `"rsi"`, `"macd_histogram"` or
/// `"pattern:bullish_engulfing"`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ConditionSource {
    Rsi,
    Sma20,
    Sma50,
    Ema20,
    Macd,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    Atr,
    StochasticK,
    StochasticD,
    Price,
    /// Close minus SMA(20).
    PriceToSma20,
    /// Close minus SMA(50).
    PriceToSma50,
    /// Strength of the pattern on the latest bar, 0 when absent.
    Pattern(PatternKind),
}

const PATTERN_PREFIX: &str = "pattern:";

impl ConditionSource {
    /// Read the current value of this source, `None` while there is insufficient history.
    pub fn value(&self, snapshot: &IndicatorSnapshot, patterns: &[CandlePattern]) -> Option<f64> {
        match self {
            Self::Rsi => snapshot.rsi,
            Self::Sma20 => snapshot.sma20,
            Self::Sma50 => snapshot.sma50,
            Self::Ema20 => snapshot.ema20,
            Self::Macd => snapshot.macd.map(|macd| macd.macd),
            Self::MacdSignal => snapshot.macd.map(|macd| macd.signal),
            Self::MacdHistogram => snapshot.macd.map(|macd| macd.histogram),
            Self::BollingerUpper => snapshot.bollinger.map(|bands| bands.upper),
            Self::BollingerMiddle => snapshot.bollinger.map(|bands| bands.middle),
            Self::BollingerLower => snapshot.bollinger.map(|bands| bands.lower),
            Self::Atr => snapshot.atr,
            Self::StochasticK => snapshot.stochastic.map(|stochastic| stochastic.k),
            Self::StochasticD => snapshot.stochastic.and_then(|stochastic| stochastic.d),
            Self::Price => Some(snapshot.price),
            Self::PriceToSma20 => snapshot.sma20.map(|sma| snapshot.price - sma),
            Self::PriceToSma50 => snapshot.sma50.map(|sma| snapshot.price - sma),
            Self::Pattern(kind) => Some(
                patterns
                    .iter()
                    .find(|pattern| pattern.kind == *kind)
                    .map_or(0.0, |pattern| f64::from(pattern.strength)),
            ),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Rsi => "rsi",
            Self::Sma20 => "sma20",
            Self::Sma50 => "sma50",
            Self::Ema20 => "ema20",
            Self::Macd => "macd",
            Self::MacdSignal => "macd_signal",
            Self::MacdHistogram => "macd_histogram",
            Self::BollingerUpper => "bollinger_upper",
            Self::BollingerMiddle => "bollinger_middle",
            Self::BollingerLower => "bollinger_lower",
            Self::Atr => "atr",
            Self::StochasticK => "stochastic_k",
            Self::StochasticD => "stochastic_d",
            Self::Price => "price",
            Self::PriceToSma20 => "price_to_sma20",
            Self::PriceToSma50 => "price_to_sma50",
            Self::Pattern(kind) => kind.name(),
        }
    }
}

impl std::fmt::Display for ConditionSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern(kind) => write!(f, "{PATTERN_PREFIX}{}", kind.name()),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for ConditionSource {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Some(pattern) = input.strip_prefix(PATTERN_PREFIX) {
            return PatternKind::from_name(pattern)
                .map(Self::Pattern)
                .ok_or_else(|| format!("unknown pattern: {pattern}"));
        }

        let source = match input {
            "rsi" => Self::Rsi,
            "sma20" => Self::Sma20,
            "sma50" => Self::Sma50,
            "ema20" => Self::Ema20,
            "macd" => Self::Macd,
            "macd_signal" => Self::MacdSignal,
            "macd_histogram" => Self::MacdHistogram,
            "bollinger_upper" => Self::BollingerUpper,
            "bollinger_middle" => Self::BollingerMiddle,
            "bollinger_lower" => Self::BollingerLower,
            "atr" => Self::Atr,
            "stochastic_k" => Self::StochasticK,
            "stochastic_d" => Self::StochasticD,
            "price" => Self::Price,
            "price_to_sma20" => Self::PriceToSma20,
            "price_to_sma50" => Self::PriceToSma50,
            unknown => return Err(format!("unknown condition source: {unknown}")),
        };

        Ok(source)
    }
}

impl Serialize for ConditionSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ConditionSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let input = String::deserialize(deserializer)?;
        input.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[display("crosses_above")]
    CrossesAbove,
    #[display("crosses_below")]
    CrossesBelow,
    #[display("gt")]
    Gt,
    #[display("lt")]
    Lt,
}

impl Comparison {
    /// Determine if the comparison holds for `current`, given the `previous` value of the same
    /// source. Crossings require a previous value.
    pub fn is_met(&self, previous: Option<f64>, current: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => current > threshold,
            Self::Lt => current < threshold,
            Self::CrossesAbove => previous.is_some_and(|previous| {
                crossover(previous, threshold, current, threshold) == Some(Cross::Above)
            }),
            Self::CrossesBelow => previous.is_some_and(|previous| {
                crossover(previous, threshold, current, threshold) == Some(Cross::Below)
            }),
        }
    }
}

/// Configured trading rule evaluated against every closed bar.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalCondition {
    pub id: ConditionId,
    pub name: String,
    pub indicator: ConditionSource,
    pub comparison: Comparison,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl SignalCondition {
    pub fn new(
        id: &str,
        name: &str,
        indicator: ConditionSource,
        comparison: Comparison,
        value: f64,
        kind: SignalKind,
    ) -> Self {
        Self {
            id: ConditionId::from(id),
            name: name.to_string(),
            indicator,
            comparison,
            value,
            kind,
            enabled: true,
        }
    }

    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }
}

/// Default rule set: oscillator extremes, MACD and SMA(20) crossings, and engulfing patterns
/// (disabled).
pub fn default_conditions() -> Vec<SignalCondition> {
    use Comparison::*;
    use ConditionSource::*;
    use SignalKind::*;

    vec![
        SignalCondition::new("rsi_oversold", "RSI Oversold", Rsi, Lt, 30.0, Buy),
        SignalCondition::new("rsi_overbought", "RSI Overbought", Rsi, Gt, 70.0, Sell),
        SignalCondition::new(
            "macd_bullish_cross",
            "MACD Bullish Cross",
            MacdHistogram,
            CrossesAbove,
            0.0,
            Buy,
        ),
        SignalCondition::new(
            "macd_bearish_cross",
            "MACD Bearish Cross",
            MacdHistogram,
            CrossesBelow,
            0.0,
            Sell,
        ),
        SignalCondition::new(
            "stochastic_oversold",
            "Stochastic Oversold",
            StochasticK,
            Lt,
            20.0,
            Buy,
        ),
        SignalCondition::new(
            "stochastic_overbought",
            "Stochastic Overbought",
            StochasticK,
            Gt,
            80.0,
            Sell,
        ),
        SignalCondition::new(
            "price_above_sma20",
            "Price Above SMA20",
            PriceToSma20,
            CrossesAbove,
            0.0,
            Buy,
        ),
        SignalCondition::new(
            "price_below_sma20",
            "Price Below SMA20",
            PriceToSma20,
            CrossesBelow,
            0.0,
            Sell,
        ),
        SignalCondition::new(
            "bullish_engulfing",
            "Bullish Engulfing",
            Pattern(PatternKind::BullishEngulfing),
            Gt,
            0.0,
            Buy,
        )
        .disabled(),
        SignalCondition::new(
            "bearish_engulfing",
            "Bearish Engulfing",
            Pattern(PatternKind::BearishEngulfing),
            Gt,
            0.0,
            Sell,
        )
        .disabled(),
    ]
}
