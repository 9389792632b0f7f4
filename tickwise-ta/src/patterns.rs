//! Candlestick pattern recognition over the last one to three candles of a series.
//!
//! Thresholds are fixed constants:
//!
//! | pattern | match | strength 3 | strength 2 |
//! |---|---|---|---|
//! | doji | body ≤ 10% of range | body ≤ 3% | body ≤ 6% |
//! | hammer / shooting star | wick ≥ 2× body, opposite wick ≤ 10% of range | wick ≥ 3× body | wick ≥ 2.5× body |
//! | marubozu | body ≥ 90% of range | body ≥ 97% | body ≥ 94% |
//! | engulfing | opposite colour, body contains prior body | body ratio ≥ 2 | body ratio ≥ 1.5 |
//! | morning / evening star | long candle, small star, reversal past the first body midpoint | star gapped and full reversal | either |
//! | three soldiers / crows | three long same-colour candles opening inside the prior body | closing wicks ≤ 10% of range | ≤ 25% |
//!
//! Flat candles (zero range) never match.

use crate::Candle;
use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

const DOJI_BODY_MAX: f64 = 0.10;
const DOJI_BODY_STRONG: f64 = 0.03;
const DOJI_BODY_MODERATE: f64 = 0.06;

const WICK_BODY_MIN: f64 = 2.0;
const WICK_BODY_STRONG: f64 = 3.0;
const WICK_BODY_MODERATE: f64 = 2.5;
const OPPOSITE_WICK_MAX: f64 = 0.10;

const MARUBOZU_BODY_MIN: f64 = 0.90;
const MARUBOZU_BODY_STRONG: f64 = 0.97;
const MARUBOZU_BODY_MODERATE: f64 = 0.94;

const ENGULFING_RATIO_STRONG: f64 = 2.0;
const ENGULFING_RATIO_MODERATE: f64 = 1.5;

const LONG_BODY_MIN: f64 = 0.50;
const STAR_BODY_MAX: f64 = 0.30;
const SOLDIER_WICK_STRONG: f64 = 0.10;
const SOLDIER_WICK_MODERATE: f64 = 0.25;

/// Directional reading of a [`CandlePattern`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PatternDirection {
    #[display("bullish")]
    Bullish,
    #[display("bearish")]
    Bearish,
    #[display("neutral")]
    Neutral,
}

/// Catalogue of recognised candlestick patterns.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Doji,
    Hammer,
    ShootingStar,
    BullishMarubozu,
    BearishMarubozu,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

impl PatternKind {
    pub const ALL: [Self; 11] = [
        Self::Doji,
        Self::Hammer,
        Self::ShootingStar,
        Self::BullishMarubozu,
        Self::BearishMarubozu,
        Self::BullishEngulfing,
        Self::BearishEngulfing,
        Self::MorningStar,
        Self::EveningStar,
        Self::ThreeWhiteSoldiers,
        Self::ThreeBlackCrows,
    ];

    /// Machine name, eg/ "bullish_engulfing".
    pub fn name(&self) -> &'static str {
        match self {
            Self::Doji => "doji",
            Self::Hammer => "hammer",
            Self::ShootingStar => "shooting_star",
            Self::BullishMarubozu => "bullish_marubozu",
            Self::BearishMarubozu => "bearish_marubozu",
            Self::BullishEngulfing => "bullish_engulfing",
            Self::BearishEngulfing => "bearish_engulfing",
            Self::MorningStar => "morning_star",
            Self::EveningStar => "evening_star",
            Self::ThreeWhiteSoldiers => "three_white_soldiers",
            Self::ThreeBlackCrows => "three_black_crows",
        }
    }

    /// Parse a machine name produced by [`PatternKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Doji => "Doji",
            Self::Hammer => "Hammer",
            Self::ShootingStar => "Shooting Star",
            Self::BullishMarubozu => "Bullish Marubozu",
            Self::BearishMarubozu => "Bearish Marubozu",
            Self::BullishEngulfing => "Bullish Engulfing",
            Self::BearishEngulfing => "Bearish Engulfing",
            Self::MorningStar => "Morning Star",
            Self::EveningStar => "Evening Star",
            Self::ThreeWhiteSoldiers => "Three White Soldiers",
            Self::ThreeBlackCrows => "Three Black Crows",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Doji => "➕",
            Self::Hammer => "🔨",
            Self::ShootingStar => "🌠",
            Self::BullishMarubozu | Self::ThreeWhiteSoldiers => "🟩",
            Self::BearishMarubozu | Self::ThreeBlackCrows => "🟥",
            Self::BullishEngulfing => "📈",
            Self::BearishEngulfing => "📉",
            Self::MorningStar => "🌅",
            Self::EveningStar => "🌇",
        }
    }

    pub fn direction(&self) -> PatternDirection {
        match self {
            Self::Doji => PatternDirection::Neutral,
            Self::Hammer
            | Self::BullishMarubozu
            | Self::BullishEngulfing
            | Self::MorningStar
            | Self::ThreeWhiteSoldiers => PatternDirection::Bullish,
            Self::ShootingStar
            | Self::BearishMarubozu
            | Self::BearishEngulfing
            | Self::EveningStar
            | Self::ThreeBlackCrows => PatternDirection::Bearish,
        }
    }

    /// Number of trailing candles the pattern spans.
    pub fn candles(&self) -> usize {
        match self {
            Self::Doji
            | Self::Hammer
            | Self::ShootingStar
            | Self::BullishMarubozu
            | Self::BearishMarubozu => 1,
            Self::BullishEngulfing | Self::BearishEngulfing => 2,
            Self::MorningStar
            | Self::EveningStar
            | Self::ThreeWhiteSoldiers
            | Self::ThreeBlackCrows => 3,
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pattern matched at the end of a candle series, with a `strength` of 1 (loose) to 3 (textbook).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize, Constructor)]
pub struct CandlePattern {
    pub kind: PatternKind,
    #[serde(rename = "type")]
    pub direction: PatternDirection,
    pub strength: u8,
}

impl CandlePattern {
    fn of(kind: PatternKind, strength: u8) -> Self {
        Self::new(kind, kind.direction(), strength)
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn emoji(&self) -> &'static str {
        self.kind.emoji()
    }
}

/// Classify the last one to three candles of `tail` against the pattern catalogue.
///
/// Single-candle shapes are mutually exclusive (doji takes precedence), while one, two and three
/// candle patterns may co-occur. Never fails; an empty or flat tail yields no matches.
pub fn recognise(tail: &[Candle]) -> Vec<CandlePattern> {
    let mut patterns = Vec::new();

    if let [.., curr] = tail {
        patterns.extend(single(curr));
    }
    if let [.., prev, curr] = tail {
        patterns.extend(engulfing(prev, curr));
    }
    if let [.., first, second, third] = tail {
        patterns.extend(star(first, second, third));
        patterns.extend(three_in_a_row(first, second, third));
    }

    patterns
}

fn single(candle: &Candle) -> Option<CandlePattern> {
    let range = candle.range();
    if range <= 0.0 {
        return None;
    }

    let body = candle.body();
    let body_ratio = body / range;

    if body_ratio <= DOJI_BODY_MAX {
        let strength = grade_max(body_ratio, DOJI_BODY_STRONG, DOJI_BODY_MODERATE);
        return Some(CandlePattern::of(PatternKind::Doji, strength));
    }

    let lower = candle.lower_wick();
    let upper = candle.upper_wick();

    if lower >= WICK_BODY_MIN * body && upper <= OPPOSITE_WICK_MAX * range {
        let strength = grade_min(lower / body, WICK_BODY_STRONG, WICK_BODY_MODERATE);
        return Some(CandlePattern::of(PatternKind::Hammer, strength));
    }

    if upper >= WICK_BODY_MIN * body && lower <= OPPOSITE_WICK_MAX * range {
        let strength = grade_min(upper / body, WICK_BODY_STRONG, WICK_BODY_MODERATE);
        return Some(CandlePattern::of(PatternKind::ShootingStar, strength));
    }

    if body_ratio >= MARUBOZU_BODY_MIN {
        let kind = if candle.is_bullish() {
            PatternKind::BullishMarubozu
        } else {
            PatternKind::BearishMarubozu
        };
        let strength = grade_min(body_ratio, MARUBOZU_BODY_STRONG, MARUBOZU_BODY_MODERATE);
        return Some(CandlePattern::of(kind, strength));
    }

    None
}

fn engulfing(prev: &Candle, curr: &Candle) -> Option<CandlePattern> {
    let (prev_body, curr_body) = (prev.body(), curr.body());
    if prev_body <= 0.0 || curr_body <= prev_body {
        return None;
    }

    let contains = curr.body_bottom() <= prev.body_bottom() && curr.body_top() >= prev.body_top();
    if !contains {
        return None;
    }

    let kind = if prev.is_bearish() && curr.is_bullish() {
        PatternKind::BullishEngulfing
    } else if prev.is_bullish() && curr.is_bearish() {
        PatternKind::BearishEngulfing
    } else {
        return None;
    };

    let strength = grade_min(
        curr_body / prev_body,
        ENGULFING_RATIO_STRONG,
        ENGULFING_RATIO_MODERATE,
    );

    Some(CandlePattern::of(kind, strength))
}

fn star(first: &Candle, second: &Candle, third: &Candle) -> Option<CandlePattern> {
    if [first, second, third]
        .iter()
        .any(|candle| candle.range() <= 0.0)
    {
        return None;
    }

    if !is_long(first) || !is_long(third) || second.body() > STAR_BODY_MAX * first.body() {
        return None;
    }

    let midpoint = (first.open + first.close) / 2.0;

    let (kind, gapped, reversed) = if first.is_bearish() && third.is_bullish() {
        if third.close <= midpoint {
            return None;
        }
        (
            PatternKind::MorningStar,
            second.body_top() <= first.close,
            third.close >= first.open,
        )
    } else if first.is_bullish() && third.is_bearish() {
        if third.close >= midpoint {
            return None;
        }
        (
            PatternKind::EveningStar,
            second.body_bottom() >= first.close,
            third.close <= first.open,
        )
    } else {
        return None;
    };

    Some(CandlePattern::of(kind, 1 + u8::from(gapped) + u8::from(reversed)))
}

fn three_in_a_row(first: &Candle, second: &Candle, third: &Candle) -> Option<CandlePattern> {
    let candles = [first, second, third];
    if !candles.iter().all(|candle| candle.range() > 0.0 && is_long(candle)) {
        return None;
    }

    let (kind, closing_wick): (PatternKind, fn(&Candle) -> f64) =
        if candles.iter().all(|candle| candle.is_bullish()) {
            (PatternKind::ThreeWhiteSoldiers, Candle::upper_wick)
        } else if candles.iter().all(|candle| candle.is_bearish()) {
            (PatternKind::ThreeBlackCrows, Candle::lower_wick)
        } else {
            return None;
        };

    let progressing = candles.windows(2).all(|pair| {
        let (prev, curr) = (pair[0], pair[1]);
        let opens_inside = curr.open >= prev.body_bottom() && curr.open <= prev.body_top();
        let advances = match kind {
            PatternKind::ThreeWhiteSoldiers => curr.close > prev.close,
            _ => curr.close < prev.close,
        };
        opens_inside && advances
    });
    if !progressing {
        return None;
    }

    let worst_wick = candles
        .iter()
        .map(|&candle| closing_wick(candle) / candle.range())
        .fold(0.0, f64::max);

    Some(CandlePattern::of(
        kind,
        grade_max(worst_wick, SOLDIER_WICK_STRONG, SOLDIER_WICK_MODERATE),
    ))
}

fn is_long(candle: &Candle) -> bool {
    candle.range() > 0.0 && candle.body() >= LONG_BODY_MIN * candle.range()
}

/// Grade a measure where larger is cleaner.
fn grade_min(value: f64, strong: f64, moderate: f64) -> u8 {
    if value >= strong {
        3
    } else if value >= moderate {
        2
    } else {
        1
    }
}

/// Grade a measure where smaller is cleaner.
fn grade_max(value: f64, strong: f64, moderate: f64) -> u8 {
    if value <= strong {
        3
    } else if value <= moderate {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(0, open, high, low, close, 0.0)
    }

    fn kinds(tail: &[Candle]) -> Vec<(PatternKind, u8)> {
        recognise(tail)
            .into_iter()
            .map(|pattern| (pattern.kind, pattern.strength))
            .collect()
    }

    #[test]
    fn test_single_candle_patterns() {
        struct TestCase {
            input: Candle,
            expected: Vec<(PatternKind, u8)>,
        }

        let tests = vec![
            TestCase {
                // TC0: flat candle never matches
                input: candle(10.0, 10.0, 10.0, 10.0),
                expected: vec![],
            },
            TestCase {
                // TC1: perfect doji
                input: candle(10.0, 11.0, 9.0, 10.0),
                expected: vec![(PatternKind::Doji, 3)],
            },
            TestCase {
                // TC2: loose doji, body 8% of range
                input: candle(10.0, 11.0, 1.0, 10.8),
                expected: vec![(PatternKind::Doji, 1)],
            },
            TestCase {
                // TC3: hammer, lower wick 4x body
                input: candle(10.0, 11.0, 6.0, 11.0),
                expected: vec![(PatternKind::Hammer, 3)],
            },
            TestCase {
                // TC4: upper wick equal to body is not a shooting star
                input: candle(10.0, 14.0, 10.0, 12.0),
                expected: vec![],
            },
            TestCase {
                // TC5: shooting star, upper wick 2.5x body with no lower wick
                input: candle(12.0, 17.0, 10.0, 10.0),
                expected: vec![(PatternKind::ShootingStar, 2)],
            },
            TestCase {
                // TC6: bearish marubozu
                input: candle(20.0, 20.0, 10.0, 10.0),
                expected: vec![(PatternKind::BearishMarubozu, 3)],
            },
            TestCase {
                // TC7: ordinary candle
                input: candle(10.0, 13.0, 8.0, 12.0),
                expected: vec![],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(kinds(&[test.input]), test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_engulfing() {
        struct TestCase {
            input: [Candle; 2],
            expected: Vec<(PatternKind, u8)>,
        }

        let tests = vec![
            TestCase {
                // TC0: bullish engulfing with body ratio 2
                input: [candle(10.0, 10.5, 8.0, 9.0), candle(8.5, 11.0, 8.0, 10.5)],
                expected: vec![(PatternKind::BullishEngulfing, 3)],
            },
            TestCase {
                // TC1: bearish engulfing with body ratio 1.5
                input: [candle(10.0, 13.0, 9.0, 12.0), candle(12.5, 13.0, 9.0, 9.5)],
                expected: vec![(PatternKind::BearishEngulfing, 2)],
            },
            TestCase {
                // TC2: same colour never engulfs
                input: [candle(9.0, 10.5, 8.0, 10.0), candle(8.5, 11.0, 8.0, 10.5)],
                expected: vec![],
            },
            TestCase {
                // TC3: body not contained
                input: [candle(10.0, 10.5, 8.0, 9.0), candle(9.5, 12.0, 8.0, 11.5)],
                expected: vec![],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = recognise(&test.input)
                .into_iter()
                .filter(|pattern| pattern.kind.candles() == 2)
                .map(|pattern| (pattern.kind, pattern.strength))
                .collect::<Vec<_>>();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_morning_star() {
        let tail = [
            candle(20.0, 20.5, 13.5, 14.0),
            candle(13.0, 13.5, 12.0, 12.5),
            candle(13.5, 21.0, 13.0, 20.5),
        ];

        let actual = recognise(&tail);
        assert!(actual.contains(&CandlePattern::new(
            PatternKind::MorningStar,
            PatternDirection::Bullish,
            3
        )));
    }

    #[test]
    fn test_three_black_crows() {
        let tail = [
            candle(30.0, 30.0, 25.0, 25.5),
            candle(26.0, 26.0, 21.0, 21.5),
            candle(22.0, 22.0, 17.0, 17.5),
        ];

        let actual = recognise(&tail);
        assert!(actual.contains(&CandlePattern::new(
            PatternKind::ThreeBlackCrows,
            PatternDirection::Bearish,
            3
        )));
        assert!(!actual.iter().any(|pattern| pattern.kind == PatternKind::ThreeWhiteSoldiers));
    }

    #[test]
    fn test_pattern_kind_names() {
        for kind in PatternKind::ALL {
            assert_eq!(PatternKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.to_string(), kind.name());
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.name().to_string())
            );
        }
        assert_eq!(PatternKind::from_name("unknown"), None);
    }
}
