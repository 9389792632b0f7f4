use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};
use tickwise_integration::{
    Validator,
    de::{de_flexible_f64, de_flexible_f64_opt},
    error::SocketError,
    subscription::SubscriptionId,
};
use tickwise_ta::Candle;

/// [`FeedTransport`](transport::FeedTransport) abstraction and its WebSocket implementation.
pub mod transport;

/// Outbound request sent to the feed.
///
/// ### Raw Payload Examples
/// ```json
/// {"type": "catalogue"}
/// {"type": "subscribe_candles", "symbol": "R_100", "granularity": 60, "count": 300, "req_id": 7}
/// {"type": "forget", "id": "c0ffee"}
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedRequest {
    /// Request the catalogue of tradable symbols. Completes the connection handshake.
    Catalogue,
    SubscribeTicks {
        symbol: Symbol,
        req_id: u64,
    },
    /// Subscribe to candle pushes, seeded with `count` historical bars of `granularity` seconds.
    SubscribeCandles {
        symbol: Symbol,
        granularity: u32,
        count: usize,
        req_id: u64,
    },
    /// Release a server-side subscription.
    Forget {
        id: SubscriptionId,
    },
    Ping,
}

impl FeedRequest {
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::SubscribeTicks { symbol, .. } | Self::SubscribeCandles { symbol, .. } => {
                Some(symbol)
            }
            Self::Catalogue | Self::Forget { .. } | Self::Ping => None,
        }
    }
}

/// Inbound message received from the feed.
///
/// ### Raw Payload Examples
/// ```json
/// {"type": "tick", "symbol": "R_100", "price": 1234.56, "time": 1700000000, "id": "a1"}
/// {"type": "ohlc", "symbol": "R_100", "open": "1234.1", "high": "1235.0", "low": "1233.9", "close": "1234.56", "time": 1699999980, "id": "b2"}
/// {"type": "catalogue", "symbols": [{"symbol": "R_100", "display_name": "Volatility 100 Index"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Tick(FeedTick),
    #[serde(alias = "ohlc")]
    Candle(FeedCandle),
    History(FeedHistory),
    Catalogue(FeedCatalogue),
    Pong,
    Error(FeedError),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedTick {
    pub symbol: Symbol,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub price: f64,
    pub time: i64,
    #[serde(default)]
    pub id: Option<SubscriptionId>,
}

/// Full or in-progress OHLC bar push for one symbol.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedCandle {
    pub symbol: Symbol,
    #[serde(flatten)]
    pub bar: FeedBar,
    #[serde(default)]
    pub id: Option<SubscriptionId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedBar {
    #[serde(alias = "epoch", alias = "open_time")]
    pub time: i64,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub open: f64,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub high: f64,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub low: f64,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub close: f64,
    #[serde(default, deserialize_with = "de_flexible_f64_opt")]
    pub volume: Option<f64>,
}

impl From<FeedBar> for Candle {
    fn from(bar: FeedBar) -> Self {
        Candle::new(
            bar.time,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume.unwrap_or_default(),
        )
    }
}

/// Historical bars answering a [`FeedRequest::SubscribeCandles`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedHistory {
    pub symbol: Symbol,
    pub candles: Vec<FeedBar>,
    #[serde(default)]
    pub req_id: Option<u64>,
    #[serde(default)]
    pub id: Option<SubscriptionId>,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct FeedCatalogue {
    pub symbols: Vec<CatalogueEntry>,
}

/// Tradable symbol advertised by the feed catalogue.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct CatalogueEntry {
    pub symbol: Symbol,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct FeedError {
    pub message: String,
    #[serde(default)]
    pub req_id: Option<u64>,
}

impl Validator for FeedMessage {
    fn validate(self) -> Result<Self, SocketError>
    where
        Self: Sized,
    {
        match &self {
            FeedMessage::Tick(tick) if !tick.price.is_finite() => Err(SocketError::Feed(format!(
                "tick for {} has non-finite price",
                tick.symbol
            ))),
            FeedMessage::Candle(candle) if !Candle::from(candle.bar).is_valid() => {
                Err(SocketError::Feed(format!(
                    "candle for {} violates OHLC invariants: {:?}",
                    candle.symbol, candle.bar
                )))
            }
            _ => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod de {
        use super::*;

        #[test]
        fn test_feed_message() {
            struct TestCase {
                input: &'static str,
                expected: FeedMessage,
            }

            let tests = vec![
                TestCase {
                    // TC0: tick with numeric price
                    input: r#"{"type": "tick", "symbol": "R_100", "price": 1234.5, "time": 1700000000, "id": "a1"}"#,
                    expected: FeedMessage::Tick(FeedTick {
                        symbol: Symbol::from("R_100"),
                        price: 1234.5,
                        time: 1_700_000_000,
                        id: Some(SubscriptionId::from("a1")),
                    }),
                },
                TestCase {
                    // TC1: ohlc alias with quoted prices and no id
                    input: r#"{"type": "ohlc", "symbol": "R_50", "open": "10.0", "high": "11.5", "low": "9.5", "close": "11.0", "time": 60}"#,
                    expected: FeedMessage::Candle(FeedCandle {
                        symbol: Symbol::from("R_50"),
                        bar: FeedBar {
                            time: 60,
                            open: 10.0,
                            high: 11.5,
                            low: 9.5,
                            close: 11.0,
                            volume: None,
                        },
                        id: None,
                    }),
                },
                TestCase {
                    // TC2: history answering a request
                    input: r#"{"type": "history", "symbol": "R_50", "req_id": 4, "candles": [{"time": 0, "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": 10}]}"#,
                    expected: FeedMessage::History(FeedHistory {
                        symbol: Symbol::from("R_50"),
                        candles: vec![FeedBar {
                            time: 0,
                            open: 1.0,
                            high: 2.0,
                            low: 0.5,
                            close: 1.5,
                            volume: Some(10.0),
                        }],
                        req_id: Some(4),
                        id: None,
                    }),
                },
                TestCase {
                    // TC3: catalogue
                    input: r#"{"type": "catalogue", "symbols": [{"symbol": "R_100", "display_name": "Volatility 100"}]}"#,
                    expected: FeedMessage::Catalogue(FeedCatalogue {
                        symbols: vec![CatalogueEntry {
                            symbol: Symbol::from("R_100"),
                            display_name: Some("Volatility 100".to_string()),
                            market: None,
                        }],
                    }),
                },
                TestCase {
                    // TC4: pong
                    input: r#"{"type": "pong"}"#,
                    expected: FeedMessage::Pong,
                },
                TestCase {
                    // TC5: error
                    input: r#"{"type": "error", "message": "rate limit", "req_id": 2}"#,
                    expected: FeedMessage::Error(FeedError {
                        message: "rate limit".to_string(),
                        req_id: Some(2),
                    }),
                },
            ];

            for (index, test) in tests.into_iter().enumerate() {
                let actual = serde_json::from_str::<FeedMessage>(test.input).unwrap();
                assert_eq!(actual, test.expected, "TC{} failed", index);
            }
        }

        #[test]
        fn test_feed_message_unknown_type_is_error() {
            assert!(serde_json::from_str::<FeedMessage>(r#"{"type": "balance"}"#).is_err());
        }
    }

    mod ser {
        use super::*;

        #[test]
        fn test_feed_request() {
            struct TestCase {
                input: FeedRequest,
                expected: serde_json::Value,
            }

            let tests = vec![
                TestCase {
                    // TC0
                    input: FeedRequest::Catalogue,
                    expected: serde_json::json!({"type": "catalogue"}),
                },
                TestCase {
                    // TC1
                    input: FeedRequest::SubscribeCandles {
                        symbol: Symbol::from("R_100"),
                        granularity: 60,
                        count: 300,
                        req_id: 7,
                    },
                    expected: serde_json::json!({
                        "type": "subscribe_candles",
                        "symbol": "R_100",
                        "granularity": 60,
                        "count": 300,
                        "req_id": 7
                    }),
                },
                TestCase {
                    // TC2
                    input: FeedRequest::Forget {
                        id: SubscriptionId::from("c0ffee"),
                    },
                    expected: serde_json::json!({"type": "forget", "id": "c0ffee"}),
                },
            ];

            for (index, test) in tests.into_iter().enumerate() {
                let actual = serde_json::to_value(&test.input).unwrap();
                assert_eq!(actual, test.expected, "TC{} failed", index);
            }
        }
    }

    #[test]
    fn test_validate() {
        let invalid = FeedMessage::Candle(FeedCandle {
            symbol: Symbol::from("R_100"),
            bar: FeedBar {
                time: 60,
                open: 10.0,
                high: 9.0,
                low: 8.0,
                close: 10.0,
                volume: None,
            },
            id: None,
        });
        assert!(matches!(invalid.validate(), Err(SocketError::Feed(_))));

        let nan = FeedMessage::Tick(FeedTick {
            symbol: Symbol::from("R_100"),
            price: f64::NAN,
            time: 0,
            id: None,
        });
        assert!(nan.validate().is_err());

        assert!(FeedMessage::Pong.validate().is_ok());
    }
}
