use crate::{subscription::ConnectionState, symbol::Symbol, timeframe::Timeframe};
use serde::{Deserialize, Serialize};
use tickwise_ta::Candle;

/// Normalised event routed from the feed to the consumer of a
/// [`SubscriptionManager`](crate::subscription::manager::SubscriptionManager).
///
/// Candle events carry the [`Timeframe`] they were requested for, so a consumer that has since
/// switched timeframe can discard them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum FeedEvent {
    Tick {
        symbol: Symbol,
        price: f64,
        time: i64,
    },
    Candle {
        symbol: Symbol,
        timeframe: Timeframe,
        candle: Candle,
    },
    History {
        symbol: Symbol,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    },
    /// A watched symbol was dropped because the feed catalogue does not list it.
    Rejected(Symbol),
    Connection(ConnectionState),
}

impl FeedEvent {
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::Tick { symbol, .. }
            | Self::Candle { symbol, .. }
            | Self::History { symbol, .. }
            | Self::Rejected(symbol) => Some(symbol),
            Self::Connection(_) => None,
        }
    }
}
