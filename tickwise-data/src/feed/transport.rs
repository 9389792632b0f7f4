use crate::{
    error::DataError,
    feed::{FeedMessage, FeedRequest},
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::fmt::Debug;
use tickwise_integration::{
    error::SocketError,
    protocol::{
        StreamParser,
        websocket::{
            WebSocket, WebSocketSerdeParser, WsMessage, connect, is_websocket_disconnected,
        },
    },
};
use tracing::debug;
use url::Url;

/// Establishes connections to the market-data feed.
///
/// The [`SubscriptionManager`](crate::subscription::manager::SubscriptionManager) calls
/// [`FeedTransport::connect`] once per connection attempt, so a fresh connection is opened after
/// every disconnect.
#[async_trait]
pub trait FeedTransport
where
    Self: Debug + Send + Sync + 'static,
{
    type Connection: FeedConnection;

    async fn connect(&self) -> Result<Self::Connection, DataError>;
}

/// Live, bidirectional feed connection.
#[async_trait]
pub trait FeedConnection
where
    Self: Send + 'static,
{
    async fn send(&mut self, request: FeedRequest) -> Result<(), DataError>;

    /// Receive the next [`FeedMessage`], returning `None` once the connection has ended.
    async fn recv(&mut self) -> Option<Result<FeedMessage, DataError>>;

    async fn close(&mut self);
}

/// [`FeedTransport`] speaking JSON text frames over a [`WebSocket`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WebSocketFeed {
    pub url: Url,
}

impl WebSocketFeed {
    pub fn new(url: &str) -> Result<Self, DataError> {
        Url::parse(url)
            .map(|url| Self { url })
            .map_err(|error| DataError::from(SocketError::UrlParse(error)))
    }
}

#[async_trait]
impl FeedTransport for WebSocketFeed {
    type Connection = WebSocketConnection;

    async fn connect(&self) -> Result<Self::Connection, DataError> {
        let websocket = connect(self.url.as_str()).await?;
        Ok(WebSocketConnection { websocket })
    }
}

/// [`FeedConnection`] over a connected [`WebSocket`].
#[derive(Debug)]
pub struct WebSocketConnection {
    websocket: WebSocket,
}

#[async_trait]
impl FeedConnection for WebSocketConnection {
    async fn send(&mut self, request: FeedRequest) -> Result<(), DataError> {
        let payload = serde_json::to_string(&request).map_err(SocketError::Serialise)?;
        debug!(%payload, "sending feed request");

        self.websocket
            .send(WsMessage::text(payload))
            .await
            .map_err(|error| DataError::from(SocketError::from(error)))
    }

    async fn recv(&mut self) -> Option<Result<FeedMessage, DataError>> {
        loop {
            let message = self.websocket.next().await?;

            if let Err(error) = &message {
                if is_websocket_disconnected(error) {
                    debug!(?error, "feed WebSocket closed");
                    return None;
                }
            }

            // Pings, Pongs and raw Frames parse to None
            if let Some(result) =
                <WebSocketSerdeParser as StreamParser<FeedMessage>>::parse(message)
            {
                return Some(result.map_err(DataError::from));
            }
        }
    }

    async fn close(&mut self) {
        if let Err(error) = self.websocket.close(None).await {
            debug!(?error, "failed to cleanly close feed WebSocket");
        }
    }
}
