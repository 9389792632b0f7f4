use crate::{error::SocketError, protocol::StreamParser};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, connect_async,
    tungstenite::{
        Utf8Bytes,
        client::IntoClientRequest,
        error::ProtocolError,
        protocol::{CloseFrame, frame::Frame},
    },
};
use tracing::debug;

/// Convenient type alias for a tungstenite `WebSocketStream`.
pub type WebSocket = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Communicative type alias for a tungstenite [`WebSocket`] `Message`.
pub type WsMessage = tokio_tungstenite::tungstenite::Message;

/// Communicative type alias for a tungstenite [`WebSocket`] `Error`.
pub type WsError = tokio_tungstenite::tungstenite::Error;

/// Default [`StreamParser`] implementation for a [`WebSocket`] carrying JSON payloads.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub struct WebSocketSerdeParser;

impl<Output> StreamParser<Output> for WebSocketSerdeParser
where
    Output: for<'de> Deserialize<'de>,
{
    type Message = WsMessage;
    type Error = WsError;

    fn parse(input: Result<Self::Message, Self::Error>) -> Option<Result<Output, SocketError>> {
        match input {
            Ok(ws_message) => match ws_message {
                WsMessage::Text(text) => process_text(text),
                WsMessage::Binary(binary) => process_binary(binary),
                WsMessage::Ping(ping) => process_ping(ping),
                WsMessage::Pong(pong) => process_pong(pong),
                WsMessage::Close(close_frame) => process_close_frame(close_frame),
                WsMessage::Frame(frame) => process_frame(frame),
            },
            Err(ws_err) => Some(Err(SocketError::from(ws_err))),
        }
    }
}

/// Process a payload of `String` by deserialising into a `FeedMessage`.
pub fn process_text<FeedMessage>(payload: Utf8Bytes) -> Option<Result<FeedMessage, SocketError>>
where
    FeedMessage: for<'de> Deserialize<'de>,
{
    Some(
        serde_json::from_str::<FeedMessage>(&payload).map_err(|error| {
            debug!(
                ?error,
                ?payload,
                action = "returning Some(Err(err))",
                "failed to deserialize WebSocket Message into domain specific Message"
            );
            SocketError::Deserialise {
                error,
                payload: payload.to_string(),
            }
        }),
    )
}

/// Process a payload of `Vec<u8>` bytes by deserialising into a `FeedMessage`.
pub fn process_binary<FeedMessage>(payload: Bytes) -> Option<Result<FeedMessage, SocketError>>
where
    FeedMessage: for<'de> Deserialize<'de>,
{
    Some(
        serde_json::from_slice::<FeedMessage>(&payload).map_err(|error| {
            debug!(
                ?error,
                ?payload,
                action = "returning Some(Err(err))",
                "failed to deserialize WebSocket Message into domain specific Message"
            );
            SocketError::Deserialise {
                error,
                payload: String::from_utf8_lossy(&payload).into_owned(),
            }
        }),
    )
}

/// Basic process for a [`WebSocket`] ping message. Logs the payload at `debug` level.
pub fn process_ping<FeedMessage>(ping: Bytes) -> Option<Result<FeedMessage, SocketError>> {
    debug!(payload = ?ping, "received Ping WebSocket message");
    None
}

/// Basic process for a [`WebSocket`] pong message. Logs the payload at `debug` level.
pub fn process_pong<FeedMessage>(pong: Bytes) -> Option<Result<FeedMessage, SocketError>> {
    debug!(payload = ?pong, "received Pong WebSocket message");
    None
}

/// Basic process for a [`WebSocket`] CloseFrame message. Logs the payload at `debug` level.
pub fn process_close_frame<FeedMessage>(
    close_frame: Option<CloseFrame>,
) -> Option<Result<FeedMessage, SocketError>> {
    let close_frame = format!("{close_frame:?}");
    debug!(payload = %close_frame, "received CloseFrame WebSocket message");
    Some(Err(SocketError::Terminated(close_frame)))
}

/// Basic process for a [`WebSocket`] Frame message. Logs the payload at `debug` level.
pub fn process_frame<FeedMessage>(frame: Frame) -> Option<Result<FeedMessage, SocketError>> {
    let frame = format!("{frame:?}");
    debug!(payload = %frame, "received unexpected Frame WebSocket message");
    None
}

/// Connect asynchronously to a [`WebSocket`] server.
pub async fn connect<R>(request: R) -> Result<WebSocket, SocketError>
where
    R: IntoClientRequest + Unpin + Debug,
{
    debug!(?request, "attempting to establish WebSocket connection");
    connect_async(request)
        .await
        .map(|(websocket, _)| websocket)
        .map_err(SocketError::from)
}

/// Determine whether a [`WsError`] indicates the [`WebSocket`] has disconnected.
pub fn is_websocket_disconnected(error: &WsError) -> bool {
    matches!(
        error,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Io(_)
            | WsError::Protocol(ProtocolError::SendAfterClosing)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Heartbeat {
        seq: u64,
    }

    #[test]
    fn test_websocket_serde_parser() {
        let parsed = <WebSocketSerdeParser as StreamParser<Heartbeat>>::parse(Ok(
            WsMessage::text(r#"{"seq": 7}"#),
        ));
        assert!(matches!(parsed, Some(Ok(Heartbeat { seq: 7 }))));

        let skipped = <WebSocketSerdeParser as StreamParser<Heartbeat>>::parse(Ok(
            WsMessage::Ping(Bytes::from_static(b"hi")),
        ));
        assert!(skipped.is_none());

        let malformed = <WebSocketSerdeParser as StreamParser<Heartbeat>>::parse(Ok(
            WsMessage::text("not json"),
        ));
        assert!(matches!(malformed, Some(Err(SocketError::Deserialise { .. }))));

        let closed = <WebSocketSerdeParser as StreamParser<Heartbeat>>::parse(Ok(
            WsMessage::Close(None),
        ));
        assert!(matches!(closed, Some(Err(SocketError::Terminated(_)))));
    }

    #[test]
    fn test_is_websocket_disconnected() {
        assert!(is_websocket_disconnected(&WsError::ConnectionClosed));
        assert!(is_websocket_disconnected(&WsError::AlreadyClosed));
        assert!(!is_websocket_disconnected(&WsError::Url(
            tokio_tungstenite::tungstenite::error::UrlError::NoHostName
        )));
    }
}
