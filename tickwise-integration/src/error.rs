use crate::{Unrecoverable, protocol::websocket::WsError};
use thiserror::Error;

/// All socket IO related errors generated in `tickwise-integration`.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Sink error")]
    Sink,

    #[error("Deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("Serialising JSON error: {0}")]
    Serialise(serde_json::Error),

    #[error("error parsing Url: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("error subscribing to resources over the socket: {0}")]
    Subscribe(String),

    #[error("feed socket terminated with closing frame: {0}")]
    Terminated(String),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<WsError>),

    #[error("consumed error message from feed: {0}")]
    Feed(String),
}

impl From<WsError> for SocketError {
    fn from(error: WsError) -> Self {
        Self::WebSocket(Box::new(error))
    }
}

impl Unrecoverable for SocketError {
    fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            SocketError::Sink | SocketError::Terminated(_) | SocketError::WebSocket(_)
        )
    }
}
