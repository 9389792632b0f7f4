use crate::error::SocketError;

/// Contains useful `WebSocket` type aliases and a default `WebSocket` implementation of a
/// [`StreamParser`].
pub mod websocket;

/// `StreamParser`s are capable of parsing the input messages from a given stream protocol
/// (eg/ WebSocket) and deserialising into an `Output`.
pub trait StreamParser<Output> {
    type Message;
    type Error;

    /// Parse a raw protocol message.
    ///
    /// Returns `None` for protocol messages that are safe to skip (eg/ pings).
    fn parse(input: Result<Self::Message, Self::Error>) -> Option<Result<Output, SocketError>>;
}
