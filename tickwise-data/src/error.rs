use crate::symbol::Symbol;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tickwise_integration::{Unrecoverable, error::SocketError};

/// All errors generated in `tickwise-data`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum DataError {
    #[error("feed disconnected: {0}")]
    FeedDisconnected(String),

    #[error("StaleUpdate: time {time} does not follow last bar {last}")]
    StaleUpdate { time: i64, last: i64 },

    #[error("symbol not present in feed catalogue: {0}")]
    UnknownSymbol(Symbol),

    #[error("malformed feed message: {0}")]
    MalformedMessage(String),

    #[error("SocketError: {0}")]
    Socket(String),

    #[error("feed catalogue handshake timeout reached after {secs}s")]
    HandshakeTimeout { secs: u64 },

    #[error("SubscriptionManager terminated")]
    ManagerTerminated,
}

impl DataError {
    /// Determine if an error requires the feed connection to be re-initialised.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DataError::FeedDisconnected(_)
                | DataError::Socket(_)
                | DataError::HandshakeTimeout { .. }
        )
    }
}

impl From<SocketError> for DataError {
    fn from(value: SocketError) -> Self {
        match value {
            SocketError::Deserialise { error, payload } => {
                Self::MalformedMessage(format!("{error}: {payload}"))
            }
            SocketError::Feed(message) => Self::MalformedMessage(message),
            error if error.is_unrecoverable() => Self::FeedDisconnected(error.to_string()),
            error => Self::Socket(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_is_terminal() {
        struct TestCase {
            input: DataError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: is terminal w/ DataError::FeedDisconnected
                input: DataError::from(SocketError::Terminated("1000".to_string())),
                expected: true,
            },
            TestCase {
                // TC1: is terminal w/ DataError::HandshakeTimeout
                input: DataError::HandshakeTimeout { secs: 10 },
                expected: true,
            },
            TestCase {
                // TC2: is not terminal w/ DataError::MalformedMessage
                input: DataError::from(SocketError::Deserialise {
                    error: serde_json::from_str::<u64>("x").unwrap_err(),
                    payload: "x".to_string(),
                }),
                expected: false,
            },
            TestCase {
                // TC3: is not terminal w/ DataError::StaleUpdate
                input: DataError::StaleUpdate { time: 0, last: 60 },
                expected: false,
            },
            TestCase {
                // TC4: is terminal w/ DataError::Socket
                input: DataError::from(SocketError::Subscribe("rejected".to_string())),
                expected: true,
            },
            TestCase {
                // TC5: is not terminal w/ feed error message, the socket stays up
                input: DataError::from(SocketError::Feed("rate limit".to_string())),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_terminal();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_from_socket_error() {
        assert!(matches!(
            DataError::from(SocketError::Sink),
            DataError::FeedDisconnected(_)
        ));
        assert!(matches!(
            DataError::from(SocketError::Feed("busy".to_string())),
            DataError::MalformedMessage(_)
        ));
    }
}
