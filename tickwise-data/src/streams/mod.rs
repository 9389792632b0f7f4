/// [`ReconnectionBackoffPolicy`](reconnect::ReconnectionBackoffPolicy) governing the delay
/// between feed reconnection attempts.
pub mod reconnect;
