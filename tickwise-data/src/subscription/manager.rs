use crate::{
    error::DataError,
    event::FeedEvent,
    feed::{
        FeedCatalogue, FeedMessage, FeedRequest,
        transport::{FeedConnection, FeedTransport},
    },
    streams::reconnect::{ReconnectionBackoffPolicy, ReconnectionState},
    subscription::{ConnectionState, FeedStats, Routed, SubscriptionBook},
    symbol::Symbol,
    timeframe::Timeframe,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc, time::Duration};
use tickwise_integration::{
    Validator,
    channel::{Tx, UnboundedRx, UnboundedTx, mpsc_unbounded},
};
use tokio::{
    sync::oneshot,
    time::{Instant, Interval},
};
use tracing::{debug, info, warn};

/// Configuration of a [`SubscriptionManager`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ManagerConfig {
    pub backoff: ReconnectionBackoffPolicy,
    /// Maximum wait for the catalogue after the transport opens.
    pub handshake_timeout: Duration,
    /// Keep-alive [`FeedRequest::Ping`] period, disabled if `None`.
    pub ping_interval: Option<Duration>,
    /// Bars of history requested with each candle subscription.
    pub history_count: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            backoff: ReconnectionBackoffPolicy::fixed_secs(3),
            handshake_timeout: Duration::from_secs(10),
            ping_interval: Some(Duration::from_secs(30)),
            history_count: 300,
        }
    }
}

/// Commands sent from a [`SubscriptionHandle`] to the running [`SubscriptionManager`].
#[derive(Debug)]
pub enum Command {
    Subscribe {
        symbol: Symbol,
        timeframe: Timeframe,
        reply: oneshot::Sender<Result<(), DataError>>,
    },
    Unsubscribe(Symbol),
    SetTimeframe {
        symbol: Symbol,
        timeframe: Timeframe,
    },
    Shutdown,
}

/// Snapshot of the [`SubscriptionManager`] state shared with every [`SubscriptionHandle`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct ManagerStatus {
    pub connection: ConnectionState,
    pub stats: FeedStats,
}

/// Cloneable handle used to control a running [`SubscriptionManager`].
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    command_tx: UnboundedTx<Command>,
    status: Arc<RwLock<ManagerStatus>>,
}

impl SubscriptionHandle {
    /// Add a symbol to the watchlist, waiting for the manager to accept or reject it.
    pub async fn subscribe(&self, symbol: Symbol, timeframe: Timeframe) -> Result<(), DataError> {
        let (reply, response) = oneshot::channel();
        self.command(Command::Subscribe {
            symbol,
            timeframe,
            reply,
        })?;

        response.await.map_err(|_| DataError::ManagerTerminated)?
    }

    pub fn unsubscribe(&self, symbol: Symbol) -> Result<(), DataError> {
        self.command(Command::Unsubscribe(symbol))
    }

    pub fn set_timeframe(&self, symbol: Symbol, timeframe: Timeframe) -> Result<(), DataError> {
        self.command(Command::SetTimeframe { symbol, timeframe })
    }

    /// Request a graceful shutdown. Has no effect if the manager has already stopped.
    pub fn shutdown(&self) {
        let _ = self.command(Command::Shutdown);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status.read().connection
    }

    pub fn feed_stats(&self) -> FeedStats {
        self.status.read().stats
    }

    fn command(&self, command: Command) -> Result<(), DataError> {
        self.command_tx
            .send(command)
            .map_err(|_| DataError::ManagerTerminated)
    }
}

#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    Disconnected(DataError),
}

/// Owns the feed connection lifecycle.
///
/// Connects via the [`FeedTransport`], completes the catalogue handshake, subscribes every
/// watched symbol and routes inbound [`FeedMessage`]s as [`FeedEvent`]s. After any transport
/// close or terminal error it reconnects following the configured
/// [`ReconnectionBackoffPolicy`], re-issuing the full watchlist once the new connection is ready.
///
/// Runs until [`SubscriptionHandle::shutdown`], until every [`SubscriptionHandle`] is dropped, or
/// until the [`FeedEvent`] receiver is dropped.
#[derive(Debug)]
pub struct SubscriptionManager<Transport> {
    transport: Transport,
    config: ManagerConfig,
    control: Control,
}

#[derive(Debug)]
struct Control {
    book: SubscriptionBook,
    command_rx: UnboundedRx<Command>,
    event_tx: UnboundedTx<FeedEvent>,
    status: Arc<RwLock<ManagerStatus>>,
}

impl<Transport> SubscriptionManager<Transport>
where
    Transport: FeedTransport,
{
    pub fn new(
        transport: Transport,
        config: ManagerConfig,
    ) -> (Self, SubscriptionHandle, UnboundedRx<FeedEvent>) {
        let (command_tx, command_rx) = mpsc_unbounded();
        let (event_tx, event_rx) = mpsc_unbounded();
        let status = Arc::new(RwLock::new(ManagerStatus::default()));

        let manager = Self {
            transport,
            control: Control {
                book: SubscriptionBook::new(config.history_count),
                command_rx,
                event_tx,
                status: Arc::clone(&status),
            },
            config,
        };

        let handle = SubscriptionHandle { command_tx, status };

        (manager, handle, event_rx)
    }

    pub async fn run(mut self) {
        info!(
            transport = ?self.transport,
            config = ?self.config,
            "SubscriptionManager running"
        );

        let mut reconnection = ReconnectionState::from(self.config.backoff.clone());

        loop {
            self.control.transition(ConnectionState::Connecting);

            let connection = match self.control.until(self.transport.connect()).await {
                None => break,
                Some(Ok(connection)) => Some(connection),
                Some(Err(error)) => {
                    warn!(%error, "failed to connect to feed");
                    None
                }
            };

            if let Some(mut connection) = connection {
                let end = self.session(&mut connection, &mut reconnection).await;
                connection.close().await;

                match end {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Disconnected(error) => {
                        warn!(%error, "feed connection lost");
                    }
                }
            }

            if !self.control.transition(ConnectionState::Disconnected) {
                break;
            }

            let delay = reconnection.generate_sleep_duration();
            reconnection.multiply_backoff();
            info!(delay_ms = delay.as_millis() as u64, "scheduling feed reconnection");

            if self.control.until(tokio::time::sleep(delay)).await.is_none() {
                break;
            }

            self.control.book.record_reconnect();
            self.control.publish();
        }

        self.control.book.on_disconnect();
        self.control.publish();
        info!("SubscriptionManager stopped");
    }

    async fn session(
        &mut self,
        connection: &mut Transport::Connection,
        reconnection: &mut ReconnectionState,
    ) -> SessionEnd {
        info!("connected to feed, requesting catalogue");
        if !self.control.transition(ConnectionState::Connected) {
            return SessionEnd::Shutdown;
        }
        if let Err(error) = connection.send(FeedRequest::Catalogue).await {
            return SessionEnd::Disconnected(error);
        }

        let timeout = self.config.handshake_timeout;
        let handshake = tokio::time::timeout(timeout, await_catalogue(connection));
        let catalogue = match self.control.until(handshake).await {
            None => return SessionEnd::Shutdown,
            Some(Err(_elapsed)) => {
                return SessionEnd::Disconnected(DataError::HandshakeTimeout {
                    secs: timeout.as_secs(),
                });
            }
            Some(Ok(Err(error))) => return SessionEnd::Disconnected(error),
            Some(Ok(Ok(catalogue))) => catalogue,
        };

        reconnection.reset_backoff();
        info!(
            symbols = catalogue.symbols.len(),
            "feed catalogue received, connection ready"
        );

        let routed = self.control.book.on_catalogue(catalogue.symbols);
        if let Err(end) = self.control.dispatch(connection, routed).await {
            return end;
        }

        let mut ping = self
            .config
            .ping_interval
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                command = self.control.command_rx.recv() => {
                    let Some(requests) = command.and_then(|command| self.control.apply(command)) else {
                        return SessionEnd::Shutdown;
                    };
                    if let Err(end) = self.control.dispatch(connection, Routed { events: Vec::new(), requests }).await {
                        return end;
                    }
                }
                message = connection.recv() => match message {
                    None => {
                        return SessionEnd::Disconnected(DataError::FeedDisconnected(
                            "feed stream ended".to_string(),
                        ));
                    }
                    Some(Ok(message)) => match message.validate() {
                        Ok(message) => {
                            let routed = self.control.book.route(message);
                            if let Err(end) = self.control.dispatch(connection, routed).await {
                                return end;
                            }
                        }
                        Err(error) => {
                            debug!(%error, "dropping invalid feed message");
                            self.control.book.record_malformed();
                            self.control.publish();
                        }
                    },
                    Some(Err(error)) if error.is_terminal() => {
                        return SessionEnd::Disconnected(error);
                    }
                    Some(Err(error)) => {
                        debug!(%error, "dropping malformed feed message");
                        self.control.book.record_malformed();
                        self.control.publish();
                    }
                },
                _ = next_ping(&mut ping) => {
                    if let Err(error) = connection.send(FeedRequest::Ping).await {
                        return SessionEnd::Disconnected(error);
                    }
                }
            }
        }
    }
}

impl Control {
    /// Drive `future` to completion while continuing to apply [`Command`]s.
    ///
    /// Returns `None` if a shutdown was requested, or every [`SubscriptionHandle`] dropped,
    /// before `future` completed.
    async fn until<F>(&mut self, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        tokio::pin!(future);

        loop {
            tokio::select! {
                output = &mut future => return Some(output),
                command = self.command_rx.recv() => {
                    // Requests are only produced while ready, so nothing is lost here
                    command.and_then(|command| self.apply(command))?;
                }
            }
        }
    }

    /// Apply a [`Command`] to the [`SubscriptionBook`], returning the resulting requests or
    /// `None` on shutdown.
    fn apply(&mut self, command: Command) -> Option<Vec<FeedRequest>> {
        let requests = match command {
            Command::Subscribe {
                symbol,
                timeframe,
                reply,
            } => match self.book.subscribe(symbol, timeframe) {
                Ok(requests) => {
                    let _ = reply.send(Ok(()));
                    requests
                }
                Err(error) => {
                    warn!(%error, "rejected subscribe");
                    let _ = reply.send(Err(error));
                    Vec::new()
                }
            },
            Command::Unsubscribe(symbol) => self.book.unsubscribe(&symbol),
            Command::SetTimeframe { symbol, timeframe } => {
                self.book.set_timeframe(&symbol, timeframe)
            }
            Command::Shutdown => {
                info!("SubscriptionManager received shutdown command");
                return None;
            }
        };

        self.publish();
        Some(requests)
    }

    /// Emit routed events and send routed requests.
    async fn dispatch<Connection>(
        &mut self,
        connection: &mut Connection,
        routed: Routed,
    ) -> Result<(), SessionEnd>
    where
        Connection: FeedConnection,
    {
        self.publish();

        for event in routed.events {
            if !self.emit(event) {
                return Err(SessionEnd::Shutdown);
            }
        }

        for request in routed.requests {
            connection
                .send(request)
                .await
                .map_err(SessionEnd::Disconnected)?;
        }

        Ok(())
    }

    /// Move the [`SubscriptionBook`] to `state`, notifying consumers. Returns `false` if the
    /// [`FeedEvent`] receiver has been dropped.
    fn transition(&mut self, state: ConnectionState) -> bool {
        match state {
            ConnectionState::Disconnected => self.book.on_disconnect(),
            ConnectionState::Connecting => self.book.on_connecting(),
            ConnectionState::Connected => {
                self.book.on_connected();
            }
            ConnectionState::Ready => {}
        }

        self.publish();
        self.emit(FeedEvent::Connection(state))
    }

    fn emit(&mut self, event: FeedEvent) -> bool {
        if self.event_tx.send(event).is_err() {
            warn!("FeedEvent receiver dropped, stopping SubscriptionManager");
            false
        } else {
            true
        }
    }

    fn publish(&self) {
        let mut status = self.status.write();
        status.connection = self.book.connection();
        status.stats = self.book.stats();
    }
}

/// Wait for the [`FeedCatalogue`] that completes the connection handshake.
async fn await_catalogue<Connection>(
    connection: &mut Connection,
) -> Result<FeedCatalogue, DataError>
where
    Connection: FeedConnection,
{
    loop {
        match connection.recv().await {
            None => {
                return Err(DataError::FeedDisconnected(
                    "feed closed during handshake".to_string(),
                ));
            }
            Some(Ok(FeedMessage::Catalogue(catalogue))) => return Ok(catalogue),
            Some(Ok(FeedMessage::Error(error))) => {
                warn!(message = %error.message, "feed reported error during handshake");
            }
            Some(Ok(message)) => {
                debug!(?message, "ignoring feed message received before catalogue");
            }
            Some(Err(error)) if error.is_terminal() => return Err(error),
            Some(Err(error)) => {
                debug!(%error, "dropping malformed feed message during handshake");
            }
        }
    }
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_errors_once_manager_dropped() {
        #[derive(Debug)]
        struct Unreachable;

        #[async_trait::async_trait]
        impl FeedTransport for Unreachable {
            type Connection = crate::feed::transport::WebSocketConnection;

            async fn connect(&self) -> Result<Self::Connection, DataError> {
                Err(DataError::Socket("unreachable".to_string()))
            }
        }

        let (manager, handle, _events) =
            SubscriptionManager::new(Unreachable, ManagerConfig::default());
        drop(manager);

        assert_eq!(
            handle
                .subscribe(Symbol::from("R_100"), Timeframe::M1)
                .await,
            Err(DataError::ManagerTerminated)
        );
        assert_eq!(
            handle.unsubscribe(Symbol::from("R_100")),
            Err(DataError::ManagerTerminated)
        );
        assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_accepted_while_disconnected() {
        #[derive(Debug)]
        struct Unreachable;

        #[async_trait::async_trait]
        impl FeedTransport for Unreachable {
            type Connection = crate::feed::transport::WebSocketConnection;

            async fn connect(&self) -> Result<Self::Connection, DataError> {
                Err(DataError::Socket("unreachable".to_string()))
            }
        }

        let (manager, handle, _events) =
            SubscriptionManager::new(Unreachable, ManagerConfig::default());
        let task = tokio::spawn(manager.run());

        assert_eq!(
            handle
                .subscribe(Symbol::from("R_100"), Timeframe::M1)
                .await,
            Ok(())
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(handle.feed_stats().reconnects >= 1);

        handle.shutdown();
        task.await.unwrap();
        assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
    }
}
