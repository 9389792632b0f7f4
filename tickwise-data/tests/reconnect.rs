use async_trait::async_trait;
use std::time::Duration;
use tickwise_data::{
    error::DataError,
    event::FeedEvent,
    feed::{
        CatalogueEntry, FeedCatalogue, FeedMessage, FeedRequest, FeedTick,
        transport::{FeedConnection, FeedTransport},
    },
    streams::reconnect::ReconnectionBackoffPolicy,
    subscription::{
        ConnectionState,
        manager::{ManagerConfig, SubscriptionManager},
    },
    symbol::Symbol,
    timeframe::Timeframe,
};
use tickwise_integration::subscription::SubscriptionId;
use tokio::sync::mpsc;

/// Server side of an in-memory feed connection.
#[derive(Debug)]
struct Remote {
    requests: mpsc::UnboundedReceiver<FeedRequest>,
    messages: mpsc::UnboundedSender<FeedMessage>,
}

impl Remote {
    async fn expect(&mut self, count: usize) -> Vec<FeedRequest> {
        let mut requests = Vec::with_capacity(count);
        for _ in 0..count {
            requests.push(self.requests.recv().await.unwrap());
        }
        requests
    }

    fn send(&self, message: FeedMessage) {
        self.messages.send(message).unwrap();
    }
}

#[derive(Debug)]
struct MockTransport {
    remotes: mpsc::UnboundedSender<Remote>,
}

#[derive(Debug)]
struct MockConnection {
    requests: mpsc::UnboundedSender<FeedRequest>,
    messages: mpsc::UnboundedReceiver<FeedMessage>,
}

#[async_trait]
impl FeedTransport for MockTransport {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<Self::Connection, DataError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        self.remotes
            .send(Remote {
                requests: request_rx,
                messages: message_tx,
            })
            .map_err(|_| DataError::Socket("test finished".to_string()))?;

        Ok(MockConnection {
            requests: request_tx,
            messages: message_rx,
        })
    }
}

#[async_trait]
impl FeedConnection for MockConnection {
    async fn send(&mut self, request: FeedRequest) -> Result<(), DataError> {
        self.requests
            .send(request)
            .map_err(|_| DataError::FeedDisconnected("remote dropped".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<FeedMessage, DataError>> {
        self.messages.recv().await.map(Ok)
    }

    async fn close(&mut self) {}
}

fn catalogue(symbols: &[&str]) -> FeedMessage {
    FeedMessage::Catalogue(FeedCatalogue {
        symbols: symbols
            .iter()
            .map(|symbol| CatalogueEntry {
                symbol: Symbol::from(*symbol),
                display_name: None,
                market: None,
            })
            .collect(),
    })
}

fn config() -> ManagerConfig {
    ManagerConfig {
        backoff: ReconnectionBackoffPolicy::fixed_secs(3),
        handshake_timeout: Duration::from_secs(10),
        ping_interval: None,
        history_count: 50,
    }
}

fn subscriptions(requests: &[FeedRequest]) -> (Vec<Symbol>, Vec<Symbol>) {
    let mut ticks = Vec::new();
    let mut candles = Vec::new();
    for request in requests {
        match request {
            FeedRequest::SubscribeTicks { symbol, .. } => ticks.push(symbol.clone()),
            FeedRequest::SubscribeCandles { symbol, count, .. } => {
                assert_eq!(*count, 50);
                candles.push(symbol.clone())
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }
    ticks.sort();
    candles.sort();
    (ticks, candles)
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_resubscribes_whole_watchlist_exactly_once() {
    let (remote_tx, mut remote_rx) = mpsc::unbounded_channel();
    let (manager, handle, mut events) =
        SubscriptionManager::new(MockTransport { remotes: remote_tx }, config());
    let task = tokio::spawn(manager.run());

    let watched = ["R_10", "R_50", "R_100"];
    for symbol in watched {
        handle
            .subscribe(Symbol::from(symbol), Timeframe::M1)
            .await
            .unwrap();
    }

    let mut expected = watched.map(Symbol::from).to_vec();
    expected.sort();

    // First connection: handshake then one subscription pair per watched symbol
    let mut remote = remote_rx.recv().await.unwrap();
    assert_eq!(remote.expect(1).await, vec![FeedRequest::Catalogue]);
    remote.send(catalogue(&["R_10", "R_25", "R_50", "R_100"]));

    let (ticks, candles) = subscriptions(&remote.expect(6).await);
    assert_eq!(ticks, expected);
    assert_eq!(candles, expected);
    assert!(remote.requests.try_recv().is_err());
    assert_eq!(handle.connection_state(), ConnectionState::Ready);

    remote.send(FeedMessage::Tick(FeedTick {
        symbol: Symbol::from("R_10"),
        price: 6512.25,
        time: 1_700_000_000,
        id: Some(SubscriptionId::from("t1")),
    }));

    // Drop the connection
    drop(remote);

    let mut remote = remote_rx.recv().await.unwrap();
    assert_eq!(handle.feed_stats().reconnects, 1);
    assert_eq!(remote.expect(1).await, vec![FeedRequest::Catalogue]);
    remote.send(catalogue(&["R_10", "R_25", "R_50", "R_100"]));

    let (ticks, candles) = subscriptions(&remote.expect(6).await);
    assert_eq!(ticks, expected);
    assert_eq!(candles, expected);
    assert!(remote.requests.try_recv().is_err());

    handle.shutdown();
    task.await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.rx.try_recv() {
        received.push(event);
    }

    assert!(received.contains(&FeedEvent::Tick {
        symbol: Symbol::from("R_10"),
        price: 6512.25,
        time: 1_700_000_000,
    }));

    let connection_states = received
        .iter()
        .filter_map(|event| match event {
            FeedEvent::Connection(state) => Some(*state),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(
        connection_states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Ready,
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Ready,
        ]
    );
    assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_handshake_timeout_triggers_reconnect() {
    let (remote_tx, mut remote_rx) = mpsc::unbounded_channel();
    let (manager, handle, _events) =
        SubscriptionManager::new(MockTransport { remotes: remote_tx }, config());
    let task = tokio::spawn(manager.run());

    // Never answer the catalogue request
    let mut silent = remote_rx.recv().await.unwrap();
    assert_eq!(silent.expect(1).await, vec![FeedRequest::Catalogue]);

    let mut remote = remote_rx.recv().await.unwrap();
    assert_eq!(handle.feed_stats().reconnects, 1);
    assert_eq!(remote.expect(1).await, vec![FeedRequest::Catalogue]);
    remote.send(catalogue(&["R_100"]));
    while handle.connection_state() != ConnectionState::Ready {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        handle.subscribe(Symbol::from("R_999"), Timeframe::M1).await,
        Err(DataError::UnknownSymbol(Symbol::from("R_999")))
    );

    handle.shutdown();
    task.await.unwrap();
    drop(silent);
}
