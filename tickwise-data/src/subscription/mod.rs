use crate::{
    error::DataError,
    event::FeedEvent,
    feed::{CatalogueEntry, FeedCandle, FeedHistory, FeedMessage, FeedRequest, FeedTick},
    symbol::Symbol,
    timeframe::Timeframe,
};
use derive_more::Display;
use fnv::FnvHashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tickwise_integration::subscription::SubscriptionId;
use tracing::{debug, info, warn};

/// Async task driving a [`SubscriptionBook`] over a live feed connection.
pub mod manager;

/// Feed connection lifecycle.
///
/// `Disconnected → Connecting → Connected → Ready`, falling back to `Disconnected` on any
/// transport close or error. `Ready` is only reached once the symbol catalogue handshake has
/// completed.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    #[display("disconnected")]
    Disconnected,
    #[display("connecting")]
    Connecting,
    #[display("connected")]
    Connected,
    #[display("ready")]
    Ready,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionHealth {
    /// Requested, but no data observed since the last (re)subscribe.
    Pending,
    Streaming,
}

/// Per-symbol feed subscription bookkeeping.
///
/// Subscription ids and request ids are bound to a single connection and are cleared on every
/// disconnect; the watchlist entry itself survives until the symbol is unsubscribed.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionState {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub tick_id: Option<SubscriptionId>,
    pub candle_id: Option<SubscriptionId>,
    pub tick_req_id: Option<u64>,
    pub candle_req_id: Option<u64>,
    /// A replaced candle subscription may still be streaming under an id never learned. Until
    /// history answering `candle_req_id` identifies the new stream, candle data is dropped.
    pub candle_superseded: bool,
    pub health: SubscriptionHealth,
}

impl SubscriptionState {
    fn new(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self {
            symbol,
            timeframe,
            tick_id: None,
            candle_id: None,
            tick_req_id: None,
            candle_req_id: None,
            candle_superseded: false,
            health: SubscriptionHealth::Pending,
        }
    }

    fn reset(&mut self) {
        self.tick_id = None;
        self.candle_id = None;
        self.tick_req_id = None;
        self.candle_req_id = None;
        self.candle_superseded = false;
        self.health = SubscriptionHealth::Pending;
    }
}

/// Feed health counters.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Deserialize, Serialize)]
pub struct FeedStats {
    /// Unparseable or invalid feed payloads dropped.
    pub malformed: u64,
    /// Out-of-order ticks and candles dropped.
    pub stale: u64,
    /// Reconnection attempts after the feed connection was lost.
    pub reconnects: u64,
    /// Server-side subscriptions forgotten because nothing was watching them.
    pub orphans_forgotten: u64,
}

/// Output of routing a [`FeedMessage`] through the [`SubscriptionBook`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routed {
    /// Events for downstream consumers.
    pub events: Vec<FeedEvent>,
    /// Requests that must be sent back to the feed.
    pub requests: Vec<FeedRequest>,
}

impl Routed {
    fn event(event: FeedEvent) -> Self {
        Self {
            events: vec![event],
            requests: Vec::new(),
        }
    }

    fn request(request: FeedRequest) -> Self {
        Self {
            events: Vec::new(),
            requests: vec![request],
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum StreamKind {
    Ticks,
    Candles,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Acceptance {
    Accepted(Timeframe),
    Dropped,
    Forget(SubscriptionId),
}

/// Synchronous core of the subscription state machine.
///
/// Owns the in-memory watchlist (the source of truth for what must be subscribed), the feed
/// catalogue, and the [`ConnectionState`]. Every operation returns the [`FeedRequest`]s that must
/// be sent to the feed, leaving all IO to the
/// [`SubscriptionManager`](manager::SubscriptionManager).
#[derive(Debug, Clone)]
pub struct SubscriptionBook {
    watchlist: IndexMap<Symbol, SubscriptionState>,
    catalogue: Option<IndexMap<Symbol, CatalogueEntry>>,
    retired: FnvHashSet<SubscriptionId>,
    connection: ConnectionState,
    history_count: usize,
    next_req_id: u64,
    stats: FeedStats,
}

impl SubscriptionBook {
    /// Construct an empty [`SubscriptionBook`] that requests `history_count` bars when seeding
    /// each candle subscription.
    pub fn new(history_count: usize) -> Self {
        Self {
            watchlist: IndexMap::new(),
            catalogue: None,
            retired: FnvHashSet::default(),
            connection: ConnectionState::Disconnected,
            history_count,
            next_req_id: 1,
            stats: FeedStats::default(),
        }
    }

    /// Add a symbol to the watchlist.
    ///
    /// Subscribing an already watched symbol is a no-op. Once the catalogue is known, a symbol
    /// absent from it is rejected with [`DataError::UnknownSymbol`]. Subscribe requests are only
    /// produced while [`ConnectionState::Ready`]; otherwise they are issued when the connection
    /// next becomes ready.
    pub fn subscribe(
        &mut self,
        symbol: Symbol,
        timeframe: Timeframe,
    ) -> Result<Vec<FeedRequest>, DataError> {
        if self.watchlist.contains_key(&symbol) {
            debug!(%symbol, "ignoring subscribe for already watched symbol");
            return Ok(Vec::new());
        }

        if let Some(catalogue) = &self.catalogue {
            if !catalogue.contains_key(&symbol) {
                return Err(DataError::UnknownSymbol(symbol));
            }
        }

        info!(%symbol, %timeframe, "adding symbol to watchlist");
        self.watchlist
            .insert(symbol.clone(), SubscriptionState::new(symbol.clone(), timeframe));

        if self.connection == ConnectionState::Ready {
            Ok(self.issue_subscriptions(&symbol))
        } else {
            Ok(Vec::new())
        }
    }

    /// Remove a symbol from the watchlist, forgetting both its tick and candle subscriptions.
    ///
    /// Unsubscribing an unwatched symbol is a no-op.
    pub fn unsubscribe(&mut self, symbol: &Symbol) -> Vec<FeedRequest> {
        let Some(state) = self.watchlist.shift_remove(symbol) else {
            debug!(%symbol, "ignoring unsubscribe for unwatched symbol");
            return Vec::new();
        };

        info!(%symbol, "removing symbol from watchlist");
        [state.tick_id, state.candle_id]
            .into_iter()
            .flatten()
            .map(|id| self.retire(id))
            .collect()
    }

    /// Switch the candle stream of a watched symbol to a new [`Timeframe`].
    ///
    /// The previous candle subscription is forgotten and any history still in flight for it is
    /// discarded on arrival.
    pub fn set_timeframe(&mut self, symbol: &Symbol, timeframe: Timeframe) -> Vec<FeedRequest> {
        let Some(state) = self.watchlist.get_mut(symbol) else {
            return Vec::new();
        };

        if state.timeframe == timeframe {
            return Vec::new();
        }

        info!(%symbol, from = %state.timeframe, to = %timeframe, "changing symbol timeframe");
        state.timeframe = timeframe;
        let previous = state.candle_id.take();
        if previous.is_none() && state.candle_req_id.take().is_some() {
            state.candle_superseded = true;
        }

        let mut requests = previous
            .into_iter()
            .map(|id| self.retire(id))
            .collect::<Vec<_>>();

        if self.connection == ConnectionState::Ready {
            requests.extend(self.issue_candles(symbol));
        }

        requests
    }

    pub fn on_connecting(&mut self) {
        self.connection = ConnectionState::Connecting;
    }

    /// Transport opened: request the catalogue to complete the handshake.
    pub fn on_connected(&mut self) -> FeedRequest {
        self.connection = ConnectionState::Connected;
        FeedRequest::Catalogue
    }

    /// Catalogue received: prune watched symbols the feed does not list, move to
    /// [`ConnectionState::Ready`] and, if this completes a handshake, re-issue every
    /// subscription in the watchlist.
    pub fn on_catalogue(&mut self, entries: Vec<CatalogueEntry>) -> Routed {
        let catalogue = entries
            .into_iter()
            .map(|entry| (entry.symbol.clone(), entry))
            .collect::<IndexMap<_, _>>();

        let rejected = self
            .watchlist
            .keys()
            .filter(|symbol| !catalogue.contains_key(*symbol))
            .cloned()
            .collect::<Vec<_>>();

        self.catalogue = Some(catalogue);

        let mut routed = Routed::default();
        for symbol in rejected {
            warn!(%symbol, "dropping watched symbol absent from feed catalogue");
            routed.requests.extend(self.unsubscribe(&symbol));
            routed.events.push(FeedEvent::Rejected(symbol));
        }

        if self.connection == ConnectionState::Ready {
            return routed;
        }

        self.connection = ConnectionState::Ready;
        routed
            .events
            .push(FeedEvent::Connection(ConnectionState::Ready));

        let symbols = self.watchlist.keys().cloned().collect::<Vec<_>>();
        for symbol in symbols {
            routed.requests.extend(self.issue_subscriptions(&symbol));
        }

        routed
    }

    /// Transport closed: every connection-bound id is invalid from here on.
    pub fn on_disconnect(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.retired.clear();
        self.watchlist.values_mut().for_each(SubscriptionState::reset);
    }

    /// Route an inbound [`FeedMessage`] to the watched symbol it belongs to.
    pub fn route(&mut self, message: FeedMessage) -> Routed {
        match message {
            FeedMessage::Tick(tick) => self.route_tick(tick),
            FeedMessage::Candle(candle) => self.route_candle(candle),
            FeedMessage::History(history) => self.route_history(history),
            FeedMessage::Catalogue(catalogue) => self.on_catalogue(catalogue.symbols),
            FeedMessage::Pong => {
                debug!("received feed Pong");
                Routed::default()
            }
            FeedMessage::Error(error) => {
                let symbol = error.req_id.and_then(|req_id| self.symbol_for_req_id(req_id));
                warn!(?symbol, message = %error.message, req_id = ?error.req_id, "feed reported error");
                Routed::default()
            }
        }
    }

    fn route_tick(&mut self, tick: FeedTick) -> Routed {
        match self.accept(&tick.symbol, StreamKind::Ticks, tick.id.as_ref()) {
            Acceptance::Accepted(_) => Routed::event(FeedEvent::Tick {
                symbol: tick.symbol,
                price: tick.price,
                time: tick.time,
            }),
            Acceptance::Dropped => Routed::default(),
            Acceptance::Forget(id) => Routed::request(FeedRequest::Forget { id }),
        }
    }

    fn route_candle(&mut self, candle: FeedCandle) -> Routed {
        match self.accept(&candle.symbol, StreamKind::Candles, candle.id.as_ref()) {
            Acceptance::Accepted(timeframe) => Routed::event(FeedEvent::Candle {
                symbol: candle.symbol,
                timeframe,
                candle: candle.bar.into(),
            }),
            Acceptance::Dropped => Routed::default(),
            Acceptance::Forget(id) => Routed::request(FeedRequest::Forget { id }),
        }
    }

    fn route_history(&mut self, history: FeedHistory) -> Routed {
        if let (Some(req_id), Some(state)) =
            (history.req_id, self.watchlist.get_mut(&history.symbol))
        {
            if state.candle_req_id != Some(req_id) {
                debug!(
                    symbol = %history.symbol,
                    req_id,
                    expected = ?state.candle_req_id,
                    "discarding late history for superseded request"
                );
                return match history.id {
                    Some(id) if !self.retired.contains(&id) => Routed::request(self.retire(id)),
                    _ => Routed::default(),
                };
            }

            state.candle_superseded = false;
        }

        match self.accept(&history.symbol, StreamKind::Candles, history.id.as_ref()) {
            Acceptance::Accepted(timeframe) => Routed::event(FeedEvent::History {
                symbol: history.symbol,
                timeframe,
                candles: history.candles.into_iter().map(Into::into).collect(),
            }),
            Acceptance::Dropped => Routed::default(),
            Acceptance::Forget(id) => Routed::request(FeedRequest::Forget { id }),
        }
    }

    /// Decide whether a stream message belongs to a live subscription, learning the stream's
    /// [`SubscriptionId`] from its first message.
    fn accept(
        &mut self,
        symbol: &Symbol,
        kind: StreamKind,
        id: Option<&SubscriptionId>,
    ) -> Acceptance {
        if let Some(id) = id {
            if self.retired.contains(id) {
                debug!(%symbol, %id, "dropping message from forgotten subscription");
                return Acceptance::Dropped;
            }
        }

        let Some(state) = self.watchlist.get_mut(symbol) else {
            return match id {
                Some(id) => self.forget_orphan(symbol, id.clone()),
                None => {
                    debug!(%symbol, "dropping message for unwatched symbol");
                    Acceptance::Dropped
                }
            };
        };

        if kind == StreamKind::Candles && state.candle_superseded {
            debug!(%symbol, id = ?id, "dropping candle data until the new stream is identified");
            return Acceptance::Dropped;
        }

        let slot = match kind {
            StreamKind::Ticks => &mut state.tick_id,
            StreamKind::Candles => &mut state.candle_id,
        };

        match (slot.as_ref(), id) {
            (Some(current), Some(id)) if current != id => {
                let id = id.clone();
                return self.forget_orphan(symbol, id);
            }
            (None, Some(id)) => *slot = Some(id.clone()),
            _ => {}
        }

        state.health = SubscriptionHealth::Streaming;
        Acceptance::Accepted(state.timeframe)
    }

    fn forget_orphan(&mut self, symbol: &Symbol, id: SubscriptionId) -> Acceptance {
        warn!(%symbol, %id, "forgetting orphaned feed subscription");
        self.stats.orphans_forgotten += 1;
        self.retired.insert(id.clone());
        Acceptance::Forget(id)
    }

    fn retire(&mut self, id: SubscriptionId) -> FeedRequest {
        self.retired.insert(id.clone());
        FeedRequest::Forget { id }
    }

    fn issue_subscriptions(&mut self, symbol: &Symbol) -> Vec<FeedRequest> {
        let mut requests = self.issue_ticks(symbol).into_iter().collect::<Vec<_>>();
        requests.extend(self.issue_candles(symbol));
        requests
    }

    fn issue_ticks(&mut self, symbol: &Symbol) -> Option<FeedRequest> {
        let req_id = self.next_req_id();
        let state = self.watchlist.get_mut(symbol)?;
        state.tick_req_id = Some(req_id);
        state.health = SubscriptionHealth::Pending;

        Some(FeedRequest::SubscribeTicks {
            symbol: symbol.clone(),
            req_id,
        })
    }

    fn issue_candles(&mut self, symbol: &Symbol) -> Option<FeedRequest> {
        let req_id = self.next_req_id();
        let count = self.history_count;
        let state = self.watchlist.get_mut(symbol)?;
        state.candle_req_id = Some(req_id);
        state.health = SubscriptionHealth::Pending;

        Some(FeedRequest::SubscribeCandles {
            symbol: symbol.clone(),
            granularity: state.timeframe.secs(),
            count,
            req_id,
        })
    }

    fn next_req_id(&mut self) -> u64 {
        let req_id = self.next_req_id;
        self.next_req_id += 1;
        req_id
    }

    fn symbol_for_req_id(&self, req_id: u64) -> Option<&Symbol> {
        self.watchlist
            .values()
            .find(|state| state.tick_req_id == Some(req_id) || state.candle_req_id == Some(req_id))
            .map(|state| &state.symbol)
    }

    pub fn record_malformed(&mut self) {
        self.stats.malformed += 1;
    }

    pub fn record_reconnect(&mut self) {
        self.stats.reconnects += 1;
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&SubscriptionState> {
        self.watchlist.get(symbol)
    }

    /// Watched symbols in subscription order.
    pub fn watchlist(&self) -> impl Iterator<Item = &SubscriptionState> {
        self.watchlist.values()
    }

    pub fn catalogue(&self) -> Option<&IndexMap<Symbol, CatalogueEntry>> {
        self.catalogue.as_ref()
    }
}
