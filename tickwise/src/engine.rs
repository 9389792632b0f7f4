use crate::{
    config::EngineConfig,
    error::EngineError,
    market::MarketProcessor,
    signal::{
        Signal,
        condition::{ConditionId, SignalCondition},
        rules::SignalRuleEngine,
    },
    sink::SignalSink,
};
use std::sync::Arc;
use tickwise_data::{
    event::FeedEvent,
    feed::transport::FeedTransport,
    subscription::{
        ConnectionState, FeedStats,
        manager::{SubscriptionHandle, SubscriptionManager},
    },
    symbol::Symbol,
    timeframe::Timeframe,
};
use tickwise_integration::channel::UnboundedRx;
use tickwise_ta::{Candle, patterns::CandlePattern, snapshot::IndicatorSnapshot};
use tokio::task::JoinHandle;
use tracing::info;

/// Process-scoped market-data and technical-analysis engine.
///
/// Constructed once with [`MarketEngine::init`], which spawns two tasks:
/// - the feed [`SubscriptionManager`], owning the connection lifecycle.
/// - the dispatcher, applying every [`FeedEvent`] to the per-symbol series, recomputing
///   indicators and patterns, and evaluating signal rules on closed bars.
///
/// The query surface ([`get_snapshot`](Self::get_snapshot), [`get_patterns`](Self::get_patterns),
/// [`get_recent_signals`](Self::get_recent_signals), ...) is synchronous and always reflects the
/// latest processed event. [`MarketEngine::shutdown`] stops the manager, closing the transport,
/// and joins both tasks.
#[derive(Debug)]
pub struct MarketEngine<Sink> {
    processor: Arc<MarketProcessor<Sink>>,
    handle: SubscriptionHandle,
    timeframe: Timeframe,
    manager: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl<Sink> MarketEngine<Sink>
where
    Sink: SignalSink,
{
    /// Spawn the engine tasks and subscribe the configured initial watchlist.
    pub async fn init<Transport>(
        config: EngineConfig,
        transport: Transport,
        sink: Sink,
    ) -> Result<Self, EngineError>
    where
        Transport: FeedTransport,
    {
        let rules = SignalRuleEngine::new(
            config.conditions.iter().cloned(),
            config.history_cap,
            config.dedup_window_secs,
        );
        let processor = Arc::new(MarketProcessor::new(rules, sink, config.retention_bars));

        let (manager, handle, events) = SubscriptionManager::new(transport, config.manager_config());
        let manager = tokio::spawn(manager.run());
        let dispatcher = tokio::spawn(dispatch(Arc::clone(&processor), events));

        let engine = Self {
            processor,
            handle,
            timeframe: config.timeframe,
            manager,
            dispatcher,
        };

        let symbols = config.symbols.len();
        for symbol in config.symbols {
            engine.subscribe(symbol, None).await?;
        }

        info!(
            symbols,
            conditions = config.conditions.len(),
            "MarketEngine initialised"
        );

        Ok(engine)
    }

    /// Add `symbol` to the watchlist at `timeframe`, or the configured default.
    ///
    /// Subscribing an already watched symbol is a no-op. Once the feed catalogue is known an
    /// unlisted symbol is rejected with
    /// [`DataError::UnknownSymbol`](tickwise_data::error::DataError::UnknownSymbol).
    pub async fn subscribe(
        &self,
        symbol: Symbol,
        timeframe: Option<Timeframe>,
    ) -> Result<(), EngineError> {
        let timeframe = timeframe.unwrap_or(self.timeframe);

        // Track the series first so the seed history is never raced
        let inserted = self.processor.insert(symbol.clone(), timeframe);

        if let Err(error) = self.handle.subscribe(symbol.clone(), timeframe).await {
            if inserted {
                self.processor.remove(&symbol);
            }
            return Err(error.into());
        }

        Ok(())
    }

    /// Remove `symbol` from the watchlist, forgetting its feed subscriptions and series.
    pub fn unsubscribe(&self, symbol: &Symbol) -> Result<(), EngineError> {
        self.processor.remove(symbol);
        self.handle.unsubscribe(symbol.clone())?;
        Ok(())
    }

    /// Switch the candle stream of a watched `symbol`, discarding its series until the new
    /// history arrives.
    pub fn set_timeframe(&self, symbol: &Symbol, timeframe: Timeframe) -> Result<(), EngineError> {
        if self.processor.set_timeframe(symbol, timeframe) {
            self.handle.set_timeframe(symbol.clone(), timeframe)?;
        }
        Ok(())
    }

    /// Seed the series of a watched `symbol` with externally fetched history, returning the
    /// resulting series length.
    pub fn seed<Iter>(&self, symbol: &Symbol, history: Iter) -> Result<usize, EngineError>
    where
        Iter: IntoIterator<Item = Candle>,
    {
        Ok(self.processor.seed(symbol, history)?)
    }

    pub fn get_snapshot(&self, symbol: &Symbol, timeframe: Timeframe) -> Option<IndicatorSnapshot> {
        self.processor
            .with_market(symbol, |market| {
                (market.timeframe() == timeframe)
                    .then(|| market.snapshot().copied())
                    .flatten()
            })
            .flatten()
    }

    pub fn get_patterns(&self, symbol: &Symbol, timeframe: Timeframe) -> Vec<CandlePattern> {
        self.processor
            .with_market(symbol, |market| {
                if market.timeframe() == timeframe {
                    market.patterns().to_vec()
                } else {
                    Vec::new()
                }
            })
            .unwrap_or_default()
    }

    /// Last `n` bars of the series of `symbol`.
    pub fn get_candles(&self, symbol: &Symbol, n: usize) -> Vec<Candle> {
        self.processor
            .with_market(symbol, |market| market.tail(n).to_vec())
            .unwrap_or_default()
    }

    /// Recent signals, newest first, optionally filtered by symbol.
    pub fn get_recent_signals(&self, symbol: Option<&Symbol>) -> Vec<Signal> {
        self.processor.rules().lock().recent(symbol)
    }

    pub fn list_conditions(&self) -> Vec<SignalCondition> {
        self.processor.rules().lock().conditions()
    }

    /// Flip a condition on or off, returning whether it is now enabled.
    pub fn toggle_condition(&self, id: &ConditionId) -> Result<bool, EngineError> {
        self.processor.rules().lock().toggle(id)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.handle.connection_state()
    }

    /// Feed health counters, including updates dropped by the series normaliser.
    pub fn feed_stats(&self) -> FeedStats {
        let mut stats = self.handle.feed_stats();
        stats.stale += self.processor.stale();
        stats.malformed += self.processor.malformed();
        stats
    }

    /// Stop the feed manager, closing the transport, and join the engine tasks.
    pub async fn shutdown(self) -> Result<(), EngineError> {
        info!("MarketEngine shutting down");
        self.handle.shutdown();

        self.manager.await?;
        self.dispatcher.await?;

        info!("MarketEngine stopped");
        Ok(())
    }
}

/// Apply every [`FeedEvent`] until the [`SubscriptionManager`] stops.
async fn dispatch<Sink>(processor: Arc<MarketProcessor<Sink>>, mut events: UnboundedRx<FeedEvent>)
where
    Sink: SignalSink,
{
    while let Some(event) = events.recv().await {
        processor.process(event);
    }

    info!("feed event stream ended");
}
