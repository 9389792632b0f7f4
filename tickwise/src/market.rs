use crate::{
    signal::{Signal, rules::SignalRuleEngine},
    sink::SignalSink,
};
use fnv::FnvHashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tickwise_data::{
    error::DataError, event::FeedEvent, normalizer::StreamNormalizer, series::SeriesUpdate,
    symbol::Symbol, timeframe::Timeframe,
};
use tickwise_ta::{
    Candle,
    patterns::{CandlePattern, recognise},
    snapshot::IndicatorSnapshot,
};
use tracing::{debug, info, warn};

/// Bars inspected by the pattern recogniser.
const PATTERN_TAIL: usize = 3;

/// Live analysis state of one watched symbol.
#[derive(Debug, Clone)]
pub struct Market {
    normalizer: StreamNormalizer,
    snapshot: Option<IndicatorSnapshot>,
    patterns: Vec<CandlePattern>,
}

impl Market {
    fn new(timeframe: Timeframe, retention: usize) -> Self {
        Self {
            normalizer: StreamNormalizer::new(timeframe, retention),
            snapshot: None,
            patterns: Vec::new(),
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.normalizer.timeframe()
    }

    pub fn snapshot(&self) -> Option<&IndicatorSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn patterns(&self) -> &[CandlePattern] {
        &self.patterns
    }

    pub fn tail(&self, n: usize) -> &[Candle] {
        self.normalizer.series().tail(n)
    }

    /// Recompute the snapshot and patterns at the latest (possibly still open) bar.
    fn refresh(&mut self) {
        let candles = self.normalizer.series().candles();
        self.snapshot = IndicatorSnapshot::compute(candles);
        self.patterns = recognise(self.normalizer.series().tail(PATTERN_TAIL));
    }

    /// Snapshot and patterns at the latest closed bar, ie/ every bar but the last.
    fn closed(&self) -> Option<(IndicatorSnapshot, Vec<CandlePattern>)> {
        let candles = self.normalizer.series().candles();
        let closed = candles.get(..candles.len().checked_sub(1)?)?;
        let snapshot = IndicatorSnapshot::compute(closed)?;
        let patterns = recognise(&closed[closed.len().saturating_sub(PATTERN_TAIL)..]);
        Some((snapshot, patterns))
    }
}

/// Applies [`FeedEvent`]s to per-symbol [`Market`]s and evaluates signal rules on every newly
/// closed bar.
///
/// Each [`Market`] sits behind its own lock, so updates to one series are serialised while
/// different symbols may be processed in parallel.
#[derive(Debug)]
pub struct MarketProcessor<Sink> {
    markets: RwLock<FnvHashMap<Symbol, Arc<Mutex<Market>>>>,
    rules: Mutex<SignalRuleEngine>,
    sink: Sink,
    retention: usize,
    stale: AtomicU64,
    malformed: AtomicU64,
}

impl<Sink> MarketProcessor<Sink>
where
    Sink: SignalSink,
{
    pub fn new(rules: SignalRuleEngine, sink: Sink, retention: usize) -> Self {
        Self {
            markets: RwLock::new(FnvHashMap::default()),
            rules: Mutex::new(rules),
            sink,
            retention,
            stale: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
        }
    }

    /// Start tracking `symbol`, returning `false` if it was already tracked.
    pub fn insert(&self, symbol: Symbol, timeframe: Timeframe) -> bool {
        let mut markets = self.markets.write();
        if markets.contains_key(&symbol) {
            return false;
        }

        markets.insert(
            symbol,
            Arc::new(Mutex::new(Market::new(timeframe, self.retention))),
        );
        true
    }

    /// Stop tracking `symbol`. Late events for it are discarded from here on.
    pub fn remove(&self, symbol: &Symbol) -> bool {
        let removed = self.markets.write().remove(symbol).is_some();
        if removed {
            self.rules.lock().forget_symbol(symbol);
        }
        removed
    }

    /// Switch `symbol` to a new [`Timeframe`], discarding its series until a fresh seed.
    pub fn set_timeframe(&self, symbol: &Symbol, timeframe: Timeframe) -> bool {
        let Some(market) = self.market(symbol) else {
            return false;
        };

        let mut market = market.lock();
        if market.timeframe() == timeframe {
            return true;
        }

        market.normalizer.set_timeframe(timeframe);
        market.snapshot = None;
        market.patterns.clear();
        self.rules.lock().forget_symbol(symbol);
        true
    }

    /// Seed the series of `symbol` with historical bars, returning the resulting length.
    pub fn seed<Iter>(&self, symbol: &Symbol, history: Iter) -> Result<usize, DataError>
    where
        Iter: IntoIterator<Item = Candle>,
    {
        let market = self
            .market(symbol)
            .ok_or_else(|| DataError::UnknownSymbol(symbol.clone()))?;

        let mut market = market.lock();
        let len = market.normalizer.seed(history);
        market.refresh();

        // Prime edge state on the closed history so the first live evaluation does not fire
        // for conditions that were already met
        if let Some((snapshot, patterns)) = market.closed() {
            self.rules.lock().prime(symbol, &snapshot, &patterns);
        }

        debug!(%symbol, len, "seeded market series");
        Ok(len)
    }

    /// Apply a [`FeedEvent`], returning any [`Signal`]s it triggered.
    pub fn process(&self, event: FeedEvent) -> Vec<Signal> {
        match event {
            FeedEvent::Tick {
                symbol,
                price,
                time,
            } => self.update(&symbol, None, |normalizer| normalizer.on_tick(price, time)),
            FeedEvent::Candle {
                symbol,
                timeframe,
                candle,
            } => self.update(&symbol, Some(timeframe), |normalizer| {
                normalizer.on_candle(candle)
            }),
            FeedEvent::History {
                symbol,
                timeframe,
                candles,
            } => {
                match self.with_market(&symbol, |market| market.timeframe() == timeframe) {
                    Some(true) => {
                        if let Err(error) = self.seed(&symbol, candles) {
                            debug!(%symbol, %error, "dropping history");
                        }
                    }
                    Some(false) => {
                        debug!(%symbol, %timeframe, "dropping history for superseded timeframe");
                    }
                    None => debug!(%symbol, "dropping history for unwatched symbol"),
                }
                Vec::new()
            }
            FeedEvent::Rejected(symbol) => {
                warn!(%symbol, "symbol rejected by feed catalogue");
                self.remove(&symbol);
                Vec::new()
            }
            FeedEvent::Connection(state) => {
                info!(%state, "feed connection state changed");
                Vec::new()
            }
        }
    }

    fn update<F>(&self, symbol: &Symbol, timeframe: Option<Timeframe>, apply: F) -> Vec<Signal>
    where
        F: FnOnce(&mut StreamNormalizer) -> Result<SeriesUpdate, DataError>,
    {
        let Some(market) = self.market(symbol) else {
            debug!(%symbol, "dropping update for unwatched symbol");
            return Vec::new();
        };

        let mut market = market.lock();
        if timeframe.is_some_and(|timeframe| timeframe != market.timeframe()) {
            debug!(%symbol, ?timeframe, "dropping candle for superseded timeframe");
            return Vec::new();
        }

        let update = match apply(&mut market.normalizer) {
            Ok(update) => update,
            Err(error @ DataError::StaleUpdate { .. }) => {
                debug!(%symbol, %error, "dropping stale update");
                self.stale.fetch_add(1, Ordering::Relaxed);
                return Vec::new();
            }
            Err(error) => {
                debug!(%symbol, %error, "dropping malformed update");
                self.malformed.fetch_add(1, Ordering::Relaxed);
                return Vec::new();
            }
        };

        market.refresh();

        if update != SeriesUpdate::Appended {
            return Vec::new();
        }

        let Some((snapshot, patterns)) = market.closed() else {
            return Vec::new();
        };

        let signals = self.rules.lock().evaluate(symbol, &snapshot, &patterns);
        for signal in &signals {
            self.sink.record_signal(signal);
        }

        signals
    }

    fn market(&self, symbol: &Symbol) -> Option<Arc<Mutex<Market>>> {
        self.markets.read().get(symbol).cloned()
    }

    /// Run `read` against the [`Market`] of `symbol`.
    pub fn with_market<F, T>(&self, symbol: &Symbol, read: F) -> Option<T>
    where
        F: FnOnce(&Market) -> T,
    {
        self.market(symbol).map(|market| read(&market.lock()))
    }

    pub fn rules(&self) -> &Mutex<SignalRuleEngine> {
        &self.rules
    }

    pub fn stale(&self) -> u64 {
        self.stale.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}
