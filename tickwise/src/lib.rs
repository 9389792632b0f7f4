#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Tickwise
//! Market-data streaming and technical-analysis engine. It ingests live ticks and candles from an
//! external feed, maintains per-symbol candle series, computes a fixed battery of technical
//! indicators, detects candlestick patterns and evaluates a configurable rule set to emit
//! de-duplicated trading signals.
//!
//! ## Overview
//! * **Data**: [`Tickwise-Data`] owns the feed connection through a reconnecting
//!   `SubscriptionManager`, and normalises ticks and OHLC pushes into bounded `CandleSeries`.
//! * **Analysis**: [`Tickwise-TA`] provides pure indicator functions, the `IndicatorSnapshot` with
//!   its overall bias, and the candlestick `PatternRecognizer`.
//! * **Signals**: the [`SignalRuleEngine`](signal::rules::SignalRuleEngine) evaluates
//!   [`SignalCondition`](signal::condition::SignalCondition)s on every closed bar. Signals are
//!   edge-triggered, de-duplicated within a time window and kept in a bounded history.
//! * **Engine**: the [`MarketEngine`](engine::MarketEngine) ties everything together behind a
//!   synchronous query surface and an explicit `shutdown`.
//!
//! [`Tickwise-Data`]: tickwise_data
//! [`Tickwise-TA`]: tickwise_ta
//!
//! ## Getting Started
//! ```rust,no_run
//! use tickwise::{
//!     config::EngineConfig, engine::MarketEngine, logging::init_logging, sink::NoopSignalSink,
//! };
//! use tickwise_data::{feed::transport::WebSocketFeed, symbol::Symbol, timeframe::Timeframe};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_logging();
//!
//!     let transport = WebSocketFeed::new("wss://feed.example.com/ws").unwrap();
//!     let engine = MarketEngine::init(EngineConfig::default(), transport, NoopSignalSink)
//!         .await
//!         .unwrap();
//!
//!     engine.subscribe(Symbol::from("R_100"), None).await.unwrap();
//!
//!     let snapshot = engine.get_snapshot(&Symbol::from("R_100"), Timeframe::M1);
//!     println!("{snapshot:?}");
//!
//!     engine.shutdown().await.unwrap();
//! }
//! ```

/// [`EngineConfig`](config::EngineConfig) recognised by the [`MarketEngine`](engine::MarketEngine).
pub mod config;

/// Process-scoped [`MarketEngine`](engine::MarketEngine) facade.
pub mod engine;

/// All [`Error`](std::error::Error)s generated in Tickwise.
pub mod error;

/// Provides default Tickwise Tracing logging initialisers.
pub mod logging;

/// Per-symbol market state and feed event processing.
pub mod market;

/// Trading [`Signal`](signal::Signal)s and the rules producing them.
pub mod signal;

/// Destinations for accepted [`Signal`](signal::Signal)s.
pub mod sink;
