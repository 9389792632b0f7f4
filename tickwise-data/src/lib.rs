#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::pedantic, clippy::type_complexity)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Tickwise-Data
//! Live market-data plumbing for the Tickwise engine:
//! * **Normalised**: raw ticks and full-bar OHLC pushes are reconciled into a per-symbol
//!   [`CandleSeries`](series::CandleSeries) by the [`StreamNormalizer`](normalizer::StreamNormalizer).
//! * **Resilient**: the [`SubscriptionManager`](subscription::manager::SubscriptionManager) owns the
//!   feed connection lifecycle, re-subscribing the whole watchlist after every reconnect.
//! * **Transport agnostic**: the feed is reached through the
//!   [`FeedTransport`](feed::transport::FeedTransport) trait, with a WebSocket implementation
//!   included.
//!
//! ## Data flow
//! `FeedTransport` → [`SubscriptionManager`](subscription::manager::SubscriptionManager) →
//! [`FeedEvent`](event::FeedEvent) → `StreamNormalizer` → `CandleSeries`.

/// All [`Error`](std::error::Error)s generated in Tickwise-Data.
pub mod error;

/// [`FeedEvent`](event::FeedEvent) routed from the feed to per-symbol consumers.
pub mod event;

/// Feed wire protocol and the [`FeedTransport`](feed::transport::FeedTransport) abstraction.
pub mod feed;

/// Reconciles ticks and candle pushes into a [`CandleSeries`](series::CandleSeries).
pub mod normalizer;

/// Append-only, retention capped [`CandleSeries`](series::CandleSeries).
pub mod series;

/// Reconnection backoff utilities.
pub mod streams;

/// Watchlist bookkeeping and the feed connection state machine.
pub mod subscription;

/// Tradable [`Symbol`](symbol::Symbol) identifier.
pub mod symbol;

/// Candle bucket width.
pub mod timeframe;
