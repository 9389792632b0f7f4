#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! Technical analysis for Tickwise.
//!
//! Everything in this crate is pure and synchronous: functions take a slice of [`Candle`]s (or
//! close prices) and return freshly computed values. Early positions that lack enough lookback
//! are `None` rather than an error.
//!
//! - [`indicators`]: SMA, EMA, RSI, MACD, Bollinger Bands, ATR and Stochastic, plus the closed
//!   [`Indicator`](indicators::Indicator) enum used to dispatch them.
//! - [`snapshot`]: the [`IndicatorSnapshot`](snapshot::IndicatorSnapshot) value object and its
//!   buy/sell bias scoring.
//! - [`patterns`]: candlestick pattern recognition over the tail of a series.
//! - [`cross`]: crossover detection between two data series.

pub use candle::Candle;

/// Normalised OHLCV [`Candle`] model.
pub mod candle;

pub mod cross;
pub mod indicators;
pub mod patterns;
pub mod snapshot;
