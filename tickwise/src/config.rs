use crate::{
    error::EngineError,
    signal::condition::{SignalCondition, default_conditions},
};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use tickwise_data::{
    streams::reconnect::ReconnectionBackoffPolicy, subscription::manager::ManagerConfig,
    symbol::Symbol, timeframe::Timeframe,
};

/// Static configuration of a [`MarketEngine`](crate::engine::MarketEngine).
///
/// Every field is optional in the serialised form.
///
/// ### Raw Payload Example
/// ```json
/// {
///     "retentionBars": 300,
///     "dedupWindowSecs": 60,
///     "historyCap": 50,
///     "reconnectBackoffSecs": 3,
///     "symbols": ["R_100", "frxEURUSD"],
///     "timeframe": 60
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum bars kept per symbol series.
    pub retention_bars: usize,
    pub dedup_window_secs: u32,
    /// Maximum signals kept in the rolling history.
    pub history_cap: usize,
    pub reconnect_backoff_secs: u32,
    /// Initial watchlist.
    pub symbols: Vec<Symbol>,
    /// Initial candle width of every watched symbol.
    pub timeframe: Timeframe,
    /// Historical bars requested when seeding a candle subscription, defaulting to
    /// `retention_bars`.
    pub history_count: Option<usize>,
    pub handshake_timeout_secs: u32,
    /// Keep-alive ping period, 0 disables.
    pub ping_interval_secs: u32,
    pub conditions: Vec<SignalCondition>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_bars: 300,
            dedup_window_secs: 60,
            history_cap: 50,
            reconnect_backoff_secs: 3,
            symbols: Vec::new(),
            timeframe: Timeframe::M1,
            history_count: None,
            handshake_timeout_secs: 10,
            ping_interval_secs: 30,
            conditions: default_conditions(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(input: &str) -> Result<Self, EngineError> {
        serde_json::from_str(input).map_err(|error| EngineError::Config(error.to_string()))
    }

    pub fn from_path<P>(path: P) -> Result<Self, EngineError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|error| EngineError::Config(format!("{}: {error}", path.display())))?;

        serde_json::from_reader(BufReader::new(file))
            .map_err(|error| EngineError::Config(format!("{}: {error}", path.display())))
    }

    /// [`ManagerConfig`] for the feed
    /// [`SubscriptionManager`](tickwise_data::subscription::manager::SubscriptionManager).
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            backoff: ReconnectionBackoffPolicy::fixed_secs(u64::from(self.reconnect_backoff_secs)),
            handshake_timeout: Duration::from_secs(u64::from(self.handshake_timeout_secs)),
            ping_interval: (self.ping_interval_secs > 0)
                .then(|| Duration::from_secs(u64::from(self.ping_interval_secs))),
            history_count: self.history_count.unwrap_or(self.retention_bars),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_str() {
        struct TestCase {
            input: &'static str,
            expected: Result<EngineConfig, ()>,
        }

        let cases = vec![
            // TC0: empty object is all defaults
            TestCase {
                input: "{}",
                expected: Ok(EngineConfig::default()),
            },
            // TC1: recognised fields override defaults
            TestCase {
                input: r#"
                    {
                        "retentionBars": 500,
                        "dedupWindowSecs": 30,
                        "historyCap": 20,
                        "reconnectBackoffSecs": 5,
                        "symbols": ["R_100"],
                        "timeframe": 300,
                        "conditions": []
                    }
                "#,
                expected: Ok(EngineConfig {
                    retention_bars: 500,
                    dedup_window_secs: 30,
                    history_cap: 20,
                    reconnect_backoff_secs: 5,
                    symbols: vec![Symbol::from("R_100")],
                    timeframe: Timeframe::M5,
                    conditions: vec![],
                    ..EngineConfig::default()
                }),
            },
            // TC2: wrong type
            TestCase {
                input: r#"{"retentionBars": "many"}"#,
                expected: Err(()),
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = EngineConfig::from_json_str(test.input);
            match (actual, test.expected) {
                (Ok(actual), Ok(expected)) => assert_eq!(actual, expected, "TC{} failed", index),
                (Err(_), Err(_)) => {
                    // Test passed
                }
                (actual, expected) => {
                    panic!(
                        "TC{index} failed because actual != expected. \nActual: {actual:?}\nExpected: {expected:?}\n"
                    );
                }
            }
        }
    }

    #[test]
    fn test_manager_config() {
        let config = EngineConfig {
            ping_interval_secs: 0,
            ..EngineConfig::default()
        };

        let manager = config.manager_config();
        assert_eq!(manager.ping_interval, None);
        assert_eq!(manager.history_count, 300);
        assert_eq!(manager.handshake_timeout, Duration::from_secs(10));
        assert_eq!(manager.backoff, ReconnectionBackoffPolicy::fixed_secs(3));
    }
}
