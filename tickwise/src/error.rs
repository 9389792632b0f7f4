use crate::signal::condition::ConditionId;
use serde::{Deserialize, Serialize};
use tickwise_data::error::DataError;
use thiserror::Error;

/// All errors generated by the [`MarketEngine`](crate::engine::MarketEngine).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum EngineError {
    #[error("market data: {0}")]
    Data(#[from] DataError),

    #[error("unknown signal condition: {0}")]
    UnknownCondition(ConditionId),

    #[error("config: {0}")]
    Config(String),

    #[error("JoinError: {0}")]
    JoinError(String),
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}
