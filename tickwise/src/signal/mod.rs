use crate::signal::condition::ConditionId;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};
use tickwise_data::symbol::Symbol;

/// [`SignalCondition`](condition::SignalCondition) rules and the values they read.
pub mod condition;

/// Edge-triggered, de-duplicating [`SignalRuleEngine`](rules::SignalRuleEngine).
pub mod rules;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    #[display("buy")]
    Buy,
    #[display("sell")]
    Sell,
}

/// Unique identifier of a [`Signal`]: `{symbol}:{condition}:{time}`.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
#[serde(transparent)]
pub struct SignalId(pub SmolStr);

impl SignalId {
    pub fn new(symbol: &Symbol, condition: &ConditionId, time: i64) -> Self {
        Self(format_smolstr!("{symbol}:{condition}:{time}"))
    }
}

/// Trading signal produced when a [`SignalCondition`](condition::SignalCondition) transitions
/// into the met state on a closed bar.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub id: SignalId,
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub condition_id: ConditionId,
    /// Close of the triggering bar.
    pub price: f64,
    /// Open time of the triggering bar.
    pub time: i64,
    #[serde(rename = "indicatorValueAtTrigger")]
    pub indicator_value: f64,
}
