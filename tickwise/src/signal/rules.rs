use crate::{
    error::EngineError,
    signal::{
        Signal, SignalId,
        condition::{ConditionId, SignalCondition},
    },
};
use fnv::FnvHashMap;
use indexmap::IndexMap;
use std::collections::VecDeque;
use tickwise_data::symbol::Symbol;
use tickwise_ta::{patterns::CandlePattern, snapshot::IndicatorSnapshot};
use tracing::{debug, info};

/// Last evaluation of one (symbol, condition) pair.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
struct ConditionState {
    met: bool,
    value: Option<f64>,
}

/// Evaluates [`SignalCondition`]s against closed-bar [`IndicatorSnapshot`]s.
///
/// A [`Signal`] fires only when a condition transitions from not-met to met for a symbol. Before
/// it is accepted, a signal with the same (symbol, condition) and a `time` within the dedup
/// window of an existing history entry is discarded. History is a ring capped at `history_cap`,
/// evicting the oldest signal first.
#[derive(Debug, Clone)]
pub struct SignalRuleEngine {
    conditions: IndexMap<ConditionId, SignalCondition>,
    states: FnvHashMap<(Symbol, ConditionId), ConditionState>,
    history: VecDeque<Signal>,
    history_cap: usize,
    dedup_window_secs: i64,
}

impl SignalRuleEngine {
    pub fn new<Iter>(conditions: Iter, history_cap: usize, dedup_window_secs: u32) -> Self
    where
        Iter: IntoIterator<Item = SignalCondition>,
    {
        let history_cap = history_cap.max(1);

        Self {
            conditions: conditions
                .into_iter()
                .map(|condition| (condition.id.clone(), condition))
                .collect(),
            states: FnvHashMap::default(),
            history: VecDeque::with_capacity(history_cap),
            history_cap,
            dedup_window_secs: i64::from(dedup_window_secs),
        }
    }

    /// Evaluate every enabled condition for `symbol`, returning the newly accepted [`Signal`]s.
    pub fn evaluate(
        &mut self,
        symbol: &Symbol,
        snapshot: &IndicatorSnapshot,
        patterns: &[CandlePattern],
    ) -> Vec<Signal> {
        let mut accepted = Vec::new();

        for condition in self.conditions.values().filter(|condition| condition.enabled) {
            let Some(value) = observe(&mut self.states, symbol, condition, snapshot, patterns)
            else {
                continue;
            };

            let signal = Signal {
                id: SignalId::new(symbol, &condition.id, snapshot.time),
                symbol: symbol.clone(),
                kind: condition.kind,
                condition_id: condition.id.clone(),
                price: snapshot.price,
                time: snapshot.time,
                indicator_value: value,
            };

            if is_duplicate(&self.history, &signal, self.dedup_window_secs) {
                debug!(id = %signal.id, "discarding duplicate signal within dedup window");
                continue;
            }

            info!(
                id = %signal.id,
                kind = %signal.kind,
                price = signal.price,
                value,
                "signal triggered"
            );

            if self.history.len() >= self.history_cap {
                self.history.pop_front();
            }
            self.history.push_back(signal.clone());
            accepted.push(signal);
        }

        accepted
    }

    /// Record the state of every enabled condition for `symbol` without emitting signals.
    ///
    /// Used after seeding history, so conditions already met on historical bars do not fire on
    /// the first live evaluation.
    pub fn prime(
        &mut self,
        symbol: &Symbol,
        snapshot: &IndicatorSnapshot,
        patterns: &[CandlePattern],
    ) {
        for condition in self.conditions.values().filter(|condition| condition.enabled) {
            observe(&mut self.states, symbol, condition, snapshot, patterns);
        }
    }

    /// Flip the `enabled` flag of a condition, returning its new value.
    ///
    /// History is untouched. Re-enabled conditions start from a clean not-met state.
    pub fn toggle(&mut self, id: &ConditionId) -> Result<bool, EngineError> {
        let condition = self
            .conditions
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownCondition(id.clone()))?;

        condition.enabled = !condition.enabled;
        let enabled = condition.enabled;

        self.states.retain(|(_, condition), _| condition != id);
        info!(%id, enabled, "toggled signal condition");

        Ok(enabled)
    }

    /// Drop the per-condition state of a symbol. History is retained.
    pub fn forget_symbol(&mut self, symbol: &Symbol) {
        self.states.retain(|(state_symbol, _), _| state_symbol != symbol);
    }

    /// Recent signals, newest first, optionally filtered by symbol.
    pub fn recent(&self, symbol: Option<&Symbol>) -> Vec<Signal> {
        self.history
            .iter()
            .rev()
            .filter(|signal| symbol.is_none_or(|symbol| signal.symbol == *symbol))
            .cloned()
            .collect()
    }

    pub fn conditions(&self) -> Vec<SignalCondition> {
        self.conditions.values().cloned().collect()
    }
}

/// Update the state of a (symbol, condition) pair, returning the triggering value if the
/// condition transitioned into the met state.
fn observe(
    states: &mut FnvHashMap<(Symbol, ConditionId), ConditionState>,
    symbol: &Symbol,
    condition: &SignalCondition,
    snapshot: &IndicatorSnapshot,
    patterns: &[CandlePattern],
) -> Option<f64> {
    let key = (symbol.clone(), condition.id.clone());
    let previous = states.get(&key).copied().unwrap_or_default();

    let value = condition.indicator.value(snapshot, patterns);
    let met = value.is_some_and(|value| {
        condition
            .comparison
            .is_met(previous.value, value, condition.value)
    });

    states.insert(key, ConditionState { met, value });

    value.filter(|_| met && !previous.met)
}

fn is_duplicate(history: &VecDeque<Signal>, signal: &Signal, window_secs: i64) -> bool {
    history.iter().any(|existing| {
        existing.symbol == signal.symbol
            && existing.condition_id == signal.condition_id
            && existing.time.abs_diff(signal.time) < window_secs.unsigned_abs()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{
        SignalKind,
        condition::{Comparison, ConditionSource},
    };
    use tickwise_ta::snapshot::Bias;

    fn snapshot(time: i64, rsi: Option<f64>) -> IndicatorSnapshot {
        IndicatorSnapshot {
            time,
            price: 100.0,
            rsi,
            sma20: None,
            sma50: None,
            ema20: None,
            macd: None,
            bollinger: None,
            atr: None,
            stochastic: None,
            bias: Bias::Neutral,
            buy_score: 0,
            sell_score: 0,
        }
    }

    fn rsi_oversold() -> SignalCondition {
        SignalCondition::new(
            "rsi_oversold",
            "RSI Oversold",
            ConditionSource::Rsi,
            Comparison::Lt,
            30.0,
            SignalKind::Buy,
        )
    }

    #[test]
    fn test_edge_triggered() {
        let mut rules = SignalRuleEngine::new([rsi_oversold()], 50, 60);
        let symbol = Symbol::from("R_100");

        let rsi = [45.0, 28.0, 25.0, 22.0, 27.0, 29.0, 35.0];
        let fired = rsi
            .iter()
            .enumerate()
            .flat_map(|(index, rsi)| {
                rules.evaluate(&symbol, &snapshot(index as i64 * 60, Some(*rsi)), &[])
            })
            .collect::<Vec<_>>();

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].time, 60);
        assert_eq!(fired[0].indicator_value, 28.0);
        assert_eq!(fired[0].id, SignalId::from(smol_str::SmolStr::new("R_100:rsi_oversold:60")));
    }

    #[test]
    fn test_insufficient_history_is_not_met() {
        let mut rules = SignalRuleEngine::new([rsi_oversold()], 50, 60);
        let symbol = Symbol::from("R_100");

        assert!(rules.evaluate(&symbol, &snapshot(0, None), &[]).is_empty());
        assert_eq!(rules.evaluate(&symbol, &snapshot(60, Some(20.0)), &[]).len(), 1);
    }

    #[test]
    fn test_dedup_within_window() {
        let mut rules = SignalRuleEngine::new([rsi_oversold()], 50, 60);
        let symbol = Symbol::from("R_100");

        assert_eq!(rules.evaluate(&symbol, &snapshot(0, Some(20.0)), &[]).len(), 1);

        // forgetting state re-arms the edge, the identical update is then a duplicate
        rules.forget_symbol(&symbol);
        assert!(rules.evaluate(&symbol, &snapshot(0, Some(20.0)), &[]).is_empty());

        // outside the window a fresh edge is accepted
        rules.forget_symbol(&symbol);
        assert_eq!(rules.evaluate(&symbol, &snapshot(120, Some(20.0)), &[]).len(), 1);
        assert_eq!(rules.recent(Some(&symbol)).len(), 2);
    }

    #[test]
    fn test_history_is_capped_newest_first() {
        let mut rules = SignalRuleEngine::new([rsi_oversold()], 3, 0);
        let symbol = Symbol::from("R_100");

        for bar in 0..10 {
            let rsi = if bar % 2 == 0 { 20.0 } else { 50.0 };
            rules.evaluate(&symbol, &snapshot(bar * 60, Some(rsi)), &[]);
        }

        let recent = rules.recent(None);
        assert_eq!(
            recent.iter().map(|signal| signal.time).collect::<Vec<_>>(),
            vec![480, 360, 240]
        );
        assert!(rules.recent(Some(&Symbol::from("R_50"))).is_empty());
    }

    #[test]
    fn test_toggle() {
        let mut rules = SignalRuleEngine::new([rsi_oversold()], 50, 60);
        let symbol = Symbol::from("R_100");
        let id = ConditionId::from("rsi_oversold");

        assert_eq!(rules.toggle(&id), Ok(false));
        assert!(rules.evaluate(&symbol, &snapshot(0, Some(20.0)), &[]).is_empty());

        assert_eq!(rules.toggle(&id), Ok(true));
        assert_eq!(rules.evaluate(&symbol, &snapshot(60, Some(20.0)), &[]).len(), 1);

        assert_eq!(
            rules.toggle(&ConditionId::from("nope")),
            Err(EngineError::UnknownCondition(ConditionId::from("nope")))
        );
    }

    #[test]
    fn test_prime_absorbs_already_met_condition() {
        let mut rules = SignalRuleEngine::new([rsi_oversold()], 50, 60);
        let symbol = Symbol::from("R_100");

        rules.prime(&symbol, &snapshot(0, Some(20.0)), &[]);
        assert!(rules.evaluate(&symbol, &snapshot(60, Some(22.0)), &[]).is_empty());
        assert!(rules.recent(None).is_empty());

        assert!(rules.evaluate(&symbol, &snapshot(120, Some(40.0)), &[]).is_empty());
        assert_eq!(rules.evaluate(&symbol, &snapshot(180, Some(25.0)), &[]).len(), 1);
    }
}
