use derive_more::Constructor;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnection backoff policy for the feed connection.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Constructor,
)]
pub struct ReconnectionBackoffPolicy {
    /// Initial backoff millisecond duration after the first disconnection.
    ///
    /// This value then scales with the `backoff_multiplier` in the case of repeated failed
    /// reconnection attempts.
    pub backoff_ms_initial: u64,

    /// Scaling factor for the backoff duration in the case of repeated reconnection attempts.
    pub backoff_multiplier: u8,

    /// Maximum possible backoff duration between reconnection attempts.
    pub backoff_ms_max: u64,

    /// Random jitter in milliseconds to apply on top of the calculated backoff
    /// duration. A random value in the range `[0, jitter_ms]` will be added to
    /// each reconnection delay.
    pub jitter_ms: u64,
}

impl ReconnectionBackoffPolicy {
    /// Constant backoff of `secs` between every attempt.
    pub fn fixed_secs(secs: u64) -> Self {
        let backoff_ms = secs.saturating_mul(1_000);
        Self::new(backoff_ms, 1, backoff_ms, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct ReconnectionState {
    policy: ReconnectionBackoffPolicy,
    backoff_ms_current: u64,
}

impl From<ReconnectionBackoffPolicy> for ReconnectionState {
    fn from(policy: ReconnectionBackoffPolicy) -> Self {
        Self {
            backoff_ms_current: policy.backoff_ms_initial,
            policy,
        }
    }
}

impl ReconnectionState {
    pub fn reset_backoff(&mut self) {
        self.backoff_ms_current = self.policy.backoff_ms_initial;
    }

    pub fn multiply_backoff(&mut self) {
        let next = self
            .backoff_ms_current
            .saturating_mul(u64::from(self.policy.backoff_multiplier));
        let next_capped = std::cmp::min(next, self.policy.backoff_ms_max);
        self.backoff_ms_current = next_capped;
    }

    pub fn generate_sleep_duration(&self) -> Duration {
        let jitter = if self.policy.jitter_ms > 0 {
            rand::rng().random_range(0..=self.policy.jitter_ms)
        } else {
            0
        };

        Duration::from_millis(self.backoff_ms_current + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sleep_duration_jitter() {
        let policy = ReconnectionBackoffPolicy::new(100, 2, 1000, 50);
        let mut state = ReconnectionState::from(policy.clone());

        for _ in 0..3 {
            let dur = state.generate_sleep_duration();
            assert!(dur >= Duration::from_millis(state.backoff_ms_current));
            assert!(dur <= Duration::from_millis(state.backoff_ms_current + policy.jitter_ms));
            state.multiply_backoff();
        }
    }

    #[test]
    fn test_multiply_backoff_is_capped_and_resets() {
        let mut state = ReconnectionState::from(ReconnectionBackoffPolicy::new(100, 3, 500, 0));

        state.multiply_backoff();
        assert_eq!(state.generate_sleep_duration(), Duration::from_millis(300));
        state.multiply_backoff();
        assert_eq!(state.generate_sleep_duration(), Duration::from_millis(500));

        state.reset_backoff();
        assert_eq!(state.generate_sleep_duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_fixed_secs() {
        let mut state = ReconnectionState::from(ReconnectionBackoffPolicy::fixed_secs(3));

        for _ in 0..3 {
            assert_eq!(state.generate_sleep_duration(), Duration::from_secs(3));
            state.multiply_backoff();
        }
    }
}
