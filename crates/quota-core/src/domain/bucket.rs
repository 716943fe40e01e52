use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ClientPolicy;

/// Token bucket shape derived from a [`ClientPolicy`].
///
/// Refill is fixed-interval: `refill_tokens` are credited in one step at each
/// `refill_interval` boundary, never accrued gradually in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfiguration {
    pub capacity: u64,
    pub refill_tokens: u64,
    pub refill_interval: Duration,
}

impl BucketConfiguration {
    /// Refill interval in whole milliseconds, never zero.
    pub fn interval_millis(&self) -> u64 {
        u64::try_from(self.refill_interval.as_millis())
            .unwrap_or(u64::MAX)
            .max(1)
    }
}

impl From<&ClientPolicy> for BucketConfiguration {
    fn from(policy: &ClientPolicy) -> Self {
        Self {
            capacity: policy.units_per_interval,
            refill_tokens: policy.units_per_interval,
            refill_interval: policy.interval,
        }
    }
}

/// Result of one consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub allowed: bool,
    /// Tokens left after this attempt.
    pub remaining: u64,
    /// Time until the next refill boundary.
    pub reset_after: Duration,
}

/// Persisted bucket record: token count plus the last interval boundary credited.
///
/// Stores apply [`BucketState::try_consume`] inside their own atomic section; the
/// Redis script mirrors the same arithmetic server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketState {
    pub tokens: u64,
    pub last_refill_ms: u64,
}

impl BucketState {
    /// A fresh bucket starts full.
    pub fn full(config: &BucketConfiguration, now_ms: u64) -> Self {
        Self {
            tokens: config.capacity,
            last_refill_ms: now_ms,
        }
    }

    /// Credit every whole interval elapsed since `last_refill_ms`, capped at capacity.
    pub fn refill(&mut self, config: &BucketConfiguration, now_ms: u64) {
        // A shrunk policy must not leave more tokens than the new capacity.
        self.tokens = self.tokens.min(config.capacity);

        if now_ms <= self.last_refill_ms {
            return;
        }

        let interval = config.interval_millis();
        let intervals = (now_ms - self.last_refill_ms) / interval;
        if intervals == 0 {
            return;
        }

        let credit = intervals.saturating_mul(config.refill_tokens);
        self.tokens = self.tokens.saturating_add(credit).min(config.capacity);
        self.last_refill_ms = self
            .last_refill_ms
            .saturating_add(intervals.saturating_mul(interval));
    }

    /// Refill, then deduct `tokens` if enough are available. A denied attempt deducts nothing.
    pub fn try_consume(
        &mut self,
        config: &BucketConfiguration,
        tokens: u64,
        now_ms: u64,
    ) -> ConsumeOutcome {
        self.refill(config, now_ms);

        let allowed = self.tokens >= tokens;
        if allowed {
            self.tokens -= tokens;
        }

        ConsumeOutcome {
            allowed,
            remaining: self.tokens,
            reset_after: self.until_next_refill(config, now_ms),
        }
    }

    fn until_next_refill(&self, config: &BucketConfiguration, now_ms: u64) -> Duration {
        let interval = config.interval_millis();
        let elapsed = now_ms.saturating_sub(self.last_refill_ms);
        Duration::from_millis(interval.saturating_sub(elapsed).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE_MS: u64 = 60_000;

    fn config(units: u64) -> BucketConfiguration {
        BucketConfiguration {
            capacity: units,
            refill_tokens: units,
            refill_interval: Duration::from_secs(60),
        }
    }

    #[test]
    fn derives_configuration_from_policy() {
        let policy = ClientPolicy::new("1", 5, Duration::from_secs(60)).unwrap();
        let config = BucketConfiguration::from(&policy);
        assert_eq!(config.capacity, 5);
        assert_eq!(config.refill_tokens, 5);
        assert_eq!(config.refill_interval, Duration::from_secs(60));
    }

    #[test]
    fn five_per_minute_admits_five_then_denies_without_change() {
        let config = config(5);
        let mut state = BucketState::full(&config, 0);

        for i in 0..5 {
            let outcome = state.try_consume(&config, 1, 1_000 * i);
            assert!(outcome.allowed, "request {} should pass", i + 1);
        }

        let before = state;
        let outcome = state.try_consume(&config, 1, 10_000);
        assert!(!outcome.allowed);
        assert_eq!(outcome.remaining, 0);
        assert_eq!(state, before);
    }

    #[test]
    fn refill_happens_only_at_interval_boundary() {
        let config = config(5);
        let mut state = BucketState::full(&config, 0);
        for _ in 0..5 {
            state.try_consume(&config, 1, 0);
        }

        assert!(!state.try_consume(&config, 1, MINUTE_MS - 1).allowed);

        let outcome = state.try_consume(&config, 1, MINUTE_MS);
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, 4);
        assert_eq!(state.last_refill_ms, MINUTE_MS);
    }

    #[test]
    fn idle_intervals_never_over_credit() {
        let config = config(5);
        let mut state = BucketState::full(&config, 0);
        state.try_consume(&config, 3, 0);

        let outcome = state.try_consume(&config, 1, 10 * MINUTE_MS + 123);
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, 4);
        // Advanced by whole intervals only.
        assert_eq!(state.last_refill_ms, 10 * MINUTE_MS);
        assert_eq!(outcome.reset_after, Duration::from_millis(MINUTE_MS - 123));
    }

    #[test]
    fn shrunk_capacity_clamps_stored_tokens() {
        let mut state = BucketState {
            tokens: 50,
            last_refill_ms: 0,
        };
        let outcome = state.try_consume(&config(5), 1, 10);
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, 4);
    }

    #[test]
    fn clock_going_backwards_does_not_refill() {
        let config = config(2);
        let mut state = BucketState {
            tokens: 0,
            last_refill_ms: 5 * MINUTE_MS,
        };
        let outcome = state.try_consume(&config, 1, MINUTE_MS);
        assert!(!outcome.allowed);
        assert_eq!(state.last_refill_ms, 5 * MINUTE_MS);
    }

    #[test]
    fn multi_token_request_is_all_or_nothing() {
        let config = config(5);
        let mut state = BucketState::full(&config, 0);
        assert!(state.try_consume(&config, 4, 0).allowed);

        let outcome = state.try_consume(&config, 2, 0);
        assert!(!outcome.allowed);
        assert_eq!(outcome.remaining, 1);
    }
}
