//! Reconnect delay policy.
//!
//! This module provides the [`ReconnectPolicy`] type and the [`Backoff`]
//! state machine the connector uses between connection attempts.
//!
//! # Reconnect Strategy
//!
//! - The default policy waits a fixed 5 seconds between attempts
//! - An exponential policy multiplies the delay after each failed attempt
//!   and caps it at `max_delay`
//! - Optional ±25% jitter spreads out clients that lost the same server
//! - The delay goes back to `initial_delay` after every successful connect

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::time::Duration;

/// Default delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long the connector waits before dialing again.
///
/// Configure through [`RpcConfig::with_reconnect`](crate::RpcConfig::with_reconnect)
/// or [`RpcClientBuilder::reconnect_policy`](crate::RpcClientBuilder::reconnect_policy).
///
/// # Example
///
/// ```
/// use snapcast_rpc::ReconnectPolicy;
/// use std::time::Duration;
///
/// let policy = ReconnectPolicy::exponential(
///     Duration::from_millis(250),
///     Duration::from_secs(30),
/// );
/// assert!(policy.jitter);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry after a failure.
    pub initial_delay: Duration,

    /// Factor applied to the delay after each consecutive failure.
    ///
    /// `1.0` keeps the delay constant.
    pub multiplier: f32,

    /// Upper bound for the delay (before jitter).
    pub max_delay: Duration,

    /// Randomize each delay by ±25%.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    /// Fixed 5 second interval, no jitter.
    fn default() -> Self {
        // ---
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    // ---

    /// Always wait `delay`.
    pub fn fixed(delay: Duration) -> Self {
        // ---
        Self {
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter: false,
        }
    }

    /// Double the delay after every failure, from `initial` up to `max`,
    /// with jitter.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        // ---
        Self {
            initial_delay: initial,
            multiplier: 2.0,
            max_delay: max.max(initial),
            jitter: true,
        }
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Per-client backoff state.
#[derive(Debug)]
pub(crate) struct Backoff {
    // ---
    policy: ReconnectPolicy,
    current: Duration,
    failures: u32,
}

impl Backoff {
    // ---

    pub(crate) fn new(policy: ReconnectPolicy) -> Self {
        // ---
        let current = policy.initial_delay;
        Self {
            policy,
            current,
            failures: 0,
        }
    }

    /// Delay to sleep before the next attempt; advances the state.
    pub(crate) fn next_delay(&mut self) -> Duration {
        // ---
        let delay = if self.policy.jitter {
            apply_jitter(self.current)
        } else {
            self.current
        };

        self.failures = self.failures.saturating_add(1);

        // A multiplier below 1.0 would shrink the delay; treat it as fixed.
        let factor = f64::from(self.policy.multiplier).max(1.0);
        let grown = Duration::from_secs_f64(self.current.as_secs_f64() * factor);
        self.current = grown
            .min(self.policy.max_delay)
            .max(self.policy.initial_delay);

        delay
    }

    /// Consecutive delays handed out since the last reset.
    pub(crate) fn failures(&self) -> u32 {
        self.failures
    }

    /// Forget previous failures; called after a successful connect.
    pub(crate) fn reset(&mut self) {
        // ---
        self.current = self.policy.initial_delay;
        self.failures = 0;
    }
}

/// Apply ±25% jitter to a duration.
///
/// Uses a simple multiplicative jitter: `delay * (0.75 + random(0.0..0.5))`
fn apply_jitter(delay: Duration) -> Duration {
    // ---
    let random_state = RandomState::new();
    let hash = random_state.hash_one(std::time::SystemTime::now());

    // Convert to 0.0..1.0 range
    let random_factor = (hash % 1000) as f64 / 1000.0;

    // 0.75x to 1.25x the original delay
    let jitter_multiplier = 0.75 + (random_factor * 0.5);

    Duration::from_secs_f64(delay.as_secs_f64() * jitter_multiplier)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_default_is_fixed_five_seconds() {
        // ---
        let mut backoff = Backoff::new(ReconnectPolicy::default());

        for _ in 0..5 {
            assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        }
        assert_eq!(backoff.failures(), 5);
    }

    #[test]
    fn test_exponential_growth_and_cap() {
        // ---
        let policy = ReconnectPolicy::exponential(
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .with_jitter(false);
        let mut backoff = Backoff::new(policy);

        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn test_reset_returns_to_initial_delay() {
        // ---
        let policy =
            ReconnectPolicy::exponential(Duration::from_millis(10), Duration::from_secs(1))
                .with_jitter(false);
        let mut backoff = Backoff::new(policy);

        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.failures(), 2);

        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_jitter_range() {
        // ---
        let delay = Duration::from_millis(100);

        for _ in 0..100 {
            let jittered = apply_jitter(delay);

            assert!(
                jittered >= Duration::from_millis(75),
                "jitter too low: {jittered:?}",
            );
            assert!(
                jittered <= Duration::from_millis(125),
                "jitter too high: {jittered:?}",
            );
        }
    }
}
