//! Reconnect backoff for the terminal session.
//!
//! After `n` consecutive failed attempts the next attempt is allowed
//! `interval * 2^(n-1)` after the failed one, capped at `max_delay`.
//! With the default 5 second interval that is 5s, 10s, 20s, 40s, 60s, 60s...
//!
//! The state is in-memory; a restarted loop starts with a clean slate.

use std::time::Duration;

use log::debug;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    max_delay: Duration,
    failures: u32,
    next_attempt: Option<Instant>,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self {
            base,
            max_delay: max_delay.max(base),
            failures: 0,
            next_attempt: None,
        }
    }

    /// Whether a connection attempt may be made at `now`.
    pub fn is_allowed(&self, now: Instant) -> bool {
        match self.next_attempt {
            Some(at) => now >= at,
            None => true,
        }
    }

    /// Records a failed attempt made at `attempted_at` and returns the delay
    /// until the next one.
    pub fn record_failure(&mut self, attempted_at: Instant) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let delay = self.delay_for(self.failures);
        self.next_attempt = Some(attempted_at + delay);
        debug!(
            "Reconnect attempt {} failed, next attempt in {:?}",
            self.failures, delay
        );
        delay
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.next_attempt = None;
    }

    /// Consecutive failed attempts since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
