//! Exponential reconnect schedule with a capped maximum and jitter.
//!
//! The constants are tuning parameters, configurable via `[sync]`; the
//! contract is only the shape: growing delays while disconnected, reset on a
//! successful connect.

use kardia_core::config::SyncConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial,
            max,
            factor: factor.max(1.0),
            next: initial,
        }
    }

    pub fn from_config(cfg: &SyncConfig) -> Self {
        Self::new(
            Duration::from_millis(cfg.initial_backoff_ms),
            Duration::from_millis(cfg.max_backoff_ms),
            cfg.backoff_factor,
        )
    }

    /// The base schedule: returns the current delay and doubles (by `factor`)
    /// toward the cap.
    pub fn advance(&mut self) -> Duration {
        let delay = self.next;
        self.next = Duration::from_secs_f64(
            (delay.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    /// Next delay to sleep: the base schedule plus 0-500ms of jitter.
    pub fn next_delay(&mut self) -> Duration {
        self.advance() + jitter()
    }

    /// Back to the initial delay, after a successful connect.
    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

/// Simple jitter: random 0-500ms using the clock's subsecond nanos.
fn jitter() -> Duration {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    Duration::from_millis((nanos % 500) as u64)
}
