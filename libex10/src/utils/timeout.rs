//! Timeout helpers used across the crate.
//!
//! Every blocking wait in the driver is a bounded spin. These helpers keep
//! the default budgets in one place and give the spin loops a small deadline
//! type to poll against.

use std::time::{Duration, Instant};

/// Default time to wait for READY_N before a command or response transfer.
pub const NOMINAL_READY_N_TIMEOUT_MS: u64 = 2500;

/// Default time to wait for an op to clear its busy bit.
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 10_000;

/// Convert milliseconds to Duration.
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Convenience: nominal READY_N timeout as Duration.
pub fn default_ready_n_timeout() -> Duration {
    ms(NOMINAL_READY_N_TIMEOUT_MS)
}

/// Point in time after which a spin loop gives up.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `timeout_ms` from now.
    pub fn after_ms(timeout_ms: u64) -> Self {
        Self {
            start: Instant::now(),
            budget: ms(timeout_ms),
        }
    }

    /// The budget has run out.
    pub fn expired(&self) -> bool {
        self.start.elapsed() >= self.budget
    }

    /// Time since the deadline was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Block the calling thread for `delay_ms` milliseconds.
pub fn busy_wait_ms(delay_ms: u64) {
    if delay_ms > 0 {
        std::thread::sleep(ms(delay_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_to_duration() {
        assert_eq!(ms(500).as_millis(), 500);
    }

    #[test]
    fn zero_deadline_is_expired() {
        assert!(Deadline::after_ms(0).expired());
    }

    #[test]
    fn long_deadline_not_expired() {
        let d = Deadline::after_ms(60_000);
        assert!(!d.expired());
        assert!(d.elapsed() < ms(60_000));
    }
}
