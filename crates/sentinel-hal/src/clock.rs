//! [`Clock`] – scheduled delays for settle, segment and stabilisation pauses.
//!
//! Motion primitives never call `thread::sleep` directly.  They ask a
//! [`Clock`] to wait, which keeps the "blocks until settled" contract
//! explicit and lets tests substitute a [`ManualClock`] that records the
//! requested delays and returns immediately.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Source of blocking delays.
pub trait Clock: Send + Sync {
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Test clock: records every requested delay without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    delays: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in call order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all requested delays.
    pub fn elapsed(&self) -> Duration {
        self.delays().iter().sum()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}
