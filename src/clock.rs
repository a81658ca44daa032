//! Wall-clock sources for deadline arithmetic
//!
//! Deadlines are absolute epoch milliseconds so they survive process death.
//! Everything that compares "now" against a deadline goes through [`Clock`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds
    fn now_millis(&self) -> i64;
}

/// The system wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Epoch clock that advances with tokio's clock.
///
/// Under `#[tokio::test(start_paused = true)]` this moves only when the test
/// advances time, which keeps countdown and alarm tests deterministic.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch_at_anchor: i64,
    anchor: tokio::time::Instant,
}

impl TokioClock {
    pub fn anchored_at(epoch_millis: i64) -> Self {
        Self {
            epoch_at_anchor: epoch_millis,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> i64 {
        let elapsed = tokio::time::Instant::now().duration_since(self.anchor);
        self.epoch_at_anchor + elapsed.as_millis() as i64
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(epoch_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(epoch_millis),
        }
    }

    pub fn set(&self, epoch_millis: i64) {
        self.now.store(epoch_millis, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
