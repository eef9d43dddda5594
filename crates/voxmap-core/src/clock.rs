//! Monotonic time source used for frame budgets and debounce windows.
//!
//! Time is a [`Duration`] since an arbitrary epoch rather than `Instant`, so
//! tests can inject a [`ManualClock`] and step it deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic timestamps.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`], with the epoch at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Deterministic clock for tests.
///
/// Time only moves through [`ManualClock::advance`], or by `tick` on every
/// [`Clock::now`] read when constructed with [`ManualClock::auto_advancing`].
/// The latter simulates work that costs a fixed amount per budget check.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: AtomicU64,
    tick_ns: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_advancing(tick: Duration) -> Self {
        Self {
            now_ns: AtomicU64::new(0),
            tick_ns: tick.as_nanos() as u64,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ns.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.now_ns.store(at.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let ns = self.now_ns.fetch_add(self.tick_ns, Ordering::SeqCst);
        Duration::from_nanos(ns)
    }
}
