//! Wall-clock abstraction for the anytime search loop.
//!
//! The search polls a [`Deadline`] once per iteration and never mid-rollout, so any
//! [`Clock`] only needs to be monotonic. Tests drive the loop with [`ManualClock`].

use std::cell::Cell;
use std::time::Duration;

pub trait Clock {
    /// Monotonic time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
}

/// Real time: `Instant` natively, `Date.now()` in the browser where `Instant` is unavailable.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    origin: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    origin_ms: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            origin: std::time::Instant::now(),
            #[cfg(target_arch = "wasm32")]
            origin_ms: js_sys::Date::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    #[cfg(target_arch = "wasm32")]
    fn now(&self) -> Duration {
        Duration::from_secs_f64(((js_sys::Date::now() - self.origin_ms) / 1000.0).max(0.0))
    }
}

/// Deterministic clock that advances by a fixed step every time it is read.
#[derive(Debug)]
pub struct ManualClock {
    current: Cell<Duration>,
    step: Duration,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        Self {
            current: Cell::new(Duration::ZERO),
            step,
        }
    }

    /// A clock that never advances on its own; move it with [`ManualClock::advance`].
    pub fn frozen() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let now = self.current.get();
        self.current.set(now + self.step);
        now
    }
}

/// Search start plus a fixed budget.
pub struct Deadline<'a> {
    clock: &'a dyn Clock,
    end: Duration,
}

impl<'a> Deadline<'a> {
    pub fn after(clock: &'a dyn Clock, budget: Duration) -> Self {
        let end = clock.now() + budget;
        Self { clock, end }
    }

    pub fn expired(&self) -> bool {
        self.clock.now() >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_expires_after_budgeted_polls() {
        let clock = ManualClock::new(Duration::from_millis(1));
        let deadline = Deadline::after(&clock, Duration::from_millis(3));
        // Start read at 0 ms; polls observe 1, 2, 3 ms.
        assert!(!deadline.expired());
        assert!(!deadline.expired());
        assert!(deadline.expired());
    }

    #[test]
    fn zero_budget_is_expired_immediately() {
        let clock = ManualClock::frozen();
        assert!(Deadline::after(&clock, Duration::ZERO).expired());
    }

    #[test]
    fn frozen_clock_moves_only_when_advanced() {
        let clock = ManualClock::frozen();
        let deadline = Deadline::after(&clock, Duration::from_secs(1));
        assert!(!deadline.expired());
        clock.advance(Duration::from_secs(1));
        assert!(deadline.expired());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
