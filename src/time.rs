//! Clock abstraction and microsecond arithmetic.
//!
//! The original engine samples `gettimeofday()` directly and subtracts
//! `timeval`s with manual carry handling. `std::time::Instant`/`Duration`
//! already perform that subtraction purely (no mutation of either
//! operand), so there is no `timeval_diff` to port here beyond picking a
//! monotonic source. The `Clock` trait exists so tests can inject a fake,
//! deterministic clock instead of sleeping real wall-clock time.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

/// Production clock backed by the monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Difference in whole microseconds between two monotonic instants,
/// saturating at zero if `earlier` is after `later` (can happen with a
/// fake clock under test misuse, never under `SystemClock`).
pub fn micros_between(later: Instant, earlier: Instant) -> u64 {
    later
        .checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
        .as_micros() as u64
}

/// Deterministic clock for unit and integration tests. Not behind
/// `#[cfg(test)]` because `tests/` integration tests link the crate
/// without that cfg and still need it.
pub mod fake {
    use super::Clock;
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    /// Deterministic clock for tests: starts at an arbitrary epoch and only
    /// advances when `advance` is called.
    pub struct FakeClock {
        now: Cell<Instant>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self {
                now: Cell::new(Instant::now()),
            }
        }

        pub fn advance(&self, d: Duration) {
            self.now.set(self.now.get() + d);
        }

        pub fn advance_us(&self, us: u64) {
            self.advance(Duration::from_micros(us));
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.now.get()
        }
    }

    impl Clock for std::rc::Rc<FakeClock> {
        fn now(&self) -> Instant {
            (**self).now()
        }
    }
}
