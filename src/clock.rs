//! Injectable time source.
//!
//! Every component that measures age reads time through a [`Clock`] handle
//! instead of sampling the system clock directly, so expiration behavior is
//! fully deterministic under a substituted clock in tests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

/// A source of the current time.
pub trait Clock {
    fn now(&self) -> SystemTime;
}

/// The production clock: reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A manually driven clock for deterministic tests and simulations.
///
/// Share it via `Rc` with the components under test, then move time forward
/// explicitly:
///
/// ```rust
/// use std::rc::Rc;
/// use std::time::{Duration, SystemTime};
/// use geogrid::{Clock, ManualClock};
///
/// let clock = Rc::new(ManualClock::starting_at(SystemTime::UNIX_EPOCH));
/// let start = clock.now();
/// clock.advance(Duration::from_secs(120));
/// assert_eq!(clock.now(), start + Duration::from_secs(120));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    current: Cell<SystemTime>,
}

impl ManualClock {
    pub fn starting_at(start: SystemTime) -> Self {
        ManualClock {
            current: Cell::new(start),
        }
    }

    /// Set the current time to an absolute instant.
    pub fn set(&self, instant: SystemTime) {
        self.current.set(instant);
    }

    /// Advance the current time by a delta.
    pub fn advance(&self, delta: Duration) {
        self.current.set(self.current.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.current.get()
    }
}

/// The default clock handle used when no clock is injected.
pub(crate) fn system_clock() -> Rc<dyn Clock> {
    Rc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::starting_at(SystemTime::UNIX_EPOCH);
        clock.advance(Duration::from_secs(90));
        assert_eq!(
            clock.now(),
            SystemTime::UNIX_EPOCH + Duration::from_secs(90)
        );

        clock.set(SystemTime::UNIX_EPOCH);
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH);
    }
}
