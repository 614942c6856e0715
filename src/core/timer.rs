//! Clocks and cancellable timers
//!
//! Everything that happens "later" in the terminal (character reveal,
//! resize debounce, initial fit attempts) is a `Timer` polled from the
//! event loop. Nothing blocks and nothing runs on another thread.

#[cfg(test)]
use std::cell::Cell;
#[cfg(test)]
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock used by the real program
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the session under test.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    /// Move time forward by whole milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// A single pending deadline
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm the timer, replacing any pending deadline
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once when the deadline has passed, then disarms.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Coalesces bursts of triggers into one event after a quiet period
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    delay: Duration,
    timer: Timer,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timer: Timer::new(),
        }
    }

    /// Record an event; the quiet period restarts from `now`
    pub fn trigger(&mut self, now: Instant) {
        self.timer.schedule(now, self.delay);
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        self.timer.fire(now)
    }
}
