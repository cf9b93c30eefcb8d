//! Protocol time, advanced explicitly rather than read from a wall clock.

/// Milliseconds, either a point in time or a duration.
pub type Millis = u64;

/// A monotonic clock which only moves when told to.
///
/// Components own one of these and advance it from their `tick(...)` method,
/// which keeps all timeouts deterministic under test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Clock {
    now: Millis,
}

impl Clock {
    /// Creates a clock starting at time zero.
    pub fn new() -> Clock {
        Clock { now: 0 }
    }

    /// Returns the current time.
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&mut self, elapsed: Millis) -> Millis {
        self.now = self.now.saturating_add(elapsed);
        self.now
    }
}
