//! Time, delay, and randomness abstractions

/// Monotonic wall-clock milliseconds since boot
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Blocking delays.
///
/// Implementations may yield to other work while waiting; the caller only
/// relies on "at least this long".
pub trait Delay {
    fn delay_us(&mut self, us: u32);

    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// Free-running CPU cycle counter, wrapping at 2^32.
///
/// Used with [`crate::timing::busy_wait`] for sub-microsecond holds in the
/// panel driver's fallback mode.
pub trait CycleCounter {
    fn count(&self) -> u32;
}

/// Source of the random ping-reply jitter
pub trait JitterSource {
    /// A value uniformly below `bound_us` (microseconds)
    fn jitter_us(&mut self, bound_us: u32) -> u32;
}

/// A hardware-timed region: interrupts disabled on the current core for
/// the duration of one closure.
///
/// This is not a locking primitive. The closure must complete within
/// [`crate::timing::MAX_TIMED_NS`] nanoseconds; every interrupt on this
/// core is delayed by that window, so its length is a design constraint.
pub trait TimedRegion {
    fn with_disabled<R>(&mut self, f: impl FnOnce() -> R) -> R;
}
