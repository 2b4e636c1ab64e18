//! Clock abstractions
//!
//! Every device has a monotonic uptime counter. A real-time clock (SNTP,
//! an RTC chip, a host-provided time) is optional and may not have a valid
//! time yet.

/// Monotonic device uptime
pub trait MonotonicClock {
    /// Milliseconds since boot; never decreases
    fn uptime_ms(&self) -> u64;
}

/// State of the optional wall-clock source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockStatus {
    /// No real-time clock configured
    Unbound,
    /// Clock configured but has not acquired a valid time
    Unsynchronized,
    /// Valid wall-clock time, milliseconds since the Unix epoch
    Synchronized(u64),
}

impl ClockStatus {
    /// Check if a valid wall-clock time is available
    pub fn is_synchronized(&self) -> bool {
        matches!(self, ClockStatus::Synchronized(_))
    }
}

/// Optional wall-clock source
pub trait RealTimeClock {
    /// Current wall-clock state
    fn status(&self) -> ClockStatus;
}

/// Binding used when no real-time clock is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl RealTimeClock for NoClock {
    fn status(&self) -> ClockStatus {
        ClockStatus::Unbound
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn uptime_ms(&self) -> u64 {
        (**self).uptime_ms()
    }
}

impl<C: RealTimeClock + ?Sized> RealTimeClock for &C {
    fn status(&self) -> ClockStatus {
        (**self).status()
    }
}
