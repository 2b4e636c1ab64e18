//! Clock adapter
//!
//! Timestamps events with wall-clock time once a real-time clock has a
//! valid time, and with device uptime before that.
//!
//! After the first synchronized reading the adapter keeps an anchor
//! `(wall_ms, uptime_ms)`. If the clock later reports unsynchronized, wall
//! time is extrapolated from the anchor, so the timestamp source switches
//! exactly once (uptime to wall-clock) and never back. Wall-clock values
//! handed out never decrease, even if the clock is stepped backwards.

use bpc_hal::{ClockStatus, MonotonicClock, NoClock, RealTimeClock};

use crate::event::Timestamp;

/// The clock source switched from uptime to wall-clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockTransition {
    /// Device uptime when the switch happened
    pub uptime_ms: u64,
    /// First wall-clock value handed out
    pub wall_ms: u64,
}

/// Chooses the timestamp source for decoded events
#[derive(Debug)]
pub struct ClockAdapter<M, R = NoClock> {
    monotonic: M,
    rtc: R,
    /// Last synchronized reading as (wall_ms, uptime_ms)
    anchor: Option<(u64, u64)>,
    /// Highest wall-clock value handed out
    last_wall_ms: u64,
    transition: Option<ClockTransition>,
}

impl<M: MonotonicClock> ClockAdapter<M, NoClock> {
    /// Adapter with no real-time clock bound
    pub fn uptime_only(monotonic: M) -> Self {
        Self::new(monotonic, NoClock)
    }
}

impl<M: MonotonicClock, R: RealTimeClock> ClockAdapter<M, R> {
    /// Create a new adapter
    pub fn new(monotonic: M, rtc: R) -> Self {
        Self {
            monotonic,
            rtc,
            anchor: None,
            last_wall_ms: 0,
            transition: None,
        }
    }

    /// Current time for a new event
    pub fn now(&mut self) -> Timestamp {
        let uptime_ms = self.monotonic.uptime_ms();

        let wall_ms = match self.rtc.status() {
            ClockStatus::Synchronized(wall_ms) => {
                if self.anchor.is_none() {
                    self.transition = Some(ClockTransition { uptime_ms, wall_ms });
                }
                self.anchor = Some((wall_ms, uptime_ms));
                wall_ms
            }
            ClockStatus::Unbound | ClockStatus::Unsynchronized => match self.anchor {
                Some((anchor_wall, anchor_uptime)) => {
                    anchor_wall + uptime_ms.saturating_sub(anchor_uptime)
                }
                None => return Timestamp::Uptime(uptime_ms),
            },
        };

        self.last_wall_ms = self.last_wall_ms.max(wall_ms);
        Timestamp::WallClock(self.last_wall_ms)
    }

    /// Device uptime in milliseconds
    pub fn uptime_ms(&self) -> u64 {
        self.monotonic.uptime_ms()
    }

    /// Current state of the bound real-time clock
    pub fn status(&self) -> ClockStatus {
        self.rtc.status()
    }

    /// Check if timestamps are wall-clock based
    pub fn is_wall_clock(&self) -> bool {
        self.anchor.is_some()
    }

    /// Take the pending uptime-to-wall-clock transition, if one happened
    pub fn take_transition(&mut self) -> Option<ClockTransition> {
        self.transition.take()
    }

    /// Access the monotonic clock
    pub fn monotonic(&self) -> &M {
        &self.monotonic
    }
}
