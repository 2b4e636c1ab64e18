//! Uptime source for the monitor

use bpc_hal::MonotonicClock;
use embassy_time::Instant;

/// Milliseconds since boot from the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct UptimeClock;

impl MonotonicClock for UptimeClock {
    fn uptime_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
