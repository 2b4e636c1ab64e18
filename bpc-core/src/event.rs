//! POST codes and decoded events

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An 8-bit POST code as written by the firmware to the debug port
///
/// No value is special: 0x00 and 0xFF are codes like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PostCode(pub u8);

impl PostCode {
    /// Raw byte value
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Table index for this code (0-255)
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for PostCode {
    fn from(value: u8) -> Self {
        PostCode(value)
    }
}

impl From<PostCode> for u8 {
    fn from(code: PostCode) -> Self {
        code.0
    }
}

/// Renders as two uppercase hex digits with an `h` suffix, e.g. `19h`
impl fmt::Display for PostCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}h", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PostCode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u8:02X}h", self.0);
    }
}

/// When an event was observed, in milliseconds
///
/// The variant records which clock produced the value; the two are never
/// mixed inside one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Timestamp {
    /// Milliseconds since boot
    Uptime(u64),
    /// Milliseconds since the Unix epoch
    WallClock(u64),
}

impl Timestamp {
    /// Raw millisecond value, regardless of source
    pub fn as_millis(&self) -> u64 {
        match *self {
            Timestamp::Uptime(ms) | Timestamp::WallClock(ms) => ms,
        }
    }

    /// Check if both timestamps come from the same clock
    pub fn same_source(&self, other: &Timestamp) -> bool {
        matches!(
            (self, other),
            (Timestamp::Uptime(_), Timestamp::Uptime(_))
                | (Timestamp::WallClock(_), Timestamp::WallClock(_))
        )
    }

    /// Milliseconds elapsed since `earlier`
    ///
    /// Returns `None` if the two timestamps come from different clocks.
    pub fn millis_since(&self, earlier: &Timestamp) -> Option<u64> {
        if !self.same_source(earlier) {
            return None;
        }
        Some(self.as_millis().saturating_sub(earlier.as_millis()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Uptime(ms) => write!(f, "{} ms", ms),
            Timestamp::WallClock(ms) => write!(f, "unix {} ms", ms),
        }
    }
}

/// One POST code recognized on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedEvent {
    pub code: PostCode,
    pub timestamp: Timestamp,
}
