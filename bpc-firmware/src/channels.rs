//! Inter-task communication channels
//!
//! Defines the static channels and counters shared between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;
use portable_atomic::{AtomicU32, Ordering};

use bpc_core::config::MAX_TEXT_LEN;

/// Channel capacity for sensor updates
const SENSOR_CHANNEL_SIZE: usize = 16;

/// A value published by one of the POST code sensors
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorUpdate {
    /// Numeric sensor has no state
    CodeInvalidated,
    /// Numeric sensor value
    Code(f32),
    /// Text sensor has no state
    TextInvalidated,
    /// Text sensor value
    Text(String<MAX_TEXT_LEN>),
}

/// Sensor values from the POST code task to the report task
pub static SENSOR_CHANNEL: Channel<CriticalSectionRawMutex, SensorUpdate, SENSOR_CHANNEL_SIZE> =
    Channel::new();

/// Codes decoded from the UART, ignored ones included
pub static CODES_DECODED: AtomicU32 = AtomicU32::new(0);

/// Codes dropped by the ignore set
pub static CODES_IGNORED: AtomicU32 = AtomicU32::new(0);

/// UART read errors
pub static READ_ERRORS: AtomicU32 = AtomicU32::new(0);

/// Sensor updates dropped because the channel was full
pub static UPDATES_DROPPED: AtomicU32 = AtomicU32::new(0);

/// Queue a sensor update, counting it as dropped if the channel is full
pub fn publish(update: SensorUpdate) {
    if SENSOR_CHANNEL.try_send(update).is_err() {
        UPDATES_DROPPED.fetch_add(1, Ordering::Relaxed);
    }
}
