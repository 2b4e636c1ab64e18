//! Sensor report task
//!
//! Consumes sensor updates and logs a periodic summary of the counters
//! shared with the POST code task.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};
use portable_atomic::Ordering;

use crate::channels::{
    SensorUpdate, CODES_DECODED, CODES_IGNORED, READ_ERRORS, SENSOR_CHANNEL, UPDATES_DROPPED,
};

/// Summary interval in seconds
pub const SUMMARY_INTERVAL_S: u64 = 60;

/// Report task - logs sensor state changes
#[embassy_executor::task]
pub async fn report_task() {
    info!("Report task started");

    let mut ticker = Ticker::every(Duration::from_secs(SUMMARY_INTERVAL_S));

    loop {
        match select(SENSOR_CHANNEL.receive(), ticker.next()).await {
            Either::First(update) => match update {
                SensorUpdate::Code(value) => debug!("post_code = {}", value),
                SensorUpdate::Text(text) => debug!("post_code_text = \"{}\"", text.as_str()),
                SensorUpdate::CodeInvalidated => debug!("post_code has no state"),
                SensorUpdate::TextInvalidated => debug!("post_code_text has no state"),
            },
            Either::Second(()) => {
                let dropped = UPDATES_DROPPED.swap(0, Ordering::Relaxed);
                if dropped > 0 {
                    warn!("Sensor channel full, dropped {} updates", dropped);
                }
                info!(
                    "Decoded {} codes ({} ignored), {} read errors",
                    CODES_DECODED.load(Ordering::Relaxed),
                    CODES_IGNORED.load(Ordering::Relaxed),
                    READ_ERRORS.load(Ordering::Relaxed)
                );
            }
        }
    }
}
