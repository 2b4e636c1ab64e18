//! POST code UART task
//!
//! Owns the monitor and drives its poll loop. Each published code is
//! logged as `POST 19h @ Uptime(1234) | 12 ms`.

use defmt::*;
use embassy_futures::yield_now;
use embassy_rp::uart::BufferedUartRx;
use embassy_time::Timer;
use portable_atomic::Ordering;

use bpc_core::code_table::CodeTable;
use bpc_core::config::MonitorConfig;
use bpc_core::{ClockAdapter, Classifier, DecodedEvent, Dispatch, PostCodeMonitor};
use bpc_hal::IoRx;

use crate::channels::{CODES_DECODED, CODES_IGNORED, READ_ERRORS};
use crate::clock::UptimeClock;
use crate::sensors::{CodeSensor, TextSensor};

/// POST code task - decodes the UART byte stream and publishes codes
#[embassy_executor::task]
pub async fn post_code_task(rx: BufferedUartRx, config: &'static MonitorConfig) {
    info!("POST code task started");

    let classifier = match config.classifier() {
        Ok(classifier) => classifier,
        Err(e) => {
            error!("Failed to build code table: {:?}", e);
            Classifier::new(CodeTable::new(), config.ignore_set(), config.text_format)
        }
    };

    let clock = ClockAdapter::uptime_only(UptimeClock);
    let mut monitor = PostCodeMonitor::new(IoRx::new(rx), clock, classifier, config.settings)
        .with_code_sensor(CodeSensor)
        .with_text_sensor(TextSensor);

    let flushed = monitor.setup();
    if flushed > 0 {
        warn!("cleared {} RX bytes", flushed);
    }

    loop {
        let report = monitor.poll_with(log_dispatch);

        if report.decoded > 0 {
            CODES_DECODED.fetch_add(report.decoded as u32, Ordering::Relaxed);
            CODES_IGNORED.fetch_add(report.ignored as u32, Ordering::Relaxed);
        }

        if let Some(e) = report.read_error {
            READ_ERRORS.fetch_add(1, Ordering::Relaxed);
            warn!("UART read error: {:?}", e);
        }

        if let Some(transition) = report.clock_transition {
            info!(
                "Timestamps now wall-clock ({} ms) from uptime {} ms",
                transition.wall_ms, transition.uptime_ms
            );
        }

        if report.mode_changed {
            debug!("Loop mode: {:?}", report.mode);
        }

        if report.next_poll_ms == 0 {
            yield_now().await;
        } else {
            Timer::after_millis(report.next_poll_ms).await;
        }
    }
}

fn log_dispatch(event: &DecodedEvent, outcome: Dispatch) {
    match outcome {
        Dispatch::Published {
            code,
            delta_ms: Some(delta),
            ..
        } => info!("POST {} @ {} | {} ms", code, event.timestamp, delta),
        Dispatch::Published { code, .. } => info!("POST {} @ {}", code, event.timestamp),
        Dispatch::Ignored(code) => trace!("POST {} ignored", code),
    }
}
