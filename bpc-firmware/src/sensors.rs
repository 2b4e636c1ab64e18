//! Sensor sinks
//!
//! Forward published values to the report task through `SENSOR_CHANNEL`.
//! Publishing never blocks the POST code task; when the channel is full
//! the update is dropped and counted.

use defmt::*;
use heapless::String;

use bpc_core::{NumericSink, TextSink};

use crate::channels::{publish, SensorUpdate};

/// Numeric POST code sensor
pub struct CodeSensor;

impl NumericSink for CodeSensor {
    fn publish_value(&mut self, value: f32) {
        publish(SensorUpdate::Code(value));
    }

    fn invalidate(&mut self) {
        publish(SensorUpdate::CodeInvalidated);
    }
}

/// Text POST code sensor
pub struct TextSensor;

impl TextSink for TextSensor {
    fn publish_text(&mut self, text: &str) {
        match String::try_from(text) {
            Ok(text) => publish(SensorUpdate::Text(text)),
            Err(_) => warn!("Text sensor value too long ({} bytes)", text.len()),
        }
    }

    fn invalidate(&mut self) {
        publish(SensorUpdate::TextInvalidated);
    }
}
