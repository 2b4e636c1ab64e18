//! Sensor sink traits
//!
//! Sinks are fire-and-forget. Deduplicating repeated identical values is
//! the sink's business; the classifier publishes every accepted code.

/// Sensor receiving the POST code as a measurement
pub trait NumericSink {
    /// Publish a new measurement
    fn publish_value(&mut self, value: f32);

    /// Mark the sensor as having no state yet
    fn invalidate(&mut self) {}
}

/// Sensor receiving the rendered POST code text
pub trait TextSink {
    /// Publish a new text value
    fn publish_text(&mut self, text: &str);

    /// Mark the sensor as having no state yet
    fn invalidate(&mut self) {}
}

/// No numeric sensor configured
impl NumericSink for () {
    fn publish_value(&mut self, _value: f32) {}
}

/// No text sensor configured
impl TextSink for () {
    fn publish_text(&mut self, _text: &str) {}
}

impl<S: NumericSink + ?Sized> NumericSink for &mut S {
    fn publish_value(&mut self, value: f32) {
        (**self).publish_value(value)
    }

    fn invalidate(&mut self) {
        (**self).invalidate()
    }
}

impl<S: TextSink + ?Sized> TextSink for &mut S {
    fn publish_text(&mut self, text: &str) {
        (**self).publish_text(text)
    }

    fn invalidate(&mut self) {
        (**self).invalidate()
    }
}
