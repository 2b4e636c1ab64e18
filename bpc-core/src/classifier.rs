//! Classifier and dispatcher
//!
//! For every decoded event, in arrival order:
//! 1. drop it if the code is in the ignore set (counted, nothing else);
//! 2. look up the description, defaulting to the empty string;
//! 3. replace the last-observed record as a whole;
//! 4. publish the code to the numeric sink and the rendered text to the
//!    text sink.

use core::fmt::Write;

use heapless::String;

use crate::code_table::{CodeTable, IgnoreSet, TableError};
use crate::config::{MonitorConfig, MAX_DESC_LEN, MAX_TEXT_LEN};
use crate::event::{DecodedEvent, PostCode, Timestamp};
use crate::traits::{NumericSink, TextSink};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Deltas at or above this are left out of `CodeWithDelta` text
pub const DELTA_DISPLAY_LIMIT_MS: u64 = 5000;

/// How the text sink value is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextFormat {
    /// Configured description, or empty
    #[default]
    Description,
    /// `19h | 12 ms` (delta to the previous code, when under 5 s)
    CodeWithDelta,
    /// `19h Memory Init`, or `19h` when undescribed
    CodeAndDescription,
}

/// Most recent accepted (non-ignored) event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LastObserved {
    pub code: PostCode,
    pub description: Option<String<MAX_DESC_LEN>>,
    pub timestamp: Timestamp,
}

/// What happened to one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// Code is in the ignore set; nothing published
    Ignored(PostCode),
    /// Code published to both sinks
    Published {
        code: PostCode,
        /// A description was configured for the code
        described: bool,
        /// Milliseconds since the previous accepted code on the same clock;
        /// `None` for the first accepted code, which has no predecessor
        delta_ms: Option<u64>,
    },
}

/// Maps codes to descriptions and publishes them
#[derive(Debug, Clone)]
pub struct Classifier {
    table: CodeTable,
    ignore: IgnoreSet,
    format: TextFormat,
    last: Option<LastObserved>,
    seen: u32,
    ignored: u32,
    published: u32,
}

impl Classifier {
    /// Create a classifier over a built table and ignore set
    pub fn new(table: CodeTable, ignore: IgnoreSet, format: TextFormat) -> Self {
        Self {
            table,
            ignore,
            format,
            last: None,
            seen: 0,
            ignored: 0,
            published: 0,
        }
    }

    /// Build the table and ignore set from configuration
    pub fn from_config(config: &MonitorConfig) -> Result<Self, TableError> {
        Ok(Self::new(
            config.code_table()?,
            config.ignore_set(),
            config.text_format,
        ))
    }

    /// Classify one event and publish it unless ignored
    pub fn dispatch<N, T>(&mut self, event: DecodedEvent, numeric: &mut N, text: &mut T) -> Dispatch
    where
        N: NumericSink + ?Sized,
        T: TextSink + ?Sized,
    {
        let code = event.code;
        self.seen = self.seen.wrapping_add(1);

        if self.ignore.is_ignored(code) {
            self.ignored = self.ignored.wrapping_add(1);
            return Dispatch::Ignored(code);
        }

        let description = self.table.lookup(code);
        let delta_ms = self
            .last
            .as_ref()
            .and_then(|last| event.timestamp.millis_since(&last.timestamp));
        let rendered = render_text(self.format, code, description, delta_ms);

        self.last = Some(LastObserved {
            code,
            description: description.and_then(|d| String::try_from(d).ok()),
            timestamp: event.timestamp,
        });

        numeric.publish_value(f32::from(code.value()));
        text.publish_text(&rendered);
        self.published = self.published.wrapping_add(1);

        Dispatch::Published {
            code,
            described: description.is_some(),
            delta_ms,
        }
    }

    /// Most recent accepted event
    pub fn last(&self) -> Option<&LastObserved> {
        self.last.as_ref()
    }

    /// Description for `code`, if configured
    pub fn lookup(&self, code: PostCode) -> Option<&str> {
        self.table.lookup(code)
    }

    /// Check if `code` is suppressed
    pub fn is_ignored(&self, code: PostCode) -> bool {
        self.ignore.is_ignored(code)
    }

    /// Text rendering in use
    pub fn format(&self) -> TextFormat {
        self.format
    }

    /// Events seen, including ignored ones (wrapping)
    pub fn seen(&self) -> u32 {
        self.seen
    }

    /// Events dropped by the ignore set (wrapping)
    pub fn ignored(&self) -> u32 {
        self.ignored
    }

    /// Events published (wrapping)
    pub fn published(&self) -> u32 {
        self.published
    }
}

/// Render the text sink value for a code
pub fn render_text(
    format: TextFormat,
    code: PostCode,
    description: Option<&str>,
    delta_ms: Option<u64>,
) -> String<MAX_TEXT_LEN> {
    let mut text = String::new();

    // Capacity covers the longest rendering, so writes cannot fail
    let _ = match format {
        TextFormat::Description => text.push_str(description.unwrap_or("")).map_err(|_| core::fmt::Error),
        TextFormat::CodeWithDelta => match delta_ms {
            Some(delta) if delta < DELTA_DISPLAY_LIMIT_MS => write!(text, "{} | {} ms", code, delta),
            _ => write!(text, "{}", code),
        },
        TextFormat::CodeAndDescription => match description {
            Some(desc) => write!(text, "{} {}", code, desc),
            None => write!(text, "{}", code),
        },
    };

    text
}
