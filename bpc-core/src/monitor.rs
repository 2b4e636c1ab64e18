//! POST code monitor
//!
//! Ties the decoder, clock adapter and classifier to a UART and two
//! sensor sinks. The host calls [`PostCodeMonitor::setup`] once and then
//! [`PostCodeMonitor::poll`] repeatedly from its cooperative loop; each
//! poll runs to completion without blocking and reports when it would
//! like to be called again.

use bpc_hal::{MonotonicClock, NoClock, RealTimeClock, UartRx};

use crate::classifier::{Classifier, Dispatch, LastObserved};
use crate::clock::{ClockAdapter, ClockTransition};
use crate::code_table::TableError;
use crate::config::MonitorConfig;
use crate::decoder::{Decoder, PollBudget};
use crate::event::DecodedEvent;
use crate::traits::{NumericSink, TextSink};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Poll scheduling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorSettings {
    /// Time slice for one poll and for the boot flush
    pub slice_ms: u64,
    /// Maximum codes decoded per poll (0 is treated as 1)
    pub max_codes_per_poll: usize,
    /// Stay in burst mode this long after the last code
    pub burst_hold_ms: u64,
    /// Requested poll interval in burst mode
    pub burst_interval_ms: u64,
    /// Requested poll interval when idle
    pub idle_interval_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            slice_ms: 100,
            max_codes_per_poll: 256,
            burst_hold_ms: 200,
            burst_interval_ms: 1,
            idle_interval_ms: 16,
        }
    }
}

/// Polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopMode {
    /// No recent codes
    #[default]
    Idle,
    /// Codes arrived within `burst_hold_ms`
    Burst,
}

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollReport<E> {
    /// Codes decoded, ignored ones included
    pub decoded: usize,
    /// Codes published to the sinks
    pub published: usize,
    /// Codes dropped by the ignore set
    pub ignored: usize,
    /// Transport error that cut this poll short
    pub read_error: Option<E>,
    /// Bytes read but not decoded yet
    pub pending: usize,
    /// Cadence after this poll
    pub mode: LoopMode,
    /// `mode` differs from the previous poll
    pub mode_changed: bool,
    /// Suggested delay before the next poll (0 = immediately)
    pub next_poll_ms: u64,
    /// Timestamps switched to wall-clock during this poll
    pub clock_transition: Option<ClockTransition>,
}

/// Decoder, classifier and sinks bound to one UART
pub struct PostCodeMonitor<U, M, R = NoClock, N = (), T = ()> {
    uart: U,
    clock: ClockAdapter<M, R>,
    decoder: Decoder,
    classifier: Classifier,
    numeric: N,
    text: T,
    settings: MonitorSettings,
    mode: LoopMode,
    last_code_uptime_ms: Option<u64>,
}

impl<U, M, R> PostCodeMonitor<U, M, R>
where
    U: UartRx,
    M: MonotonicClock,
    R: RealTimeClock,
{
    /// Create a monitor with no sensors attached
    pub fn new(
        uart: U,
        clock: ClockAdapter<M, R>,
        classifier: Classifier,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            uart,
            clock,
            decoder: Decoder::new(),
            classifier,
            numeric: (),
            text: (),
            settings,
            mode: LoopMode::Idle,
            last_code_uptime_ms: None,
        }
    }

    /// Create a monitor from parsed configuration
    pub fn from_config(
        uart: U,
        clock: ClockAdapter<M, R>,
        config: &MonitorConfig,
    ) -> Result<Self, TableError> {
        Ok(Self::new(uart, clock, config.classifier()?, config.settings))
    }
}

impl<U, M, R, N, T> PostCodeMonitor<U, M, R, N, T>
where
    U: UartRx,
    M: MonotonicClock,
    R: RealTimeClock,
    N: NumericSink,
    T: TextSink,
{
    /// Attach the numeric POST code sensor
    pub fn with_code_sensor<N2: NumericSink>(self, numeric: N2) -> PostCodeMonitor<U, M, R, N2, T> {
        PostCodeMonitor {
            uart: self.uart,
            clock: self.clock,
            decoder: self.decoder,
            classifier: self.classifier,
            numeric,
            text: self.text,
            settings: self.settings,
            mode: self.mode,
            last_code_uptime_ms: self.last_code_uptime_ms,
        }
    }

    /// Attach the text POST code sensor
    pub fn with_text_sensor<T2: TextSink>(self, text: T2) -> PostCodeMonitor<U, M, R, N, T2> {
        PostCodeMonitor {
            uart: self.uart,
            clock: self.clock,
            decoder: self.decoder,
            classifier: self.classifier,
            numeric: self.numeric,
            text,
            settings: self.settings,
            mode: self.mode,
            last_code_uptime_ms: self.last_code_uptime_ms,
        }
    }

    /// Invalidate the sensors and discard bytes left over from before boot
    ///
    /// Flushes for at most one time slice. Returns the number of bytes
    /// discarded.
    pub fn setup(&mut self) -> usize {
        self.numeric.invalidate();
        self.text.invalidate();

        let deadline_ms = self
            .clock
            .uptime_ms()
            .saturating_add(self.settings.slice_ms);
        self.decoder
            .drain(&mut self.uart, self.clock.monotonic(), deadline_ms)
    }

    /// Decode and publish whatever the UART has buffered
    pub fn poll(&mut self) -> PollReport<U::Error> {
        self.poll_with(|_, _| {})
    }

    /// Like [`poll`](Self::poll), also calling `observe` for every
    /// decoded event with what the classifier did with it
    pub fn poll_with<F>(&mut self, mut observe: F) -> PollReport<U::Error>
    where
        F: FnMut(&DecodedEvent, Dispatch),
    {
        let start_ms = self.clock.uptime_ms();
        let budget = PollBudget {
            max_codes: self.settings.max_codes_per_poll.max(1),
            deadline_ms: start_ms.saturating_add(self.settings.slice_ms),
        };

        let mut published = 0;
        let mut ignored = 0;
        let classifier = &mut self.classifier;
        let numeric = &mut self.numeric;
        let text = &mut self.text;

        let stats = self
            .decoder
            .poll(&mut self.uart, &mut self.clock, budget, |event| {
                let outcome = classifier.dispatch(event, numeric, text);
                match outcome {
                    Dispatch::Ignored(_) => ignored += 1,
                    Dispatch::Published { .. } => published += 1,
                }
                observe(&event, outcome);
            });

        let now_ms = self.clock.uptime_ms();
        let previous = self.mode;
        self.update_mode(stats.decoded > 0, now_ms);

        let pending = self.decoder.pending();
        let next_poll_ms = if pending > 0 || self.uart.available() > 0 {
            0
        } else {
            match self.mode {
                LoopMode::Burst => self.settings.burst_interval_ms,
                LoopMode::Idle => self.settings.idle_interval_ms,
            }
        };

        PollReport {
            decoded: stats.decoded,
            published,
            ignored,
            read_error: stats.read_error,
            pending,
            mode: self.mode,
            mode_changed: self.mode != previous,
            next_poll_ms,
            clock_transition: self.clock.take_transition(),
        }
    }

    fn update_mode(&mut self, received: bool, now_ms: u64) {
        if received {
            self.last_code_uptime_ms = Some(now_ms);
            self.mode = LoopMode::Burst;
            return;
        }

        let quiet = self
            .last_code_uptime_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.settings.burst_hold_ms);
        if self.mode == LoopMode::Burst && quiet {
            self.mode = LoopMode::Idle;
        }
    }

    /// Most recent published code
    pub fn last(&self) -> Option<&LastObserved> {
        self.classifier.last()
    }

    /// Current polling cadence
    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Check if events are stamped with wall-clock time
    pub fn is_wall_clock(&self) -> bool {
        self.clock.is_wall_clock()
    }
}
