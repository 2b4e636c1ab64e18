//! Byte stream decoder
//!
//! The POST code port has no framing: every byte on the wire is one code.
//! The decoder reads whatever the UART has buffered in chunks of up to `N`
//! bytes and emits one [`DecodedEvent`] per byte, in arrival order.
//!
//! A poll stops early when its [`PollBudget`] runs out. Bytes already
//! pulled into the chunk buffer stay pending and are emitted first on the
//! next poll; bytes still in the UART are simply read later. Nothing is
//! dropped or emitted twice.

use bpc_hal::{MonotonicClock, RealTimeClock, UartRx};

use crate::clock::ClockAdapter;
use crate::event::{DecodedEvent, PostCode};

/// Default chunk size for UART reads
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// Limits for a single poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollBudget {
    /// Maximum number of codes to emit
    pub max_codes: usize,
    /// Uptime (ms) after which no further codes are emitted
    pub deadline_ms: u64,
}

impl PollBudget {
    /// Budget with a code limit and no deadline
    pub const fn codes(max_codes: usize) -> Self {
        Self {
            max_codes,
            deadline_ms: u64::MAX,
        }
    }
}

/// Result of one decoder poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats<E> {
    /// Codes emitted during this poll
    pub decoded: usize,
    /// Transport error that ended this poll's reads, if any
    pub read_error: Option<E>,
}

/// POST code stream decoder
///
/// `buf[pos..len]` holds bytes read from the UART but not yet emitted.
#[derive(Debug, Clone)]
pub struct Decoder<const N: usize = DEFAULT_CHUNK_SIZE> {
    buf: [u8; N],
    len: usize,
    pos: usize,
    total_decoded: u32,
    total_read_errors: u32,
}

impl<const N: usize> Default for Decoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Decoder<N> {
    /// Create a new decoder with an empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0u8; N],
            len: 0,
            pos: 0,
            total_decoded: 0,
            total_read_errors: 0,
        }
    }

    /// Bytes read from the UART that have not been emitted yet
    pub fn pending(&self) -> usize {
        self.len - self.pos
    }

    /// Total codes emitted since creation (wrapping)
    pub fn total_decoded(&self) -> u32 {
        self.total_decoded
    }

    /// Total transport read errors since creation (wrapping)
    pub fn total_read_errors(&self) -> u32 {
        self.total_read_errors
    }

    /// Decode buffered bytes, calling `emit` once per code
    ///
    /// Never blocks. At least one code is emitted if any byte is
    /// available, even when the deadline has already passed.
    pub fn poll<U, M, R, F>(
        &mut self,
        rx: &mut U,
        clock: &mut ClockAdapter<M, R>,
        budget: PollBudget,
        mut emit: F,
    ) -> DecodeStats<U::Error>
    where
        U: UartRx,
        M: MonotonicClock,
        R: RealTimeClock,
        F: FnMut(DecodedEvent),
    {
        let mut stats = DecodeStats {
            decoded: 0,
            read_error: None,
        };

        while stats.decoded < budget.max_codes {
            if stats.decoded > 0 && clock.uptime_ms() >= budget.deadline_ms {
                break;
            }

            if self.pending() == 0 && !self.refill(rx, &mut stats) {
                break;
            }

            let code = PostCode(self.buf[self.pos]);
            self.pos += 1;

            let event = DecodedEvent {
                code,
                timestamp: clock.now(),
            };
            stats.decoded += 1;
            self.total_decoded = self.total_decoded.wrapping_add(1);
            emit(event);
        }

        stats
    }

    /// Read the next chunk from the UART into the buffer
    ///
    /// Returns false if nothing could be read.
    fn refill<U: UartRx>(&mut self, rx: &mut U, stats: &mut DecodeStats<U::Error>) -> bool {
        self.pos = 0;
        self.len = 0;

        if rx.available() == 0 {
            return false;
        }

        match rx.read_available(&mut self.buf) {
            Ok(n) => {
                self.len = n.min(N);
                self.len > 0
            }
            Err(e) => {
                self.total_read_errors = self.total_read_errors.wrapping_add(1);
                stats.read_error = Some(e);
                false
            }
        }
    }

    /// Discard pending and buffered bytes until the UART is empty or
    /// `deadline_ms` passes
    ///
    /// Returns the number of bytes discarded.
    pub fn drain<U: UartRx, C: MonotonicClock>(
        &mut self,
        rx: &mut U,
        clock: &C,
        deadline_ms: u64,
    ) -> usize {
        let mut discarded = self.pending();
        self.pos = 0;
        self.len = 0;

        while rx.available() > 0 && clock.uptime_ms() < deadline_ms {
            match rx.read_available(&mut self.buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => discarded += n.min(N),
            }
        }

        discarded
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::cell::Cell;
    use proptest::prelude::*;
    use std::vec::Vec;

    /// UART that hands out at most `max_read` bytes per read
    pub(crate) struct ScriptedRx {
        pub data: Vec<u8>,
        pub pos: usize,
        pub max_read: usize,
        pub reads: usize,
        pub fail_next: bool,
    }

    impl ScriptedRx {
        pub fn new(data: &[u8], max_read: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                max_read,
                reads: 0,
                fail_next: false,
            }
        }

        pub fn push(&mut self, bytes: &[u8]) {
            self.data.extend_from_slice(bytes);
        }
    }

    impl UartRx for ScriptedRx {
        type Error = &'static str;

        fn available(&mut self) -> usize {
            self.data.len() - self.pos
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            if self.fail_next {
                self.fail_next = false;
                return Err("overrun");
            }
            self.reads += 1;
            let n = buf.len().min(self.max_read).min(self.available());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    /// Uptime that advances by `step` ms on every read
    pub(crate) struct SteppingUptime {
        pub now: Cell<u64>,
        pub step: u64,
    }

    impl SteppingUptime {
        pub fn new(start: u64, step: u64) -> Self {
            Self {
                now: Cell::new(start),
                step,
            }
        }
    }

    impl MonotonicClock for SteppingUptime {
        fn uptime_ms(&self) -> u64 {
            let now = self.now.get();
            self.now.set(now + self.step);
            now
        }
    }

    fn collect<const N: usize>(
        decoder: &mut Decoder<N>,
        rx: &mut ScriptedRx,
        clock: &mut ClockAdapter<&SteppingUptime>,
        budget: PollBudget,
        out: &mut Vec<DecodedEvent>,
    ) -> DecodeStats<&'static str> {
        decoder.poll(rx, clock, budget, |event| out.push(event))
    }

    #[test]
    fn test_no_bytes_no_events() {
        let uptime = SteppingUptime::new(0, 0);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&[], 16);
        let mut decoder: Decoder = Decoder::new();
        let mut out = Vec::new();

        let stats = collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(256), &mut out);
        assert_eq!(stats.decoded, 0);
        assert!(out.is_empty());
        assert_eq!(rx.reads, 0);
    }

    #[test]
    fn test_one_event_per_byte() {
        let uptime = SteppingUptime::new(100, 0);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&[0x00, 0x01, 0x19, 0xFF], 16);
        let mut decoder: Decoder = Decoder::new();
        let mut out = Vec::new();

        collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(256), &mut out);
        let codes: Vec<u8> = out.iter().map(|e| e.code.value()).collect();
        assert_eq!(codes, [0x00, 0x01, 0x19, 0xFF]);
    }

    #[test]
    fn test_burst_with_small_reads() {
        // 50 bytes, transport hands out at most 16 per read
        let data: Vec<u8> = (0..50u8).collect();
        let uptime = SteppingUptime::new(0, 0);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&data, 16);
        let mut decoder: Decoder<16> = Decoder::new();
        let mut out = Vec::new();

        let stats = collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(256), &mut out);
        assert_eq!(stats.decoded, 50);
        assert_eq!(rx.reads, 4);
        let codes: Vec<u8> = out.iter().map(|e| e.code.value()).collect();
        assert_eq!(codes, data);
    }

    #[test]
    fn test_budget_carries_over() {
        let data: Vec<u8> = (0..50u8).collect();
        let uptime = SteppingUptime::new(0, 0);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&data, 16);
        let mut decoder: Decoder<16> = Decoder::new();
        let mut out = Vec::new();

        let stats = collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(20), &mut out);
        assert_eq!(stats.decoded, 20);
        // Second chunk partially consumed
        assert_eq!(decoder.pending(), 12);

        while collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(20), &mut out).decoded > 0 {}

        let codes: Vec<u8> = out.iter().map(|e| e.code.value()).collect();
        assert_eq!(codes, data);
        assert_eq!(decoder.pending(), 0);
        assert_eq!(decoder.total_decoded(), 50);
    }

    #[test]
    fn test_deadline_stops_poll() {
        let data = [1u8, 2, 3, 4, 5, 6];
        // Every clock read advances 10 ms
        let uptime = SteppingUptime::new(0, 10);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&data, 16);
        let mut decoder: Decoder = Decoder::new();
        let mut out = Vec::new();

        let budget = PollBudget {
            max_codes: 256,
            deadline_ms: 25,
        };
        let stats = collect(&mut decoder, &mut rx, &mut clock, budget, &mut out);
        assert!(stats.decoded >= 1);
        assert!(stats.decoded < data.len());
        assert_eq!(decoder.pending(), data.len() - stats.decoded);

        // Later poll picks up the rest in order
        collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(256), &mut out);
        let codes: Vec<u8> = out.iter().map(|e| e.code.value()).collect();
        assert_eq!(codes, data);
    }

    #[test]
    fn test_expired_deadline_still_progresses() {
        let uptime = SteppingUptime::new(1000, 0);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&[0x42, 0x43], 16);
        let mut decoder: Decoder = Decoder::new();
        let mut out = Vec::new();

        let budget = PollBudget {
            max_codes: 256,
            deadline_ms: 0,
        };
        let stats = collect(&mut decoder, &mut rx, &mut clock, budget, &mut out);
        assert_eq!(stats.decoded, 1);
        assert_eq!(out[0].code, PostCode(0x42));
    }

    #[test]
    fn test_read_error_ends_poll() {
        let uptime = SteppingUptime::new(0, 0);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&[1, 2, 3], 16);
        rx.fail_next = true;
        let mut decoder: Decoder = Decoder::new();
        let mut out = Vec::new();

        let stats = collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(256), &mut out);
        assert_eq!(stats.decoded, 0);
        assert_eq!(stats.read_error, Some("overrun"));
        assert_eq!(decoder.total_read_errors(), 1);

        let stats = collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(256), &mut out);
        assert_eq!(stats.decoded, 3);
        assert_eq!(stats.read_error, None);
    }

    #[test]
    fn test_timestamps_per_byte() {
        let uptime = SteppingUptime::new(0, 5);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let mut rx = ScriptedRx::new(&[1, 2, 3], 16);
        let mut decoder: Decoder = Decoder::new();
        let mut out = Vec::new();

        collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(256), &mut out);
        assert!(out.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_drain_discards_everything() {
        let uptime = SteppingUptime::new(0, 0);
        let mut clock = ClockAdapter::uptime_only(&uptime);
        let data: Vec<u8> = (0..40u8).collect();
        let mut rx = ScriptedRx::new(&data, 16);
        let mut decoder: Decoder<16> = Decoder::new();
        let mut out = Vec::new();

        collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(4), &mut out);
        assert_eq!(decoder.pending(), 12);

        let discarded = decoder.drain(&mut rx, &uptime, u64::MAX);
        assert_eq!(discarded, 36);
        assert_eq!(decoder.pending(), 0);
        assert_eq!(rx.available(), 0);
    }

    #[test]
    fn test_drain_respects_deadline() {
        let uptime = SteppingUptime::new(0, 100);
        let data: Vec<u8> = (0..64u8).collect();
        let mut rx = ScriptedRx::new(&data, 16);
        let mut decoder: Decoder<16> = Decoder::new();

        // Clock reads 0, 100, 200: two reads fit before the deadline
        let discarded = decoder.drain(&mut rx, &uptime, 150);
        assert_eq!(discarded, 32);
        assert_eq!(rx.available(), 32);
    }

    proptest! {
        #[test]
        fn prop_byte_to_event(
            data in prop::collection::vec(any::<u8>(), 0..300),
            max_read in 1usize..40,
            max_codes in 1usize..64,
        ) {
            let uptime = SteppingUptime::new(0, 1);
            let mut clock = ClockAdapter::uptime_only(&uptime);
            let mut rx = ScriptedRx::new(&[], max_read);
            let mut decoder: Decoder<16> = Decoder::new();
            let mut out = Vec::new();

            // Bytes arrive in pieces between polls
            for piece in data.chunks(7) {
                rx.push(piece);
                collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(max_codes), &mut out);
            }
            while collect(&mut decoder, &mut rx, &mut clock, PollBudget::codes(max_codes), &mut out).decoded > 0 {}

            prop_assert_eq!(out.len(), data.len());
            for (event, byte) in out.iter().zip(data.iter()) {
                prop_assert_eq!(event.code.value(), *byte);
            }
            prop_assert!(out.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        }
    }
}
