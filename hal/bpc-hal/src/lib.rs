//! BPC Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the POST code monitor is
//! written against. Chip-specific code (the firmware crate, or a test
//! harness on the host) implements them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  bpc-firmware (embassy, RP2040)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  bpc-core (decoder, classifier, ...)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  bpc-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartRx`] - Non-blocking serial receive
//! - [`clock::MonotonicClock`] - Device uptime
//! - [`clock::RealTimeClock`] - Optional wall-clock source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use clock::{ClockStatus, MonotonicClock, NoClock, RealTimeClock};
pub use uart::{DataBits, Parity, StopBits, UartConfig, UartRx};

#[cfg(feature = "embedded-io")]
pub use uart::IoRx;
