//! Board-agnostic core of the BIOS POST code monitor
//!
//! A computer's firmware writes one byte per boot stage to a debug port;
//! a UART bridge forwards those bytes to us. This crate turns that byte
//! stream into sensor readings:
//!
//! - Code table and ignore set built once from configuration
//! - Byte stream decoder (one POST code per byte, no loss across polls)
//! - Clock adapter (wall-clock when synchronized, uptime otherwise)
//! - Classifier publishing to numeric and text sinks
//! - Cooperative poll hook with burst-mode scheduling hints
//! - Configuration types and a minimal TOML parser
//!
//! Nothing here allocates; all storage is fixed-capacity.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod classifier;
pub mod clock;
pub mod code_table;
pub mod config;
pub mod decoder;
pub mod event;
pub mod monitor;
pub mod traits;

pub use classifier::{Classifier, Dispatch, LastObserved, TextFormat};
pub use clock::{ClockAdapter, ClockTransition};
pub use code_table::{CodeTable, IgnoreSet, TableError};
pub use decoder::{Decoder, PollBudget};
pub use event::{DecodedEvent, PostCode, Timestamp};
pub use monitor::{LoopMode, MonitorSettings, PollReport, PostCodeMonitor};
pub use traits::{NumericSink, TextSink};
