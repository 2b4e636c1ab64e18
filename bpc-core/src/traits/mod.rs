//! Output traits
//!
//! These traits define the interface between the classifier and the
//! host's sensor entities.

pub mod sink;

pub use sink::{NumericSink, TextSink};
