//! Configuration
//!
//! Monitor configuration types and a parser for the TOML file that
//! populates them.

pub mod toml;
pub mod types;

pub use toml::{parse_config, parse_config_located, LocatedError, ParseError};
pub use types::*;
