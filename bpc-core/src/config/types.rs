//! Configuration type definitions
//!
//! Descriptions and ignore entries are kept in first-declaration order.
//! A code declared twice keeps its first position and its last description.

use heapless::{String, Vec};

use bpc_hal::UartConfig;

use crate::classifier::{Classifier, TextFormat};
use crate::code_table::{CodeTable, IgnoreSet, TableError};
use crate::event::PostCode;
use crate::monitor::MonitorSettings;

use super::toml::ParseError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum description length in bytes
pub const MAX_DESC_LEN: usize = 32;

/// Maximum rendered text sink value length
pub const MAX_TEXT_LEN: usize = 48;

/// Maximum description entries per config (one per code)
pub const MAX_DESCRIPTIONS: usize = 256;

/// Maximum ignore entries per config (one per code)
pub const MAX_IGNORED: usize = 256;

/// One `(hexcode, desc)` entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeDescription {
    pub code: PostCode,
    pub text: String<MAX_DESC_LEN>,
}

impl CodeDescription {
    /// Create an entry, rejecting descriptions over `MAX_DESC_LEN` bytes
    pub fn new(code: PostCode, text: &str) -> Result<Self, ParseError> {
        let text = String::try_from(text).map_err(|_| ParseError::DescriptionTooLong)?;
        Ok(Self { code, text })
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorConfig {
    /// Serial line settings for the POST code UART
    pub uart: UartConfig,
    /// Code descriptions in declaration order
    pub codes: Vec<CodeDescription, MAX_DESCRIPTIONS>,
    /// Codes to consume but never publish
    pub ignore: Vec<PostCode, MAX_IGNORED>,
    /// Text sink rendering
    pub text_format: TextFormat,
    /// Poll scheduling
    pub settings: MonitorSettings,
}

impl MonitorConfig {
    /// Create an empty configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe `code`, replacing an earlier description of the same code
    pub fn add_code(&mut self, entry: CodeDescription) -> Result<(), ParseError> {
        if let Some(existing) = self.codes.iter_mut().find(|c| c.code == entry.code) {
            existing.text = entry.text;
            return Ok(());
        }
        self.codes.push(entry).map_err(|_| ParseError::TooManyItems)
    }

    /// Add `code` to the ignore list; repeats are dropped
    pub fn add_ignore(&mut self, code: PostCode) -> Result<(), ParseError> {
        if self.ignore.contains(&code) {
            return Ok(());
        }
        self.ignore.push(code).map_err(|_| ParseError::TooManyItems)
    }

    /// Build the code table (duplicates: last declaration wins)
    pub fn code_table(&self) -> Result<CodeTable, TableError> {
        CodeTable::from_entries(&self.codes)
    }

    /// Build the ignore set
    pub fn ignore_set(&self) -> IgnoreSet {
        IgnoreSet::from_codes(&self.ignore)
    }

    /// Build a classifier from this configuration
    pub fn classifier(&self) -> Result<Classifier, TableError> {
        Classifier::from_config(self)
    }
}
