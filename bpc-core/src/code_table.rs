//! Code table and ignore set
//!
//! Both are indexed directly by the code value: the domain is exactly 256
//! entries, so lookups are a single array access and nothing is hashed.
//! Built once from validated configuration, read-only afterwards.

use heapless::{String, Vec};

use crate::config::{CodeDescription, MAX_DESCRIPTIONS, MAX_DESC_LEN};
use crate::event::PostCode;

/// Number of distinct POST codes
pub const CODE_SPACE: usize = 256;

// Every pool index must fit a slot byte
const _: () = assert!(MAX_DESCRIPTIONS <= u8::MAX as usize + 1);

/// Errors building the code table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TableError {
    /// More distinct codes than the description pool can hold
    Full,
}

/// Map from POST code to human-readable description
///
/// `slots[code]` holds the index of the code's entry in `pool`.
#[derive(Debug, Clone)]
pub struct CodeTable {
    slots: [Option<u8>; CODE_SPACE],
    pool: Vec<String<MAX_DESC_LEN>, MAX_DESCRIPTIONS>,
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: [None; CODE_SPACE],
            pool: Vec::new(),
        }
    }

    /// Build a table from entries in declaration order
    ///
    /// A code declared twice keeps the later description.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = &'a CodeDescription>,
    {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry.code, &entry.text)?;
        }
        Ok(table)
    }

    /// Insert or overwrite the description for `code`
    pub fn insert(&mut self, code: PostCode, text: &String<MAX_DESC_LEN>) -> Result<(), TableError> {
        if let Some(slot) = self.slots[code.index()] {
            self.pool[slot as usize] = text.clone();
            return Ok(());
        }

        let index = u8::try_from(self.pool.len()).map_err(|_| TableError::Full)?;
        self.pool.push(text.clone()).map_err(|_| TableError::Full)?;
        self.slots[code.index()] = Some(index);
        Ok(())
    }

    /// Description for `code`, if one was configured
    pub fn lookup(&self, code: PostCode) -> Option<&str> {
        self.slots[code.index()]
            .and_then(|slot| self.pool.get(slot as usize))
            .map(|s| s.as_str())
    }

    /// Number of codes with a description
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Check if no code has a description
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

/// Set of codes that are consumed from the stream but never published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IgnoreSet {
    bits: [u32; CODE_SPACE / 32],
}

impl IgnoreSet {
    /// Create an empty set
    pub const fn new() -> Self {
        Self {
            bits: [0; CODE_SPACE / 32],
        }
    }

    /// Build a set from a list of codes
    pub fn from_codes<'a, I>(codes: I) -> Self
    where
        I: IntoIterator<Item = &'a PostCode>,
    {
        let mut set = Self::new();
        for &code in codes {
            set.insert(code);
        }
        set
    }

    /// Add a code to the set
    pub fn insert(&mut self, code: PostCode) {
        let (word, bit) = Self::position(code);
        self.bits[word] |= 1 << bit;
    }

    /// Check if `code` is suppressed
    pub fn is_ignored(&self, code: PostCode) -> bool {
        let (word, bit) = Self::position(code);
        self.bits[word] & (1 << bit) != 0
    }

    /// Number of codes in the set
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    fn position(code: PostCode) -> (usize, u32) {
        (code.index() / 32, (code.index() % 32) as u32)
    }
}
