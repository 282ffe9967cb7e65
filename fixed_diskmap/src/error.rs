use std::io;
use thiserror::Error;

/// Reasons a table file is rejected while decoding its header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("file too small for header: {0} bytes")]
    TooShort(usize),

    #[error("invalid magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    #[error("table has zero slots")]
    ZeroCapacity,

    #[error("slot size {stored} does not match 1 + key + value = {expected}")]
    SlotSizeMismatch { stored: u32, expected: u64 },

    #[error("used slots {used} exceed capacity {capacity}")]
    UsedExceedsCapacity { used: u32, capacity: u32 },

    #[error(
        "table stores {stored_key}-byte keys and {stored_value}-byte values, \
         opened with {key_size} and {value_size}"
    )]
    SizeMismatch {
        stored_key: u32,
        stored_value: u32,
        key_size: u32,
        value_size: u32,
    },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("slot size overflows u32 (key {key_size}, value {value_size})")]
    SlotSizeOverflow { key_size: u32, value_size: u32 },
}

/// Errors that can occur when working with a fixed-record disk map
#[derive(Error, Debug)]
pub enum TableError {
    /// The file exists but is not a valid table for this handle
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// IO errors when creating, mapping, flushing or renaming files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Key or value length does not match the table geometry
    #[error("invalid {field} length: expected {expected} bytes, got {actual}")]
    Validation {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A full probe cycle found neither the key nor an empty slot,
    /// or the doubled capacity no longer fits the header
    #[error("table capacity exceeded")]
    Capacity,

    /// Every allowed resize was spent and the insert still did not fit
    #[error("insert still over load factor after {0} resizes")]
    RetryExhausted(u32),

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, TableError>;
