//! Persistent hash table of fixed-size records in a single memory-mapped file.
//!
//! Open addressing with linear probing, FNV-1a hashing and capacity doubling
//! once an insert would push the load factor past 0.7.
//!
//! ```no_run
//! use fixed_diskmap::FixedDiskMap;
//!
//! let map = FixedDiskMap::open("data.phash", 8, 8)?;
//! map.put(&12345u64.to_be_bytes(), &67890u64.to_be_bytes())?;
//! assert_eq!(map.get(&12345u64.to_be_bytes()), Some(67890u64.to_be_bytes().to_vec()));
//! map.close()?;
//! # Ok::<(), fixed_diskmap::TableError>(())
//! ```

pub mod error;
pub mod format;
mod options;
mod probe;
mod resize;
mod storage;
mod table;

pub use error::{FormatError, Result, TableError};
pub use format::{DEFAULT_INITIAL_SLOTS, HEADER_SIZE, Header, MAGIC, Status, VERSION};
pub use probe::{Fnv1a32, hash_key};
pub use options::{DEFAULT_MAX_LOAD_FACTOR, DEFAULT_MAX_RESIZE_RETRIES, TableOptions};
pub use table::{FixedDiskMap, TableStats};
