//! Key hashing and linear probing over a [`MappedFile`].

use std::hash::Hasher;

use crate::error::{Result, TableError};
use crate::storage::MappedFile;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a. Not cryptographic, picked for speed on short fixed keys.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a32(u32);

impl Default for Fnv1a32 {
    fn default() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Fnv1a32 {
    pub fn finish_u32(&self) -> u32 {
        self.0
    }
}

impl Hasher for Fnv1a32 {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u32;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0 as u64
    }
}

/// Hash of the raw key bytes, with no length prefix.
#[inline]
pub fn hash_key(key: &[u8]) -> u32 {
    let mut hasher = Fnv1a32::default();
    hasher.write(key);
    hasher.finish_u32()
}

/// Result of walking the probe sequence for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Occupied slot holding the key.
    Hit(u32),
    /// First empty slot on the key's probe sequence.
    Vacant(u32),
    /// Full cycle with neither a match nor an empty slot.
    Exhausted,
}

/// What an insert attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placed {
    Updated,
    Inserted,
    /// The key is new and inserting it would cross the load factor.
    NeedsGrow,
}

pub fn find_slot(storage: &MappedFile, key: &[u8]) -> Probe {
    let capacity = storage.num_slots();
    let mut index = hash_key(key) % capacity;

    for _ in 0..capacity {
        let slot = storage.slot(index);
        if slot.is_empty() {
            return Probe::Vacant(index);
        }
        // reserved status bytes never match
        if slot.is_occupied() && slot.key() == key {
            return Probe::Hit(index);
        }
        index = (index + 1) % capacity;
    }

    Probe::Exhausted
}

/// Copies the value stored for `key`. A key of the wrong length is simply absent.
pub fn lookup(storage: &MappedFile, key: &[u8]) -> Option<Vec<u8>> {
    if key.len() != storage.key_size() {
        return None;
    }
    match find_slot(storage, key) {
        Probe::Hit(index) => Some(storage.slot(index).value().to_vec()),
        Probe::Vacant(_) | Probe::Exhausted => None,
    }
}

pub fn check_lengths(storage: &MappedFile, key: &[u8], value: &[u8]) -> Result<()> {
    if key.len() != storage.key_size() {
        return Err(TableError::Validation {
            field: "key",
            expected: storage.key_size(),
            actual: key.len(),
        });
    }
    if value.len() != storage.value_size() {
        return Err(TableError::Validation {
            field: "value",
            expected: storage.value_size(),
            actual: value.len(),
        });
    }
    Ok(())
}

/// One insert attempt against the current table. Lengths must already be checked.
///
/// Overwrites in place when the key exists. For a new key, returns
/// [`Placed::NeedsGrow`] without touching the table if the insert would push
/// the load factor above `max_load_factor`.
pub fn insert(
    storage: &mut MappedFile,
    key: &[u8],
    value: &[u8],
    max_load_factor: f64,
) -> Result<Placed> {
    match find_slot(storage, key) {
        Probe::Hit(index) => {
            storage.slot_mut(index).set_value(value);
            Ok(Placed::Updated)
        }
        Probe::Vacant(_) if storage.header().load_after_insert() > max_load_factor => {
            Ok(Placed::NeedsGrow)
        }
        Probe::Vacant(index) => {
            occupy(storage, index, key, value)?;
            Ok(Placed::Inserted)
        }
        Probe::Exhausted => Err(TableError::Capacity),
    }
}

/// Inserts a key known to be absent, ignoring the load factor. Used to
/// rebuild a freshly allocated table during a resize.
pub fn place_new(storage: &mut MappedFile, key: &[u8], value: &[u8]) -> Result<()> {
    match find_slot(storage, key) {
        Probe::Vacant(index) => occupy(storage, index, key, value),
        Probe::Hit(index) => {
            storage.slot_mut(index).set_value(value);
            Ok(())
        }
        Probe::Exhausted => Err(TableError::Capacity),
    }
}

fn occupy(storage: &mut MappedFile, index: u32, key: &[u8], value: &[u8]) -> Result<()> {
    let used = storage.used_slots() + 1;
    storage.slot_mut(index).fill(key, value);
    storage.set_used_slots(used)
}
