//! On-disk layout of a table file.
//!
//! ```text
//! +---------------------+
//! | Header (28 bytes)   |  magic, version, num_slots, used_slots,
//! +---------------------+  slot_size, key_size, value_size (u32 BE each)
//! | Slot 0              |
//! | ...                 |  status (u8) | key [key_size] | value [value_size]
//! | Slot num_slots - 1  |
//! +---------------------+
//! ```

use bytemuck::{Pod, Zeroable};

use crate::error::FormatError;

/// ASCII `phsh`.
pub const MAGIC: u32 = 0x7068_7368;
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 28;
pub const DEFAULT_INITIAL_SLOTS: u32 = 1024;

/// Byte offset of `used_slots` inside the header.
pub(crate) const USED_SLOTS_OFFSET: usize = 12;

/// Slot status byte. The value 2 is reserved for deletion markers and is
/// never written; readers treat it like any other non-matching slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Empty = 0,
    Occupied = 1,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Status::Empty),
            1 => Some(Status::Occupied),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Zeroable, Pod)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 4],
    version: [u8; 4],
    num_slots: [u8; 4],
    used_slots: [u8; 4],
    slot_size: [u8; 4],
    key_size: [u8; 4],
    value_size: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<RawHeader>() == HEADER_SIZE);

/// Decoded table header. `slot_size` is always `1 + key_size + value_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub num_slots: u32,
    pub used_slots: u32,
    pub slot_size: u32,
    pub key_size: u32,
    pub value_size: u32,
}

impl Header {
    /// Header for an empty table with `num_slots` slots.
    pub fn new(num_slots: u32, key_size: u32, value_size: u32) -> Result<Self, FormatError> {
        if num_slots == 0 {
            return Err(FormatError::ZeroCapacity);
        }
        let slot_size = slot_size(key_size, value_size)
            .and_then(|size| u32::try_from(size).ok())
            .ok_or(FormatError::SlotSizeOverflow {
                key_size,
                value_size,
            })?;
        Ok(Self {
            num_slots,
            used_slots: 0,
            slot_size,
            key_size,
            value_size,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let raw: &RawHeader = bytes
            .get(..HEADER_SIZE)
            .map(bytemuck::from_bytes)
            .ok_or(FormatError::TooShort(bytes.len()))?;

        let magic = u32::from_be_bytes(raw.magic);
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic));
        }
        let version = u32::from_be_bytes(raw.version);
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let header = Self {
            num_slots: u32::from_be_bytes(raw.num_slots),
            used_slots: u32::from_be_bytes(raw.used_slots),
            slot_size: u32::from_be_bytes(raw.slot_size),
            key_size: u32::from_be_bytes(raw.key_size),
            value_size: u32::from_be_bytes(raw.value_size),
        };

        if header.num_slots == 0 {
            return Err(FormatError::ZeroCapacity);
        }
        let expected = 1 + header.key_size as u64 + header.value_size as u64;
        if header.slot_size as u64 != expected {
            return Err(FormatError::SlotSizeMismatch {
                stored: header.slot_size,
                expected,
            });
        }
        if header.used_slots > header.num_slots {
            return Err(FormatError::UsedExceedsCapacity {
                used: header.used_slots,
                capacity: header.num_slots,
            });
        }
        Ok(header)
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let raw = RawHeader {
            magic: MAGIC.to_be_bytes(),
            version: VERSION.to_be_bytes(),
            num_slots: self.num_slots.to_be_bytes(),
            used_slots: self.used_slots.to_be_bytes(),
            slot_size: self.slot_size.to_be_bytes(),
            key_size: self.key_size.to_be_bytes(),
            value_size: self.value_size.to_be_bytes(),
        };
        bytemuck::cast(raw)
    }

    /// Rejects a file whose record sizes differ from the ones the caller asked for.
    pub fn check_sizes(&self, key_size: u32, value_size: u32) -> Result<(), FormatError> {
        if self.key_size != key_size || self.value_size != value_size {
            return Err(FormatError::SizeMismatch {
                stored_key: self.key_size,
                stored_value: self.value_size,
                key_size,
                value_size,
            });
        }
        Ok(())
    }

    /// Total file length needed for the header plus every slot.
    pub fn file_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.num_slots as u64 * self.slot_size as u64
    }

    /// Byte offset of slot `index` from the start of the file.
    #[inline]
    pub fn slot_offset(&self, index: u32) -> usize {
        HEADER_SIZE + index as usize * self.slot_size as usize
    }

    /// Load factor the table would reach after one more insert.
    #[inline]
    pub fn load_after_insert(&self) -> f64 {
        (self.used_slots as f64 + 1.0) / self.num_slots as f64
    }
}

fn slot_size(key_size: u32, value_size: u32) -> Option<u64> {
    1u64.checked_add(key_size as u64)?
        .checked_add(value_size as u64)
}
