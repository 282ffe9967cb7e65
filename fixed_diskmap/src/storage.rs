use std::fs::{File, OpenOptions};
use std::path::Path;

use memmap2::MmapMut;

use crate::error::{FormatError, Result, TableError};
use crate::format::{HEADER_SIZE, Header, Status, USED_SLOTS_OFFSET};

/// A table file mapped read/write and shared for the lifetime of the value.
///
/// The cached `header` is always decoded from the mapped bytes, never built
/// on the side, so a fresh mapping can't carry stale geometry. Dropping the
/// value unmaps the region and closes the file.
pub struct MappedFile {
    mmap: MmapMut,
    file: File,
    header: Header,
}

impl MappedFile {
    /// Opens the table at `path`, creating it when missing. A zero-length file
    /// is initialised with `initial_slots` slots; anything else must carry a
    /// valid header for the requested key and value sizes.
    pub fn open(path: &Path, key_size: u32, value_size: u32, initial_slots: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.metadata()?.len() == 0 {
            let header = Header::new(initial_slots, key_size, value_size)?;
            return Self::init(file, header);
        }

        let mapped = Self::map(file)?;
        mapped.header.check_sizes(key_size, value_size)?;
        Ok(mapped)
    }

    /// Creates (or truncates) `path` and lays out an empty table described by `header`.
    pub fn create(path: &Path, header: Header) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::init(file, header)
    }

    fn init(file: File, header: Header) -> Result<Self> {
        file.set_len(header.file_len())?;

        // Safety: the file was just sized by us and stays owned by the
        // returned value for as long as the mapping exists.
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        mmap[..HEADER_SIZE].copy_from_slice(&header.encode());
        mmap.flush_range(0, HEADER_SIZE)?;
        file.sync_all()?;

        Self::from_parts(mmap, file)
    }

    fn map(file: File) -> Result<Self> {
        // Safety: single writer per table file; no other handle maps it.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Self::from_parts(mmap, file)
    }

    fn from_parts(mmap: MmapMut, file: File) -> Result<Self> {
        let header = Header::decode(&mmap)?;
        let expected = header.file_len();
        let actual = mmap.len() as u64;
        if actual < expected {
            return Err(FormatError::Truncated { expected, actual }.into());
        }
        Ok(Self { mmap, file, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn num_slots(&self) -> u32 {
        self.header.num_slots
    }

    pub fn used_slots(&self) -> u32 {
        self.header.used_slots
    }

    pub fn key_size(&self) -> usize {
        self.header.key_size as usize
    }

    pub fn value_size(&self) -> usize {
        self.header.value_size as usize
    }

    /// Length of the mapped region in bytes.
    pub fn mapped_len(&self) -> usize {
        self.mmap.len()
    }

    /// Updates the occupied count both in the cache and in the mapped header.
    pub fn set_used_slots(&mut self, used: u32) -> Result<()> {
        if used > self.header.num_slots {
            return Err(TableError::Capacity);
        }
        self.mmap[USED_SLOTS_OFFSET..USED_SLOTS_OFFSET + 4].copy_from_slice(&used.to_be_bytes());
        self.header.used_slots = used;
        Ok(())
    }

    /// Read view of slot `index`.
    ///
    /// Panics if `index >= num_slots`.
    #[inline]
    pub fn slot(&self, index: u32) -> SlotRef<'_> {
        assert!(index < self.header.num_slots, "slot {index} out of range");
        let start = self.header.slot_offset(index);
        let end = start + self.header.slot_size as usize;
        SlotRef {
            bytes: &self.mmap[start..end],
            key_size: self.key_size(),
        }
    }

    /// Write view of slot `index`.
    ///
    /// Panics if `index >= num_slots`.
    #[inline]
    pub fn slot_mut(&mut self, index: u32) -> SlotMut<'_> {
        assert!(index < self.header.num_slots, "slot {index} out of range");
        let start = self.header.slot_offset(index);
        let end = start + self.header.slot_size as usize;
        let key_size = self.key_size();
        SlotMut {
            bytes: &mut self.mmap[start..end],
            key_size,
        }
    }

    /// Flushes dirty pages and fsyncs the file.
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Borrowed view of one slot; cannot outlive the mapping it came from.
pub struct SlotRef<'a> {
    bytes: &'a [u8],
    key_size: usize,
}

impl<'a> SlotRef<'a> {
    #[inline]
    pub fn status(&self) -> Option<Status> {
        Status::from_byte(self.bytes[0])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.status() == Some(Status::Empty)
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.status() == Some(Status::Occupied)
    }

    #[inline]
    pub fn key(&self) -> &'a [u8] {
        &self.bytes[1..1 + self.key_size]
    }

    #[inline]
    pub fn value(&self) -> &'a [u8] {
        &self.bytes[1 + self.key_size..]
    }
}

pub struct SlotMut<'a> {
    bytes: &'a mut [u8],
    key_size: usize,
}

impl SlotMut<'_> {
    /// Writes key and value, then flips the status byte to occupied.
    pub fn fill(&mut self, key: &[u8], value: &[u8]) {
        let key_end = 1 + self.key_size;
        self.bytes[1..key_end].copy_from_slice(key);
        self.bytes[key_end..].copy_from_slice(value);
        self.bytes[0] = Status::Occupied as u8;
    }

    pub fn set_value(&mut self, value: &[u8]) {
        self.bytes[1 + self.key_size..].copy_from_slice(value);
    }
}
