use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, TableError};
use crate::options::TableOptions;
use crate::probe::{self, Placed};
use crate::resize;
use crate::storage::MappedFile;

/// A persistent hash table of fixed-size keys and values stored in one
/// memory-mapped file.
///
/// Lookups take a shared lock and may run concurrently; inserts take the
/// exclusive lock, and any resize they trigger runs under it, so readers
/// never see a table mid-rebuild. Only one handle per file is supported.
pub struct FixedDiskMap {
    path: PathBuf,
    options: TableOptions,
    inner: RwLock<Inner>,
}

struct Inner {
    storage: MappedFile,
    resizes: u64,
}

/// Point-in-time geometry of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub num_slots: u32,
    pub used_slots: u32,
    pub slot_size: u32,
    pub key_size: u32,
    pub value_size: u32,
    pub file_len: u64,
    /// Resizes performed through this handle since it was opened.
    pub resizes: u64,
}

impl FixedDiskMap {
    /// Opens or creates the table at `path` with the default options.
    pub fn open<P: AsRef<Path>>(path: P, key_size: u32, value_size: u32) -> Result<Self> {
        Self::open_with(path, key_size, value_size, &TableOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(
        path: P,
        key_size: u32,
        value_size: u32,
        options: &TableOptions,
    ) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref().to_path_buf();
        let storage = MappedFile::open(&path, key_size, value_size, options.initial_slots)?;

        debug!(
            path = %path.display(),
            num_slots = storage.num_slots(),
            used_slots = storage.used_slots(),
            key_size,
            value_size,
            "opened table"
        );

        Ok(Self {
            path,
            options: options.clone(),
            inner: RwLock::new(Inner {
                storage,
                resizes: 0,
            }),
        })
    }

    /// Inserts or overwrites `key`.
    ///
    /// A new key that would push the load factor over the limit first doubles
    /// the table and then retries, at most `max_resize_retries` times.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self.inner.write();
        let Inner { storage, resizes } = &mut *inner;
        probe::check_lengths(storage, key, value)?;

        let retries = self.options.max_resize_retries;
        for attempt in 0..=retries {
            match probe::insert(storage, key, value, self.options.max_load_factor)? {
                Placed::Updated | Placed::Inserted => return Ok(()),
                Placed::NeedsGrow if attempt < retries => {
                    resize::grow(storage, &self.path)?;
                    *resizes += 1;
                }
                Placed::NeedsGrow => {}
            }
        }
        Err(TableError::RetryExhausted(retries))
    }

    /// Returns a copy of the value stored for `key`, if any. A key of the
    /// wrong length is reported as absent.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        probe::lookup(&self.inner.read().storage, key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        let inner = self.inner.read();
        key.len() == inner.storage.key_size()
            && matches!(probe::find_slot(&inner.storage, key), probe::Probe::Hit(_))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.read().storage.used_slots() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.read().storage.num_slots() as usize
    }

    pub fn load_factor(&self) -> f64 {
        let inner = self.inner.read();
        inner.storage.used_slots() as f64 / inner.storage.num_slots() as f64
    }

    pub fn key_size(&self) -> usize {
        self.inner.read().storage.key_size()
    }

    pub fn value_size(&self) -> usize {
        self.inner.read().storage.value_size()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> TableStats {
        let inner = self.inner.read();
        let header = *inner.storage.header();
        TableStats {
            num_slots: header.num_slots,
            used_slots: header.used_slots,
            slot_size: header.slot_size,
            key_size: header.key_size,
            value_size: header.value_size,
            file_len: inner.storage.mapped_len() as u64,
            resizes: inner.resizes,
        }
    }

    /// Writes dirty pages back and fsyncs the file.
    pub fn flush(&self) -> Result<()> {
        self.inner.read().storage.flush()
    }

    /// Flushes (unless disabled in the options), unmaps and closes the file.
    pub fn close(self) -> Result<()> {
        let Inner { storage, resizes } = self.inner.into_inner();
        if self.options.sync_on_close {
            storage.flush()?;
        }
        drop(storage);
        debug!(path = %self.path.display(), resizes, "closed table");
        Ok(())
    }
}
