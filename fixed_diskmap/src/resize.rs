use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, TableError};
use crate::format::Header;
use crate::probe;
use crate::storage::MappedFile;

/// Sibling path the grown table is built in before it replaces `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Doubles the capacity of the table at `path`, whose current mapping is `current`.
///
/// Every occupied slot is rehashed into a new file next to the table. The new
/// file is made durable and renamed over `path` before the old mapping is
/// released, so the old table stays intact until the swap is committed. Any
/// failure before the rename leaves `current` untouched and removes the
/// temporary file.
pub fn grow(current: &mut MappedFile, path: &Path) -> Result<()> {
    let old = *current.header();
    let new_slots = old.num_slots.checked_mul(2).ok_or(TableError::Capacity)?;
    let header = Header::new(new_slots, old.key_size, old.value_size)?;

    info!(
        path = %path.display(),
        old_slots = old.num_slots,
        new_slots,
        used = old.used_slots,
        "growing table"
    );

    let tmp = temp_path(path);
    match fs::remove_file(&tmp) {
        Ok(()) => warn!(path = %tmp.display(), "removed stale resize file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let next = match rebuild(current, &tmp, header) {
        Ok(next) => next,
        Err(e) => {
            discard(&tmp);
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&tmp, path) {
        drop(next);
        discard(&tmp);
        return Err(e.into());
    }
    if let Err(e) = fsync_dir(path) {
        warn!(path = %path.display(), error = %e, "failed to sync table directory");
    }

    // the renamed file keeps its mapping; the old one is unmapped and closed here
    let old_mapping = std::mem::replace(current, next);
    drop(old_mapping);

    info!(
        path = %path.display(),
        slots = current.num_slots(),
        rehashed = current.used_slots(),
        "table grown"
    );
    Ok(())
}

fn rebuild(current: &MappedFile, tmp: &Path, header: Header) -> Result<MappedFile> {
    let mut next = MappedFile::create(tmp, header)?;

    for index in 0..current.num_slots() {
        let slot = current.slot(index);
        if slot.is_occupied() {
            probe::place_new(&mut next, slot.key(), slot.value())?;
        }
    }

    next.flush()?;
    Ok(next)
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %tmp.display(), error = %e, "failed to remove resize file");
        }
    }
}

#[cfg(unix)]
fn fsync_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            File::open(parent)?.sync_all()?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn fsync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
