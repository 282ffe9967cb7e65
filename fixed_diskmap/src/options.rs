use crate::error::{Result, TableError};
use crate::format::DEFAULT_INITIAL_SLOTS;

pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.7;
pub const DEFAULT_MAX_RESIZE_RETRIES: u32 = 3;

/// Tuning knobs for [`FixedDiskMap::open_with`](crate::FixedDiskMap::open_with).
///
/// `initial_slots` only shapes brand-new files; an existing file keeps the
/// capacity recorded in its header.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOptions {
    pub initial_slots: u32,
    pub max_load_factor: f64,
    pub max_resize_retries: u32,
    pub sync_on_close: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            initial_slots: DEFAULT_INITIAL_SLOTS,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            max_resize_retries: DEFAULT_MAX_RESIZE_RETRIES,
            sync_on_close: true,
        }
    }
}

impl TableOptions {
    pub fn with_initial_slots(mut self, slots: u32) -> Self {
        self.initial_slots = slots;
        self
    }

    pub fn with_max_load_factor(mut self, load_factor: f64) -> Self {
        self.max_load_factor = load_factor;
        self
    }

    pub fn with_max_resize_retries(mut self, retries: u32) -> Self {
        self.max_resize_retries = retries;
        self
    }

    pub fn with_sync_on_close(mut self, sync: bool) -> Self {
        self.sync_on_close = sync;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_slots == 0 {
            return Err(TableError::InvalidOptions(
                "initial_slots must be at least 1".into(),
            ));
        }
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(TableError::InvalidOptions(format!(
                "max_load_factor must be in (0, 1), got {}",
                self.max_load_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = TableOptions::default();
        assert_eq!(options.initial_slots, 1024);
        assert_eq!(options.max_load_factor, 0.7);
        assert_eq!(options.max_resize_retries, 3);
        assert!(options.sync_on_close);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        for options in [
            TableOptions::default().with_initial_slots(0),
            TableOptions::default().with_max_load_factor(0.0),
            TableOptions::default().with_max_load_factor(1.0),
            TableOptions::default().with_max_load_factor(f64::NAN),
        ] {
            assert!(matches!(
                options.validate(),
                Err(TableError::InvalidOptions(_))
            ));
        }
    }
}
