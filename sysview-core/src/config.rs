//! Import configuration.

use std::path::{Path, PathBuf};

/// Tuning knobs for one import.
///
/// ```
/// use sysview_core::ImportConfig;
///
/// let config = ImportConfig::default()
///     .with_spill_dir("/var/tmp")
///     .with_inline_capacity(256);
/// assert_eq!(config.inline_capacity, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Directory for spilled binary values. System temp dir when `None`.
    pub spill_dir: Option<PathBuf>,
    /// Initial capacity of inline value buffers, in bytes.
    pub inline_capacity: usize,
    /// Write buffer size for spilled values, in bytes.
    pub spill_write_buffer: usize,
}

impl ImportConfig {
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    pub fn with_inline_capacity(mut self, capacity: usize) -> Self {
        self.inline_capacity = capacity;
        self
    }

    pub fn with_spill_write_buffer(mut self, size: usize) -> Self {
        self.spill_write_buffer = size;
        self
    }

    /// Directory spilled values go to, if one was configured.
    pub fn spill_dir(&self) -> Option<&Path> {
        self.spill_dir.as_deref()
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            spill_dir: None,
            inline_capacity: 64,
            spill_write_buffer: 8 * 1024,
        }
    }
}
