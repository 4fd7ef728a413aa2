//! Paired storage units
//!
//! A unit is a data file plus its metadata companion. The companion is
//! named after the data file with an underscore-delimited numeric suffix
//! and the `.meta` extension:
//!
//! ```text
//! blk_1073741825              <- data
//! blk_1073741825_1001.meta    <- metadata
//! ```
//!
//! The two files are always sized and moved together.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension carried by every metadata file
pub const META_EXTENSION: &str = "meta";

/// Derive the data file name from a metadata file name.
///
/// Returns `None` when the name does not follow `<data>_<digits>.meta`.
pub fn data_name_for_meta(file_name: &str) -> Option<&str> {
    let stem = file_name
        .strip_suffix(META_EXTENSION)?
        .strip_suffix('.')?;
    let (data, suffix) = stem.rsplit_once('_')?;

    if data.is_empty() || suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(data)
}

/// A data file and its metadata companion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Absolute path of the primary data file
    pub data_path: PathBuf,
    /// Absolute path of the metadata file
    pub meta_path: PathBuf,
    /// Combined size of both files, unset until inventory
    pub size: Option<u64>,
}

impl Unit {
    /// Create an unsized unit
    pub fn new(data_path: impl Into<PathBuf>, meta_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            meta_path: meta_path.into(),
            size: None,
        }
    }

    /// Build a unit from a metadata file path.
    ///
    /// The data path sits in the same directory as the metadata file.
    pub fn from_meta_path(meta_path: &Path) -> Option<Self> {
        let file_name = meta_path.file_name()?.to_str()?;
        let data_name = data_name_for_meta(file_name)?;
        let data_path = meta_path.with_file_name(data_name);

        Some(Self::new(data_path, meta_path))
    }

    /// Set the combined size
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Combined size, zero when unsized
    pub fn size_or_zero(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    /// Whether the unit has been sized
    pub fn is_sized(&self) -> bool {
        self.size.is_some()
    }
}
