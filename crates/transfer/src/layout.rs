use std::path::{Path, PathBuf};

use crate::TransferError;

/// Storage root used when `MCFS_DIR` is not set.
pub const DEFAULT_MCFS_ROOT: &str = "/mcfs/data/materialscommons";

/// Environment variable overriding the storage root.
pub const MCFS_DIR_ENV: &str = "MCFS_DIR";

/// Maps storage UUIDs to physical file locations.
///
/// A UUID `xxxxxxxx-abcd-...` lives at `<root>/ab/cd/<uuid>`. The location
/// depends only on the UUID, never on the logical path of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    root: PathBuf,
}

impl ContentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the bytes for `uuid`.
    pub fn dir_for(&self, uuid: &str) -> Result<PathBuf, TransferError> {
        let (a, b) = shard(uuid)?;
        Ok(self.root.join(a).join(b))
    }

    /// Full path of the bytes for `uuid`.
    pub fn path_for(&self, uuid: &str) -> Result<PathBuf, TransferError> {
        Ok(self.dir_for(uuid)?.join(uuid))
    }
}

/// Splits the first four characters of the UUID's second group.
fn shard(uuid: &str) -> Result<(&str, &str), TransferError> {
    if uuid.is_empty() || !uuid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(TransferError::InvalidUuid(uuid.to_string()));
    }
    match uuid.split('-').nth(1) {
        Some(group) if group.len() >= 4 => Ok((&group[0..2], &group[2..4])),
        _ => Err(TransferError::InvalidUuid(uuid.to_string())),
    }
}
