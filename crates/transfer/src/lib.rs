//! Server-side file transfer primitives.
//!
//! - [`ContentHasher`]: running checksum over every block written.
//! - [`BlockWriter`]: sequential writer for one upload's physical bytes.
//! - [`ContentLayout`]: maps a file's storage UUID to its on-disk location.
//! - [`LogicalPath`] / [`DirPath`]: validated project-relative paths.

mod hasher;
mod layout;
mod validation;
mod writer;

pub use hasher::{CHECKSUM_ALGORITHM, ContentHasher, checksum_bytes};
pub use layout::{ContentLayout, DEFAULT_MCFS_ROOT, MCFS_DIR_ENV};
pub use validation::{DirPath, LogicalPath};
pub use writer::{BlockWriter, FinishedWrite};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not all bytes written to file: wrote {written} of {expected}")]
    ShortWrite { written: usize, expected: usize },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid storage uuid: {0}")]
    InvalidUuid(String),
}
