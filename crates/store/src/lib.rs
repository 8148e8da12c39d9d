//! Metadata store for mcft.
//!
//! The ingest server talks to persistent metadata only through the
//! [`MetadataStore`] and [`ConversionQueue`] traits. [`MemoryStore`] is an
//! in-process implementation of both, used by tests and by the server
//! binary when no external database is wired in.

mod memory;
mod model;
mod traits;

pub use memory::MemoryStore;
pub use model::{
    ConversionJob, DirectoryRecord, FileRecord, NewDirectory, NewFile, Project, ROOT_PATH, User,
};
pub use traits::{ConversionQueue, MetadataStore};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by metadata store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}
