use async_trait::async_trait;

use crate::StoreResult;
use crate::model::{DirectoryRecord, FileRecord, NewDirectory, NewFile, Project, User};

/// Persistent metadata consumed by the ingest server.
///
/// Implementations must make [`create_dir_if_not_exists`] and
/// [`point_at_existing_if_exists`] atomic with respect to concurrent
/// callers; the server adds no locking of its own around them.
///
/// [`create_dir_if_not_exists`]: MetadataStore::create_dir_if_not_exists
/// [`point_at_existing_if_exists`]: MetadataStore::point_at_existing_if_exists
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Resolves an API token to its user.
    async fn find_user_by_api_token(&self, api_token: &str) -> StoreResult<User>;

    /// Returns `true` if the user owns or was granted access to the project.
    async fn user_can_access_project(&self, user_id: i64, project_id: i64) -> StoreResult<bool>;

    async fn find_project(&self, project_id: i64) -> StoreResult<Project>;

    /// Looks up a directory by its full logical path.
    async fn find_dir_by_path(
        &self,
        project_id: i64,
        path: &str,
    ) -> StoreResult<Option<DirectoryRecord>>;

    /// Returns the directory at `dir.path`, creating it under `dir.parent_id`
    /// if it does not exist yet.
    async fn create_dir_if_not_exists(&self, dir: NewDirectory<'_>)
    -> StoreResult<DirectoryRecord>;

    /// Creates a new current file version with a fresh storage UUID.
    async fn create_file(&self, file: NewFile<'_>) -> StoreResult<FileRecord>;

    /// Records the final size and checksum of an upload and adds it to the
    /// owning project's totals.
    async fn update_file_metadata(
        &self,
        file: &FileRecord,
        checksum: &str,
        size: u64,
    ) -> StoreResult<()>;

    /// Redirects `file` to an existing file with the same checksum.
    ///
    /// Returns the id of the file now backing `file`'s content, or `None`
    /// if `file` keeps its own bytes. `file` is updated in place. Records
    /// that pointed at `file` are moved to the same target, so the caller
    /// may delete `file`'s bytes once this returns `Some`.
    async fn point_at_existing_if_exists(&self, file: &mut FileRecord) -> StoreResult<Option<i64>>;
}

/// Hand-off point to the rendition conversion workers.
#[async_trait]
pub trait ConversionQueue: Send + Sync {
    /// Queues `file` for conversion. Does not wait for the job to run.
    async fn add_file_to_convert(&self, file: &FileRecord) -> StoreResult<()>;
}
