//! Resolves a logical directory path to a directory record, creating any
//! missing ancestors.

use std::sync::Arc;

use mcft_store::{
    DirectoryRecord, MetadataStore, NewDirectory, ROOT_PATH, StoreError, StoreResult,
};
use mcft_transfer::DirPath;

use crate::locks::ProjectLocks;

/// Walks and fills in directory trees, one project at a time.
///
/// Resolution for a project runs under that project's mutex, so two
/// sessions resolving overlapping paths never both create the same
/// directory.
pub struct DirectoryResolver {
    store: Arc<dyn MetadataStore>,
    locks: ProjectLocks,
}

impl DirectoryResolver {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            locks: ProjectLocks::new(),
        }
    }

    pub fn locks(&self) -> &ProjectLocks {
        &self.locks
    }

    /// Returns the directory at `dir`, creating it and its ancestors if
    /// needed.
    pub async fn resolve(
        &self,
        project_id: i64,
        owner_id: i64,
        dir: &DirPath,
    ) -> StoreResult<DirectoryRecord> {
        let _guard = self.locks.acquire(project_id).await;

        let full_path = dir.to_string();
        if let Some(existing) = self.store.find_dir_by_path(project_id, &full_path).await? {
            return Ok(existing);
        }

        let mut parent = self
            .store
            .find_dir_by_path(project_id, ROOT_PATH)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("root directory of project {project_id}")))?;

        for (path, name) in dir.ancestors() {
            parent = self
                .store
                .create_dir_if_not_exists(NewDirectory {
                    project_id,
                    parent_id: parent.id,
                    owner_id,
                    path: &path,
                    name,
                })
                .await?;
        }

        tracing::debug!(project_id, path = %full_path, dir_id = parent.id, "directory resolved");
        Ok(parent)
    }
}
