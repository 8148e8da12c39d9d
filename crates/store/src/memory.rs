//! In-process metadata store.
//!
//! All state lives behind one async mutex, which is what gives
//! directory creation and checksum redirects their atomicity.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::model::{
    ConversionJob, DirectoryRecord, FileRecord, NewDirectory, NewFile, Project, ROOT_PATH, User,
};
use crate::traits::{ConversionQueue, MetadataStore};
use crate::{StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    users: HashMap<i64, User>,
    projects: HashMap<i64, Project>,
    members: HashSet<(i64, i64)>,
    dirs: HashMap<i64, DirectoryRecord>,
    files: HashMap<i64, FileRecord>,
    conversions: Vec<ConversionJob>,
    next_dir_id: i64,
    next_file_id: i64,
}

impl Inner {
    fn dir_by_path(&self, project_id: i64, path: &str) -> Option<&DirectoryRecord> {
        self.dirs
            .values()
            .find(|d| d.project_id == project_id && d.path == path)
    }

    fn alloc_dir_id(&mut self) -> i64 {
        self.next_dir_id += 1;
        self.next_dir_id
    }

    fn alloc_file_id(&mut self) -> i64 {
        self.next_file_id += 1;
        self.next_file_id
    }
}

/// Metadata store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user.
    pub async fn add_user(&self, id: i64, name: &str, api_token: &str) -> User {
        let user = User {
            id,
            name: name.to_string(),
            api_token: api_token.to_string(),
        };
        self.inner.lock().await.users.insert(id, user.clone());
        user
    }

    /// Registers a project, its root directory, and owner access.
    pub async fn add_project(&self, id: i64, name: &str, owner_id: i64) -> Project {
        let project = Project {
            id,
            name: name.to_string(),
            owner_id,
            size: 0,
            file_count: 0,
        };

        let mut inner = self.inner.lock().await;
        inner.projects.insert(id, project.clone());
        inner.members.insert((owner_id, id));
        if inner.dir_by_path(id, ROOT_PATH).is_none() {
            let dir_id = inner.alloc_dir_id();
            inner.dirs.insert(
                dir_id,
                DirectoryRecord {
                    id: dir_id,
                    uuid: uuid::Uuid::new_v4().to_string(),
                    project_id: id,
                    parent_id: None,
                    owner_id,
                    path: ROOT_PATH.to_string(),
                    name: ROOT_PATH.to_string(),
                },
            );
        }
        project
    }

    /// Grants a user access to a project.
    pub async fn grant_access(&self, user_id: i64, project_id: i64) {
        self.inner.lock().await.members.insert((user_id, project_id));
    }

    pub async fn project(&self, project_id: i64) -> Option<Project> {
        self.inner.lock().await.projects.get(&project_id).cloned()
    }

    pub async fn file(&self, file_id: i64) -> Option<FileRecord> {
        self.inner.lock().await.files.get(&file_id).cloned()
    }

    /// All file records, ordered by id.
    pub async fn files(&self) -> Vec<FileRecord> {
        let inner = self.inner.lock().await;
        let mut files: Vec<_> = inner.files.values().cloned().collect();
        files.sort_by_key(|f| f.id);
        files
    }

    /// Directories of a project, ordered by id.
    pub async fn directories(&self, project_id: i64) -> Vec<DirectoryRecord> {
        let inner = self.inner.lock().await;
        let mut dirs: Vec<_> = inner
            .dirs
            .values()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        dirs.sort_by_key(|d| d.id);
        dirs
    }

    pub async fn conversion_jobs(&self) -> Vec<ConversionJob> {
        self.inner.lock().await.conversions.clone()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn find_user_by_api_token(&self, api_token: &str) -> StoreResult<User> {
        let inner = self.inner.lock().await;
        inner
            .users
            .values()
            .find(|u| !api_token.is_empty() && u.api_token == api_token)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("user".into()))
    }

    async fn user_can_access_project(&self, user_id: i64, project_id: i64) -> StoreResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.members.contains(&(user_id, project_id)))
    }

    async fn find_project(&self, project_id: i64) -> StoreResult<Project> {
        let inner = self.inner.lock().await;
        inner
            .projects
            .get(&project_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("project {project_id}")))
    }

    async fn find_dir_by_path(
        &self,
        project_id: i64,
        path: &str,
    ) -> StoreResult<Option<DirectoryRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.dir_by_path(project_id, path).cloned())
    }

    async fn create_dir_if_not_exists(
        &self,
        dir: NewDirectory<'_>,
    ) -> StoreResult<DirectoryRecord> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.dir_by_path(dir.project_id, dir.path) {
            return Ok(existing.clone());
        }

        match inner.dirs.get(&dir.parent_id) {
            Some(parent) if parent.project_id == dir.project_id => {}
            _ => {
                return Err(StoreError::NotFound(format!(
                    "parent directory {}",
                    dir.parent_id
                )));
            }
        }

        let id = inner.alloc_dir_id();
        let record = DirectoryRecord {
            id,
            uuid: uuid::Uuid::new_v4().to_string(),
            project_id: dir.project_id,
            parent_id: Some(dir.parent_id),
            owner_id: dir.owner_id,
            path: dir.path.to_string(),
            name: dir.name.to_string(),
        };
        inner.dirs.insert(id, record.clone());
        tracing::debug!(project_id = dir.project_id, path = %dir.path, "directory created");
        Ok(record)
    }

    async fn create_file(&self, file: NewFile<'_>) -> StoreResult<FileRecord> {
        let mut inner = self.inner.lock().await;
        if !inner.dirs.contains_key(&file.directory_id) {
            return Err(StoreError::NotFound(format!(
                "directory {}",
                file.directory_id
            )));
        }

        // Older versions of the same name stop being current.
        for existing in inner.files.values_mut() {
            if existing.directory_id == file.directory_id && existing.name == file.name {
                existing.current = false;
            }
        }

        let id = inner.alloc_file_id();
        let now = Utc::now();
        let record = FileRecord {
            id,
            uuid: uuid::Uuid::new_v4().to_string(),
            project_id: file.project_id,
            directory_id: file.directory_id,
            owner_id: file.owner_id,
            name: file.name.to_string(),
            path: file.path.to_string(),
            mime_type: file.mime_type.to_string(),
            size: 0,
            checksum: None,
            uses_uuid: None,
            uses_id: None,
            current: true,
            created_at: now,
            updated_at: now,
        };
        inner.files.insert(id, record.clone());
        Ok(record)
    }

    async fn update_file_metadata(
        &self,
        file: &FileRecord,
        checksum: &str,
        size: u64,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .files
            .get_mut(&file.id)
            .ok_or_else(|| StoreError::NotFound(format!("file {}", file.id)))?;
        stored.checksum = Some(checksum.to_string());
        stored.size = size;
        stored.updated_at = Utc::now();

        let project = inner
            .projects
            .get_mut(&file.project_id)
            .ok_or_else(|| StoreError::NotFound(format!("project {}", file.project_id)))?;
        project.size += size;
        project.file_count += 1;
        Ok(())
    }

    async fn point_at_existing_if_exists(
        &self,
        file: &mut FileRecord,
    ) -> StoreResult<Option<i64>> {
        let Some(checksum) = file.checksum.as_deref() else {
            return Ok(None);
        };

        let mut inner = self.inner.lock().await;
        let target = inner
            .files
            .values()
            .filter(|f| {
                f.id != file.id && f.uses_uuid.is_none() && f.checksum.as_deref() == Some(checksum)
            })
            .min_by_key(|f| f.id)
            .map(|f| (f.id, f.uuid.clone()));

        let Some((target_id, target_uuid)) = target else {
            return Ok(None);
        };

        if !inner.files.contains_key(&file.id) {
            return Err(StoreError::NotFound(format!("file {}", file.id)));
        }
        // Earlier duplicates that point at this file follow it, so no record
        // is left on bytes that are about to be deleted.
        let now = Utc::now();
        for f in inner.files.values_mut() {
            if f.id == file.id || f.uses_id == Some(file.id) {
                f.uses_uuid = Some(target_uuid.clone());
                f.uses_id = Some(target_id);
                f.updated_at = now;
            }
        }

        file.uses_uuid = Some(target_uuid);
        file.uses_id = Some(target_id);
        Ok(Some(target_id))
    }
}

#[async_trait]
impl ConversionQueue for MemoryStore {
    async fn add_file_to_convert(&self, file: &FileRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let id = inner.conversions.len() as i64 + 1;
        inner.conversions.push(ConversionJob {
            id,
            file_id: file.id,
            owner_id: file.owner_id,
            queued_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, DirectoryRecord) {
        let store = MemoryStore::new();
        store.add_user(1, "alice", "T1").await;
        store.add_project(42, "demo", 1).await;
        let root = store.find_dir_by_path(42, ROOT_PATH).await.unwrap().unwrap();
        (store, root)
    }

    fn new_file<'a>(dir: &DirectoryRecord, name: &'a str, path: &'a str) -> NewFile<'a> {
        NewFile {
            project_id: 42,
            directory_id: dir.id,
            owner_id: 1,
            name,
            path,
            mime_type: "text/plain",
        }
    }

    #[tokio::test]
    async fn token_lookup() {
        let (store, _) = seeded().await;
        assert_eq!(store.find_user_by_api_token("T1").await.unwrap().id, 1);
        assert!(matches!(
            store.find_user_by_api_token("nope").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.find_user_by_api_token("").await.is_err());
    }

    #[tokio::test]
    async fn project_access() {
        let (store, _) = seeded().await;
        store.add_user(2, "bob", "T2").await;
        assert!(store.user_can_access_project(1, 42).await.unwrap());
        assert!(!store.user_can_access_project(2, 42).await.unwrap());

        store.grant_access(2, 42).await;
        assert!(store.user_can_access_project(2, 42).await.unwrap());
    }

    #[tokio::test]
    async fn add_project_creates_root() {
        let (_, root) = seeded().await;
        assert_eq!(root.path, "/");
        assert!(root.parent_id.is_none());
    }

    #[tokio::test]
    async fn create_dir_is_idempotent() {
        let (store, root) = seeded().await;
        let req = NewDirectory {
            project_id: 42,
            parent_id: root.id,
            owner_id: 1,
            path: "/a",
            name: "a",
        };
        let first = store.create_dir_if_not_exists(req).await.unwrap();
        let second = store.create_dir_if_not_exists(req).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.parent_id, Some(root.id));
        assert_eq!(store.directories(42).await.len(), 2);
    }

    #[tokio::test]
    async fn create_dir_rejects_unknown_parent() {
        let (store, _) = seeded().await;
        let req = NewDirectory {
            project_id: 42,
            parent_id: 999,
            owner_id: 1,
            path: "/a",
            name: "a",
        };
        assert!(store.create_dir_if_not_exists(req).await.is_err());
    }

    #[tokio::test]
    async fn new_version_supersedes_old() {
        let (store, root) = seeded().await;
        let v1 = store.create_file(new_file(&root, "f.txt", "/f.txt")).await.unwrap();
        let v2 = store.create_file(new_file(&root, "f.txt", "/f.txt")).await.unwrap();
        assert_ne!(v1.uuid, v2.uuid);
        assert!(!store.file(v1.id).await.unwrap().current);
        assert!(store.file(v2.id).await.unwrap().current);
    }

    #[tokio::test]
    async fn metadata_update_accumulates_project_totals() {
        let (store, root) = seeded().await;
        let f = store.create_file(new_file(&root, "a.txt", "/a.txt")).await.unwrap();
        store.update_file_metadata(&f, "abc", 10).await.unwrap();

        let stored = store.file(f.id).await.unwrap();
        assert_eq!(stored.checksum.as_deref(), Some("abc"));
        assert_eq!(stored.size, 10);

        let project = store.project(42).await.unwrap();
        assert_eq!(project.size, 10);
        assert_eq!(project.file_count, 1);
    }

    #[tokio::test]
    async fn redirect_to_existing_checksum() {
        let (store, root) = seeded().await;
        let first = store.create_file(new_file(&root, "a.txt", "/a.txt")).await.unwrap();
        let mut second = store.create_file(new_file(&root, "b.txt", "/b.txt")).await.unwrap();

        store.update_file_metadata(&first, "same", 3).await.unwrap();
        store.update_file_metadata(&second, "same", 3).await.unwrap();
        second.checksum = Some("same".into());

        assert_eq!(
            store.point_at_existing_if_exists(&mut second).await.unwrap(),
            Some(first.id)
        );
        assert_eq!(second.uses_uuid.as_deref(), Some(first.uuid.as_str()));
        assert_eq!(second.uses_id, Some(first.id));
        assert!(store.file(second.id).await.unwrap().is_redirected());
        assert!(!store.file(first.id).await.unwrap().is_redirected());
    }

    #[tokio::test]
    async fn no_redirect_for_unique_or_missing_checksum() {
        let (store, root) = seeded().await;
        let mut f = store.create_file(new_file(&root, "a.txt", "/a.txt")).await.unwrap();
        assert!(store.point_at_existing_if_exists(&mut f).await.unwrap().is_none());

        store.update_file_metadata(&f, "unique", 1).await.unwrap();
        f.checksum = Some("unique".into());
        assert!(store.point_at_existing_if_exists(&mut f).await.unwrap().is_none());
        assert!(f.uses_uuid.is_none());
    }

    #[tokio::test]
    async fn duplicates_never_point_at_each_other() {
        let (store, root) = seeded().await;
        let mut a = store.create_file(new_file(&root, "a.txt", "/a.txt")).await.unwrap();
        let mut b = store.create_file(new_file(&root, "b.txt", "/b.txt")).await.unwrap();
        for f in [&mut a, &mut b] {
            store.update_file_metadata(f, "dup", 1).await.unwrap();
            f.checksum = Some("dup".into());
        }

        let a_target = store.point_at_existing_if_exists(&mut a).await.unwrap();
        let b_target = store.point_at_existing_if_exists(&mut b).await.unwrap();
        assert_eq!(a_target, Some(b.id));
        assert_eq!(b_target, None);
        assert!(!store.file(b.id).await.unwrap().is_redirected());
    }

    #[tokio::test]
    async fn redirect_moves_earlier_duplicates_along() {
        let (store, root) = seeded().await;
        let mut files = Vec::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            let path = format!("/{name}");
            let mut f = store.create_file(new_file(&root, name, &path)).await.unwrap();
            store.update_file_metadata(&f, "dup", 4).await.unwrap();
            f.checksum = Some("dup".into());
            files.push(f);
        }

        let mut targets = Vec::new();
        for f in &mut files {
            targets.push(store.point_at_existing_if_exists(f).await.unwrap());
        }
        let (a, b, c) = (files[0].id, files[1].id, files[2].id);
        assert_eq!(targets, vec![Some(b), Some(c), None]);

        // `a` was pointing at `b` when `b` moved to `c`.
        let stored = store.files().await;
        for f in stored.iter().filter(|f| f.is_redirected()) {
            assert_eq!(f.uses_id, Some(c), "file {} not moved to the live copy", f.id);
            assert_eq!(f.current_uuid(), files[2].uuid);
        }
        assert!(store.file(a).await.unwrap().is_redirected());
        assert_eq!(stored.iter().filter(|f| !f.is_redirected()).count(), 1);
    }

    #[tokio::test]
    async fn conversion_jobs_are_recorded() {
        let (store, root) = seeded().await;
        let f = store.create_file(new_file(&root, "a.doc", "/a.doc")).await.unwrap();
        store.add_file_to_convert(&f).await.unwrap();

        let jobs = store.conversion_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].file_id, f.id);
        assert_eq!(jobs[0].owner_id, 1);
    }
}
