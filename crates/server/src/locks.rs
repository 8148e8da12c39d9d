//! Per-project mutex table.
//!
//! Entries are created on first use and never removed, so the table holds
//! one mutex for every project this process has resolved directories in.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Process-wide map of project id to mutex.
#[derive(Default)]
pub struct ProjectLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `project_id`.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn acquire(&self, project_id: i64) -> OwnedMutexGuard<()> {
        // Clone the Arc so the map shard is unlocked before awaiting.
        let lock = self.locks.entry(project_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Number of projects with a mutex.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
