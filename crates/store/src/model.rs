use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical path of every project's root directory.
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub api_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    /// Total bytes of finalized uploads.
    pub size: u64,
    pub file_count: u64,
}

/// A directory inside a project namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub id: i64,
    pub uuid: String,
    pub project_id: i64,
    /// `None` only for the project root.
    pub parent_id: Option<i64>,
    pub owner_id: i64,
    /// Full logical path, e.g. `/a/b`.
    pub path: String,
    pub name: String,
}

/// A file version and the location of its physical bytes.
///
/// `uuid` names the slot the bytes were uploaded into. After dedup the
/// record may point at another file's bytes through `uses_uuid`; the
/// record keeps its own identity either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub uuid: String,
    pub project_id: i64,
    pub directory_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub path: String,
    pub mime_type: String,
    pub size: u64,
    pub checksum: Option<String>,
    pub uses_uuid: Option<String>,
    pub uses_id: Option<i64>,
    /// Whether this is the latest version of `path`.
    pub current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// UUID of the slot that currently holds this file's bytes.
    pub fn current_uuid(&self) -> &str {
        self.uses_uuid.as_deref().unwrap_or(&self.uuid)
    }

    /// Returns `true` if the record points at another file's bytes.
    pub fn is_redirected(&self) -> bool {
        self.uses_uuid.is_some()
    }
}

/// Parameters for [`MetadataStore::create_dir_if_not_exists`](crate::MetadataStore::create_dir_if_not_exists).
#[derive(Debug, Clone, Copy)]
pub struct NewDirectory<'a> {
    pub project_id: i64,
    pub parent_id: i64,
    pub owner_id: i64,
    pub path: &'a str,
    pub name: &'a str,
}

/// Parameters for [`MetadataStore::create_file`](crate::MetadataStore::create_file).
#[derive(Debug, Clone, Copy)]
pub struct NewFile<'a> {
    pub project_id: i64,
    pub directory_id: i64,
    pub owner_id: i64,
    pub name: &'a str,
    pub path: &'a str,
    pub mime_type: &'a str,
}

/// A queued request to render a file into a web-viewable format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub id: i64,
    pub file_id: i64,
    pub owner_id: i64,
    pub queued_at: DateTime<Utc>,
}
