//! End-of-session work for the open file.
//!
//! Runs once per session that opened a file, whether the client finished,
//! disconnected, or broke the protocol. Failures here are logged and never
//! reported to the client, which may already be gone.

use mcft_store::FileRecord;
use mcft_transfer::{BlockWriter, CHECKSUM_ALGORITHM};

use crate::context::Services;
use crate::conversion::ConversionKind;

/// The file a session is currently writing.
pub(crate) struct OpenUpload {
    pub record: FileRecord,
    pub writer: BlockWriter,
}

/// What happened to the session's file after it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Teardown {
    /// The session never opened a file.
    NoUpload,
    /// The written file could not be inspected; metadata left as created.
    Unfinalized { file_id: i64 },
    /// Content matched an existing file; the new bytes were discarded.
    Deduplicated { file_id: i64, existing_id: i64 },
    /// The file keeps its own bytes.
    Stored {
        file_id: i64,
        conversion: Option<ConversionKind>,
    },
}

pub(crate) async fn finalize_upload(services: &Services, upload: OpenUpload) -> Teardown {
    let OpenUpload { mut record, writer } = upload;
    let file_id = record.id;
    let finished = writer.finish().await;

    let size = match tokio::fs::metadata(&finished.path).await {
        Ok(meta) => meta.len(),
        Err(e) => {
            tracing::error!(file_id, path = %finished.path.display(), "stat failed: {e}");
            return Teardown::Unfinalized { file_id };
        }
    };

    let checksum = finished.checksum();
    if let Err(e) = services
        .store
        .update_file_metadata(&record, &checksum, size)
        .await
    {
        tracing::error!(file_id, "failed to update file metadata: {e}");
    }
    tracing::info!(file_id, size, %checksum, algorithm = CHECKSUM_ALGORITHM, "upload closed");
    record.checksum = Some(checksum);
    record.size = size;

    match services.store.point_at_existing_if_exists(&mut record).await {
        Ok(Some(existing_id)) => {
            if let Err(e) = tokio::fs::remove_file(&finished.path).await {
                tracing::warn!(file_id, path = %finished.path.display(), "failed to remove duplicate bytes: {e}");
            }
            tracing::info!(file_id, existing_id, "upload deduplicated");
            return Teardown::Deduplicated {
                file_id,
                existing_id,
            };
        }
        Ok(None) => {}
        Err(e) => tracing::error!(file_id, "dedup lookup failed: {e}"),
    }

    let conversion = ConversionKind::for_mime(&record.mime_type);
    if let Some(kind) = conversion {
        match services.conversions.add_file_to_convert(&record).await {
            Ok(()) => tracing::debug!(file_id, ?kind, "conversion requested"),
            Err(e) => tracing::error!(file_id, ?kind, "failed to request conversion: {e}"),
        }
    }

    Teardown::Stored {
        file_id,
        conversion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mcft_store::{MemoryStore, MetadataStore, NewFile, ROOT_PATH};
    use mcft_transfer::{ContentLayout, checksum_bytes};
    use tempfile::TempDir;

    struct Fixture {
        store: Arc<MemoryStore>,
        services: Services,
        _tmp: TempDir,
    }

    async fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        store.add_user(1, "alice", "T1").await;
        store.add_project(42, "demo", 1).await;
        let services = Services::new(
            store.clone(),
            store.clone(),
            ContentLayout::new(tmp.path()),
        );
        Fixture {
            store,
            services,
            _tmp: tmp,
        }
    }

    async fn open(fx: &Fixture, name: &str, mime: &str, data: &[u8]) -> OpenUpload {
        let root = fx
            .store
            .find_dir_by_path(42, ROOT_PATH)
            .await
            .unwrap()
            .unwrap();
        let path = format!("/{name}");
        let record = fx
            .store
            .create_file(NewFile {
                project_id: 42,
                directory_id: root.id,
                owner_id: 1,
                name,
                path: &path,
                mime_type: mime,
            })
            .await
            .unwrap();
        let target = fx.services.layout.path_for(&record.uuid).unwrap();
        let mut writer = BlockWriter::create(target).await.unwrap();
        writer.write_block(data).await.unwrap();
        OpenUpload { record, writer }
    }

    #[tokio::test]
    async fn stores_size_and_checksum() {
        let fx = fixture().await;
        let upload = open(&fx, "a.txt", "text/plain", b"hello").await;
        let id = upload.record.id;

        let outcome = finalize_upload(&fx.services, upload).await;
        assert_eq!(
            outcome,
            Teardown::Stored {
                file_id: id,
                conversion: None
            }
        );

        let stored = fx.store.file(id).await.unwrap();
        assert_eq!(stored.size, 5);
        assert_eq!(stored.checksum.as_deref(), Some(checksum_bytes(b"hello").as_str()));
        assert_eq!(fx.store.project(42).await.unwrap().size, 5);
        assert!(fx.store.conversion_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn convertible_upload_is_queued() {
        let fx = fixture().await;
        let upload = open(&fx, "scan.bmp", "image/bmp", b"BM...").await;
        let id = upload.record.id;

        let outcome = finalize_upload(&fx.services, upload).await;
        assert_eq!(
            outcome,
            Teardown::Stored {
                file_id: id,
                conversion: Some(ConversionKind::Jpeg)
            }
        );
        let jobs = fx.store.conversion_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].file_id, id);
    }

    #[tokio::test]
    async fn duplicate_content_is_discarded() {
        let fx = fixture().await;
        let first = open(&fx, "one.docx", "application/msword", b"same").await;
        let first_id = first.record.id;
        finalize_upload(&fx.services, first).await;

        let second = open(&fx, "two.docx", "application/msword", b"same").await;
        let second_id = second.record.id;
        let second_path = fx.services.layout.path_for(&second.record.uuid).unwrap();

        let outcome = finalize_upload(&fx.services, second).await;
        assert_eq!(
            outcome,
            Teardown::Deduplicated {
                file_id: second_id,
                existing_id: first_id
            }
        );
        assert!(!second_path.exists());

        let stored = fx.store.file(second_id).await.unwrap();
        assert_eq!(stored.uses_id, Some(first_id));
        // Only the original was sent for conversion.
        let jobs = fx.store.conversion_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].file_id, first_id);
    }

    #[tokio::test]
    async fn interleaved_duplicates_keep_one_live_copy() {
        let fx = fixture().await;
        let mut uploads = Vec::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            uploads.push(open(&fx, name, "text/plain", b"same").await);
        }
        let ids: Vec<i64> = uploads.iter().map(|u| u.record.id).collect();
        let paths: Vec<_> = uploads
            .iter()
            .map(|u| u.writer.path().to_path_buf())
            .collect();

        // The later uploads record their checksum before the first one
        // reaches its dedup step.
        let checksum = checksum_bytes(b"same");
        for upload in &uploads[1..] {
            fx.store
                .update_file_metadata(&upload.record, &checksum, 4)
                .await
                .unwrap();
        }

        let mut outcomes = Vec::new();
        for upload in uploads {
            outcomes.push(finalize_upload(&fx.services, upload).await);
        }
        assert_eq!(
            outcomes,
            vec![
                Teardown::Deduplicated {
                    file_id: ids[0],
                    existing_id: ids[1]
                },
                Teardown::Deduplicated {
                    file_id: ids[1],
                    existing_id: ids[2]
                },
                Teardown::Stored {
                    file_id: ids[2],
                    conversion: None
                },
            ]
        );

        for id in &ids {
            let stored = fx.store.file(*id).await.unwrap();
            let uuid = stored.current_uuid();
            let backing = fx.services.layout.path_for(uuid).unwrap();
            assert!(backing.exists(), "file {id} points at missing bytes");
        }
        assert_eq!(paths.iter().filter(|p| p.exists()).count(), 1);
    }

    #[tokio::test]
    async fn missing_file_leaves_metadata_untouched() {
        let fx = fixture().await;
        let upload = open(&fx, "gone.txt", "text/plain", b"bytes").await;
        let id = upload.record.id;
        std::fs::remove_file(upload.writer.path()).unwrap();

        let outcome = finalize_upload(&fx.services, upload).await;
        assert_eq!(outcome, Teardown::Unfinalized { file_id: id });

        let stored = fx.store.file(id).await.unwrap();
        assert_eq!(stored.checksum, None);
        assert_eq!(fx.store.project(42).await.unwrap().file_count, 0);
    }
}
