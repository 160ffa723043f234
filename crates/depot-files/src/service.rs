//! Storage orchestrator
//!
//! `FileService` is the façade the HTTP layer talks to. It owns the
//! ordering rules that keep two independent stores coherent without a
//! shared transaction: bytes are written before metadata is recorded,
//! and bytes are confirmed gone before metadata is flagged deleted.
//! A failed batch can leave orphan blobs behind (reclaimable by an
//! out-of-band sweep); it can never leave a record pointing at nothing.

use std::sync::Arc;

use depot_core::{new_file_id, AllowedType};
use depot_metadata::{FileRecord, MetadataStore};
use depot_storage::{BlobDownload, BlobStore};
use tracing::{error, info};

use crate::error::FileError;
use crate::policy::{UploadPolicy, UploadedFile};

/// Orchestrates uploads, downloads, and deletes across the active blob
/// backend and the metadata store.
pub struct FileService {
    blob_store: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    policy: UploadPolicy,
}

impl FileService {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            blob_store,
            metadata,
            policy,
        }
    }

    /// Store an upload batch and return the generated ids in upload
    /// order.
    ///
    /// The batch is admitted or rejected as a whole before any write.
    /// Bytes go to the blob backend first, one file at a time; the
    /// metadata records for the whole batch are inserted in a single
    /// call only after every blob write succeeded. On a mid-batch blob
    /// failure the already-written blobs remain as orphans and no
    /// metadata is inserted.
    pub async fn store_files(&self, files: Vec<UploadedFile>) -> Result<Vec<String>, FileError> {
        let current_count = if self.policy.has_quota() {
            Some(self.metadata.count().await?)
        } else {
            None
        };

        self.policy.validate(&files, current_count)?;

        let mut records = Vec::new();

        for file in files.into_iter().filter(|f| !f.is_empty()) {
            let file_id = new_file_id();

            info!("uploading file '{}' as {}", file.name, file_id);

            if let Err(e) = self
                .blob_store
                .put(&file_id, file.bytes, &file.content_type)
                .await
            {
                error!(
                    "blob write for '{}' failed, aborting batch ({} orphan blob(s) left for reconciliation): {}",
                    file.name,
                    records.len(),
                    e
                );
                return Err(e.into());
            }

            records.push(FileRecord::new(file_id, file.name, file.content_type));
        }

        let ids: Vec<String> = records.iter().map(|r| r.file_id.clone()).collect();

        if let Err(e) = self.metadata.insert(records).await {
            error!(
                "metadata insert failed after blob writes; orphan blobs {:?} left for reconciliation: {}",
                ids, e
            );
            return Err(e.into());
        }

        Ok(ids)
    }

    /// Fetch the raw bytes stored under `id`.
    ///
    /// Goes straight to the blob backend without touching metadata, so
    /// a metadata outage does not block downloads.
    pub async fn get_file(&self, id: &str) -> Result<BlobDownload, FileError> {
        Ok(self.blob_store.get(id).await?)
    }

    /// Delete the blob under `id`, then flag its metadata record.
    ///
    /// The record is only marked deleted once the bytes are confirmed
    /// gone. If the blob delete fails or finds nothing, metadata is
    /// left untouched and the failure is surfaced.
    pub async fn delete_file(&self, id: &str) -> Result<(), FileError> {
        self.blob_store.delete(id).await?;

        info!("deleted blob {}, marking record", id);

        self.metadata.soft_delete(&[id.to_string()]).await?;
        Ok(())
    }

    /// Metadata records for the given ids; missing ids are absent from
    /// the result.
    pub async fn get_metadata(&self, ids: &[String]) -> Result<Vec<FileRecord>, FileError> {
        Ok(self.metadata.get_by_ids(ids).await?)
    }

    /// Every metadata record, soft-deleted ones included.
    pub async fn get_all_metadata(&self) -> Result<Vec<FileRecord>, FileError> {
        Ok(self.metadata.get_all().await?)
    }

    /// Number of non-deleted files in storage.
    pub async fn upload_count(&self) -> Result<u64, FileError> {
        Ok(self.metadata.count().await?)
    }

    /// The upload whitelist, as configured at startup.
    pub fn allowed_types(&self) -> &[AllowedType] {
        self.policy.allowed_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use depot_metadata::MetadataError;
    use depot_storage::{BlobError, MemoryBlobStore};
    use tokio::sync::Mutex;

    /// Metadata store over a plain map, mirroring the Mongo contract.
    #[derive(Default)]
    struct MemoryMetadataStore {
        records: Mutex<Vec<FileRecord>>,
    }

    #[async_trait]
    impl MetadataStore for MemoryMetadataStore {
        async fn insert(&self, records: Vec<FileRecord>) -> Result<(), MetadataError> {
            self.records.lock().await.extend(records);
            Ok(())
        }

        async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, MetadataError> {
            Ok(self
                .records
                .lock()
                .await
                .iter()
                .filter(|r| ids.contains(&r.file_id))
                .cloned()
                .collect())
        }

        async fn get_all(&self) -> Result<Vec<FileRecord>, MetadataError> {
            Ok(self.records.lock().await.clone())
        }

        async fn soft_delete(&self, ids: &[String]) -> Result<(), MetadataError> {
            let mut records = self.records.lock().await;
            for record in records.iter_mut() {
                if ids.contains(&record.file_id) {
                    record.deleted = true;
                }
            }
            Ok(())
        }

        async fn count(&self) -> Result<u64, MetadataError> {
            Ok(self
                .records
                .lock()
                .await
                .iter()
                .filter(|r| !r.deleted)
                .count() as u64)
        }
    }

    /// Blob store that fails every put after the first `ok_puts`.
    struct FlakyBlobStore {
        inner: MemoryBlobStore,
        ok_puts: usize,
        puts: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for FlakyBlobStore {
        async fn put(&self, id: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
            if self.puts.fetch_add(1, Ordering::SeqCst) >= self.ok_puts {
                return Err(BlobError::Backend("injected put failure".to_string()));
            }
            self.inner.put(id, data, content_type).await
        }

        async fn get(&self, id: &str) -> Result<BlobDownload, BlobError> {
            self.inner.get(id).await
        }

        async fn delete(&self, id: &str) -> Result<(), BlobError> {
            self.inner.delete(id).await
        }
    }

    /// Metadata store whose bulk insert always fails.
    #[derive(Default)]
    struct InsertFailingStore {
        inner: MemoryMetadataStore,
    }

    #[async_trait]
    impl MetadataStore for InsertFailingStore {
        async fn insert(&self, _records: Vec<FileRecord>) -> Result<(), MetadataError> {
            Err(MetadataError::QueryFailed("injected insert failure".to_string()))
        }

        async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, MetadataError> {
            self.inner.get_by_ids(ids).await
        }

        async fn get_all(&self) -> Result<Vec<FileRecord>, MetadataError> {
            self.inner.get_all().await
        }

        async fn soft_delete(&self, ids: &[String]) -> Result<(), MetadataError> {
            self.inner.soft_delete(ids).await
        }

        async fn count(&self) -> Result<u64, MetadataError> {
            self.inner.count().await
        }
    }

    fn whitelist() -> Vec<AllowedType> {
        vec![
            AllowedType {
                content_type: "text/plain".to_string(),
                extension: ".txt".to_string(),
            },
            AllowedType {
                content_type: "image/png".to_string(),
                extension: ".png".to_string(),
            },
        ]
    }

    fn policy(max_count: Option<u64>) -> UploadPolicy {
        UploadPolicy::new(1024, max_count, whitelist())
    }

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            content_type: "text/plain".to_string(),
            bytes: Bytes::from(content.to_string()),
        }
    }

    fn service(max_count: Option<u64>) -> (Arc<MemoryBlobStore>, Arc<MemoryMetadataStore>, FileService) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let metadata = Arc::new(MemoryMetadataStore::default());
        let svc = FileService::new(blobs.clone(), metadata.clone(), policy(max_count));
        (blobs, metadata, svc)
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let (_blobs, _metadata, svc) = service(None);

        let ids = svc
            .store_files(vec![text_file("notes.txt", "hello world")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);

        let bytes = svc
            .get_file(&ids[0])
            .await
            .unwrap()
            .into_bytes()
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"hello world");

        let records = svc.get_metadata(&ids).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original_name, "notes.txt");
        assert_eq!(records[0].content_type, "text/plain");
        assert!(!records[0].deleted);
    }

    #[tokio::test]
    async fn ids_come_back_in_upload_order() {
        let (_blobs, _metadata, svc) = service(None);

        let ids = svc
            .store_files(vec![
                text_file("a.txt", "a"),
                text_file("b.txt", "b"),
                text_file("c.txt", "c"),
            ])
            .await
            .unwrap();

        let names: HashMap<String, String> = svc
            .get_metadata(&ids)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.file_id, r.original_name))
            .collect();

        assert_eq!(names[&ids[0]], "a.txt");
        assert_eq!(names[&ids[1]], "b.txt");
        assert_eq!(names[&ids[2]], "c.txt");
    }

    #[tokio::test]
    async fn empty_files_are_not_stored() {
        let (blobs, _metadata, svc) = service(None);

        let ids = svc
            .store_files(vec![
                text_file("real.txt", "content"),
                text_file("empty.txt", ""),
            ])
            .await
            .unwrap();

        assert_eq!(ids.len(), 1);
        assert_eq!(blobs.len().await, 1);
    }

    #[tokio::test]
    async fn rejected_batch_writes_nothing() {
        let (blobs, metadata, svc) = service(None);

        let batch = vec![
            text_file("fine.txt", "ok"),
            UploadedFile {
                name: "virus.exe".to_string(),
                content_type: "application/x-msdownload".to_string(),
                bytes: Bytes::from_static(b"MZ"),
            },
        ];

        let err = svc.store_files(batch).await.unwrap_err();
        assert!(matches!(
            err,
            FileError::Rejected(crate::PolicyRejection::TypeNotAllowed { .. })
        ));
        assert!(blobs.is_empty().await);
        assert_eq!(metadata.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn quota_blocks_upload_and_leaves_no_trace() {
        let (blobs, metadata, svc) = service(Some(2));

        svc.store_files(vec![text_file("a.txt", "a"), text_file("b.txt", "b")])
            .await
            .unwrap();

        let err = svc
            .store_files(vec![text_file("c.txt", "c")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FileError::Rejected(crate::PolicyRejection::QuotaExceeded { limit: 2 })
        ));
        assert_eq!(blobs.len().await, 2);
        assert_eq!(metadata.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn deleting_frees_quota() {
        let (_blobs, _metadata, svc) = service(Some(1));

        let ids = svc
            .store_files(vec![text_file("a.txt", "a")])
            .await
            .unwrap();
        assert!(svc.store_files(vec![text_file("b.txt", "b")]).await.is_err());

        svc.delete_file(&ids[0]).await.unwrap();

        // The flagged record no longer counts against the quota
        svc.store_files(vec![text_file("b.txt", "b")]).await.unwrap();
    }

    #[tokio::test]
    async fn mid_batch_blob_failure_inserts_no_metadata() {
        let blobs = Arc::new(FlakyBlobStore {
            inner: MemoryBlobStore::new(),
            ok_puts: 2,
            puts: AtomicUsize::new(0),
        });
        let metadata = Arc::new(MemoryMetadataStore::default());
        let svc = FileService::new(blobs, metadata.clone(), policy(None));

        let err = svc
            .store_files(vec![
                text_file("a.txt", "a"),
                text_file("b.txt", "b"),
                text_file("c.txt", "c"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::Blob(_)));

        // No record for any file in the batch, including the two whose
        // blobs were written (they are orphans now)
        assert!(metadata.get_all().await.unwrap().is_empty());
        assert_eq!(metadata.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn metadata_insert_failure_is_surfaced() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let metadata = Arc::new(InsertFailingStore::default());
        let svc = FileService::new(blobs.clone(), metadata, policy(None));

        let err = svc
            .store_files(vec![text_file("a.txt", "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::Metadata(_)));

        // The blob was written before the insert failed; it stays
        // behind as a reconcilable orphan
        assert_eq!(blobs.len().await, 1);
    }

    #[tokio::test]
    async fn delete_flags_record_and_removes_blob() {
        let (blobs, metadata, svc) = service(None);

        let ids = svc
            .store_files(vec![text_file("doomed.txt", "bye")])
            .await
            .unwrap();

        svc.delete_file(&ids[0]).await.unwrap();

        assert!(svc.get_file(&ids[0]).await.unwrap_err().is_not_found());
        assert!(blobs.is_empty().await);
        assert_eq!(svc.upload_count().await.unwrap(), 0);

        // get_all still returns the flagged record
        let all = metadata.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].deleted);
    }

    #[tokio::test]
    async fn delete_of_missing_blob_leaves_metadata_untouched() {
        let (_blobs, metadata, svc) = service(None);

        let ids = svc
            .store_files(vec![text_file("keep.txt", "stay")])
            .await
            .unwrap();

        let err = svc.delete_file("no-such-id").await.unwrap_err();
        assert!(err.is_not_found());

        let records = metadata.get_by_ids(&ids).await.unwrap();
        assert!(!records[0].deleted);
    }

    #[tokio::test]
    async fn repeated_get_returns_identical_bytes() {
        let (_blobs, _metadata, svc) = service(None);
        let ids = svc
            .store_files(vec![text_file("same.txt", "constant")])
            .await
            .unwrap();

        for _ in 0..3 {
            let bytes = svc
                .get_file(&ids[0])
                .await
                .unwrap()
                .into_bytes()
                .await
                .unwrap();
            assert_eq!(bytes.as_ref(), b"constant");
        }
    }

    #[tokio::test]
    async fn get_metadata_ignores_unknown_ids() {
        let (_blobs, _metadata, svc) = service(None);
        let ids = svc
            .store_files(vec![text_file("a.txt", "a")])
            .await
            .unwrap();

        let query = vec![ids[0].clone(), "unknown".to_string()];
        let records = svc.get_metadata(&query).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn allowed_types_reflect_configuration() {
        let (_blobs, _metadata, svc) = service(None);
        let types = svc.allowed_types();
        assert_eq!(types.len(), 2);
        assert!(types.iter().any(|t| t.extension == ".png"));
    }
}
