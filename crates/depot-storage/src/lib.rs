//! depot-storage: interchangeable blob backends for the Depot service
//!
//! Raw file bytes live in exactly one backend per deployment, named by
//! the opaque file identifier with no extension or prefix. The backend
//! is picked once at startup from configuration and injected as an
//! `Arc<dyn BlobStore>`; nothing downstream branches on the concrete
//! type.

pub mod error;
pub mod local;
pub mod memory;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use depot_core::{DepotConfig, StorageBackend};
use futures::stream::BoxStream;

pub use error::BlobError;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

/// A blob fetched from a backend.
///
/// The stream is positioned at offset 0. `size` and `content_type` are
/// hints from the backend; the object store knows both, the local-disk
/// backend only the size.
pub struct BlobDownload {
    pub stream: BoxStream<'static, std::io::Result<Bytes>>,
    pub size: Option<i64>,
    pub content_type: Option<String>,
}

impl std::fmt::Debug for BlobDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobDownload")
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl BlobDownload {
    /// Collect the whole stream into memory. Intended for tests and
    /// small payloads; handlers stream the body instead.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        use futures::TryStreamExt;
        let chunks: Vec<Bytes> = self.stream.try_collect().await?;
        let mut buf = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in chunks {
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }
}

/// Capability implemented by every blob backend.
///
/// Three operations, all keyed by the generated file identifier. A
/// single operation is atomic at the backend level; consistency with
/// the metadata store is the orchestrator's job, not ours.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `id`.
    ///
    /// Identifiers are generator-guaranteed unique, so an existing
    /// object under `id` indicates a bug; the local backend rejects it
    /// outright with [`BlobError::AlreadyExists`].
    async fn put(&self, id: &str, data: Bytes, content_type: &str) -> Result<(), BlobError>;

    /// Fetch the bytes stored under `id`.
    ///
    /// A missing blob is [`BlobError::NotFound`], distinct from every
    /// other failure so callers can answer 404 instead of 500.
    async fn get(&self, id: &str) -> Result<BlobDownload, BlobError>;

    /// Remove the bytes stored under `id`.
    ///
    /// Deleting a missing id reports [`BlobError::NotFound`]; the
    /// orchestrator treats both that and hard failures as "did not
    /// delete an existing object".
    async fn delete(&self, id: &str) -> Result<(), BlobError>;
}

/// Build the blob store selected by configuration.
///
/// Called once at startup; the returned trait object is shared across
/// all requests.
pub async fn build_blob_store(config: &DepotConfig) -> Result<Arc<dyn BlobStore>, BlobError> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(
            LocalBlobStore::new(config.local_storage_path.clone()).await?,
        )),
        StorageBackend::S3 => Ok(Arc::new(S3BlobStore::new(&config.s3).await?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryBlobStore::new())),
    }
}
