//! In-memory blob backend
//!
//! Keeps blobs in a process-local map. Used by the orchestrator tests
//! and handy for local experiments; not meant for real deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::sync::RwLock;

use crate::{BlobDownload, BlobError, BlobStore};

#[derive(Clone)]
struct StoredBlob {
    data: Bytes,
    content_type: String,
}

/// Blob store holding everything in memory
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held. Test helper.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, id: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(id) {
            return Err(BlobError::AlreadyExists(id.to_string()));
        }
        blobs.insert(
            id.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<BlobDownload, BlobError> {
        let blobs = self.blobs.read().await;
        let blob = blobs
            .get(id)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(id.to_string()))?;

        Ok(BlobDownload {
            size: Some(blob.data.len() as i64),
            content_type: Some(blob.content_type),
            stream: Box::pin(stream::once(async move {
                Ok::<_, std::io::Error>(blob.data)
            })),
        })
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        self.blobs
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(id.to_string()))
    }
}
