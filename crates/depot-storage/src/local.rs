//! Local-disk blob backend
//!
//! Blobs are plain files under a configured root directory, named by
//! their identifier. The content type is not recorded on disk; the
//! metadata store is the source of truth for it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{BlobDownload, BlobError, BlobStore};

/// Blob store writing files under a root directory on local disk
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create the store, making the root directory if it is absent.
    pub async fn new(root: PathBuf) -> Result<Self, BlobError> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, id: &str, data: Bytes, _content_type: &str) -> Result<(), BlobError> {
        let path = self.blob_path(id);

        // Ids never repeat, so a colliding path means something is wrong.
        // Refuse rather than silently overwrite.
        if fs::try_exists(&path).await? {
            return Err(BlobError::AlreadyExists(id.to_string()));
        }

        debug!("PUT {} ({} bytes) -> {}", id, data.len(), path.display());

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<BlobDownload, BlobError> {
        let path = self.blob_path(id);

        debug!("GET {} <- {}", id, path.display());

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata().await.ok().map(|m| m.len() as i64);

        Ok(BlobDownload {
            stream: Box::pin(ReaderStream::new(file)),
            size,
            content_type: None,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        let path = self.blob_path(id);

        debug!("DELETE {} ({})", id, path.display());

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
