//! S3-compatible blob backend (AWS S3, MinIO, RustFS)
//!
//! Blobs are objects in a single configured bucket, keyed by their
//! identifier. The bucket is created lazily on the first write and the
//! check is cached, so steady-state puts cost a single request.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use async_trait::async_trait;
use bytes::Bytes;
use depot_core::S3Config;
use tokio::sync::OnceCell;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{BlobDownload, BlobError, BlobStore};

/// Blob store backed by an S3-compatible object store
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    region: String,
    bucket_ready: OnceCell<()>,
}

impl S3BlobStore {
    /// Create the store from configuration. Builds the client but does
    /// not touch the bucket yet; that happens lazily on first use.
    pub async fn new(config: &S3Config) -> Result<Self, BlobError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "depot-config",
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            bucket_ready: OnceCell::new(),
        })
    }

    /// Make sure the bucket exists, creating it if absent. Idempotent
    /// and cached after the first success.
    async fn ensure_bucket(&self) -> Result<(), BlobError> {
        self.bucket_ready
            .get_or_try_init(|| async {
                let exists = self
                    .client
                    .head_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .is_ok();

                if !exists {
                    debug!("creating bucket {}", self.bucket);

                    let constraint =
                        aws_sdk_s3::types::BucketLocationConstraint::from(self.region.as_str());
                    let bucket_config = aws_sdk_s3::types::CreateBucketConfiguration::builder()
                        .location_constraint(constraint)
                        .build();

                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .create_bucket_configuration(bucket_config)
                        .send()
                        .await
                        .map_err(|e| BlobError::ConnectionFailed(e.to_string()))?;
                }

                Ok(())
            })
            .await
            .copied()
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, id: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.ensure_bucket().await?;

        debug!(
            "PUT {} ({} bytes, {}) -> bucket {}",
            id,
            data.len(),
            content_type,
            self.bucket
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(id)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<BlobDownload, BlobError> {
        debug!("GET {} <- bucket {}", id, self.bucket);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_no_such_key() {
                    BlobError::NotFound(id.to_string())
                } else {
                    BlobError::Backend(err.to_string())
                }
            })?;

        let content_type = response.content_type().map(|s| s.to_string());
        let size = response.content_length();

        let reader = response.body.into_async_read();

        Ok(BlobDownload {
            stream: Box::pin(ReaderStream::new(reader)),
            size,
            content_type,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        debug!("DELETE {} from bucket {}", id, self.bucket);

        // S3 delete is idempotent and reports success for absent keys,
        // so probe first to keep NotFound distinguishable.
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_not_found() {
                    BlobError::NotFound(id.to_string())
                } else {
                    BlobError::Backend(err.to_string())
                }
            })?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| BlobError::Backend(e.to_string()))?;

        Ok(())
    }
}
