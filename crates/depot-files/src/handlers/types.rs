//! Request and response types for file HTTP handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use depot_metadata::FileRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::FileService;

/// Application state for file handlers
pub struct FilesAppState {
    pub file_service: Arc<FileService>,
}

/// Response after a successful upload
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Generated identifiers, in upload order
    #[schema(example = json!(["550e8400-e29b-41d4-a716-446655440000"]))]
    pub ids: Vec<String>,
}

/// One file's metadata as presented to clients
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadataResponse {
    /// Opaque identifier naming the stored bytes
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub file_id: String,
    /// Original filename at upload time
    #[schema(example = "report.pdf")]
    pub original_name: String,
    /// MIME type declared at upload time
    #[schema(example = "application/pdf")]
    pub content_type: String,
    /// Upload timestamp
    #[schema(example = "2025-01-03T12:00:00Z")]
    pub uploaded_at: DateTime<Utc>,
    /// Whether the file has been soft-deleted
    #[schema(example = false)]
    pub deleted: bool,
}

impl From<FileRecord> for FileMetadataResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            file_id: record.file_id,
            original_name: record.original_name,
            content_type: record.content_type,
            uploaded_at: record.uploaded_at,
            deleted: record.deleted,
        }
    }
}

/// Query parameters for bulk metadata lookup
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MetadataQuery {
    /// Comma-separated list of file identifiers
    #[schema(example = "id-one,id-two")]
    pub ids: String,
}

impl MetadataQuery {
    pub fn id_list(&self) -> Vec<String> {
        self.ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Response for the upload count
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    /// Number of non-deleted files in storage
    #[schema(example = 42)]
    pub count: u64,
}

/// Response after deleting a file
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileResponse {
    /// Whether the file was deleted
    #[schema(example = true)]
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_query_splits_and_trims() {
        let query = MetadataQuery {
            ids: "a, b ,,c".to_string(),
        };
        assert_eq!(query.id_list(), vec!["a", "b", "c"]);
    }

    #[test]
    fn response_mirrors_record() {
        let record = FileRecord::new(
            "id1".to_string(),
            "photo.png".to_string(),
            "image/png".to_string(),
        );
        let response = FileMetadataResponse::from(record.clone());
        assert_eq!(response.file_id, "id1");
        assert_eq!(response.original_name, "photo.png");
        assert_eq!(response.uploaded_at, record.uploaded_at);
        assert!(!response.deleted);
    }
}
