//! The file metadata record

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one uploaded file.
///
/// The blob itself is stored under `file_id` in the active blob
/// backend; this record carries everything needed to present the file
/// back to the client under its original name. None of the descriptive
/// fields change after creation; only `deleted` does, and only from
/// false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Driver-level document id; absent until inserted
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Opaque identifier shared with the blob backend, never reused
    pub file_id: String,

    /// User-supplied filename at upload time, used for download
    /// presentation only
    pub original_name: String,

    /// MIME type declared at upload time
    pub content_type: String,

    /// Set once at creation
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub uploaded_at: DateTime<Utc>,

    /// Soft-delete flag; the record itself persists
    pub deleted: bool,
}

impl FileRecord {
    /// Build a fresh, non-deleted record stamped with the current time.
    pub fn new(file_id: String, original_name: String, content_type: String) -> Self {
        Self {
            id: None,
            file_id,
            original_name,
            content_type,
            uploaded_at: Utc::now(),
            deleted: false,
        }
    }
}
