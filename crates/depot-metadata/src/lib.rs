//! depot-metadata: metadata store for uploaded files
//!
//! One [`FileRecord`] per uploaded file, keyed by the same identifier
//! the blob backend uses. Records are never physically deleted, only
//! flagged, so every upload leaves a permanent trace.
//!
//! The store is a trait so the orchestrator can be tested without a
//! database; the production implementation is MongoDB.

pub mod error;
pub mod mongo;
pub mod record;

use async_trait::async_trait;

pub use error::MetadataError;
pub use mongo::MongoMetadataStore;
pub use record::FileRecord;

/// Persistence operations over the file-record collection.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Bulk-insert the given records.
    ///
    /// Success is reported only after the store has acknowledged the
    /// write; there is no fire-and-forget path.
    async fn insert(&self, records: Vec<FileRecord>) -> Result<(), MetadataError>;

    /// Fetch records whose `file_id` is in `ids`, in store order.
    ///
    /// Missing ids are simply absent from the result, not an error.
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, MetadataError>;

    /// Fetch every record, soft-deleted ones included.
    ///
    /// Deliberately asymmetric with [`MetadataStore::count`], which
    /// excludes deleted records: listings show the full history and the
    /// presentation layer filters if it wants to.
    async fn get_all(&self) -> Result<Vec<FileRecord>, MetadataError>;

    /// Set `deleted = true` for each of `ids`.
    ///
    /// Fails fast on the first store error. An id with no matching
    /// record is not a failure; the transition is monotonic, so marking
    /// an already-deleted record is a no-op.
    async fn soft_delete(&self, ids: &[String]) -> Result<(), MetadataError>;

    /// Number of records with `deleted == false`.
    ///
    /// A store failure is an `Err`, never a zero count.
    async fn count(&self) -> Result<u64, MetadataError>;
}
