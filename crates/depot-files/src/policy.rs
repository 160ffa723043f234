//! Upload admission policy
//!
//! Pure batch validation, evaluated once before any storage write. The
//! batch is all-or-nothing: one offending file rejects every file in
//! the request, so callers never see a partially applied upload.

use bytes::Bytes;
use depot_core::AllowedType;
use thiserror::Error;

/// One file from an upload request, as handed to the core by the HTTP
/// layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename, kept for download presentation
    pub name: String,
    /// Declared MIME type
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Why an upload batch was turned away
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyRejection {
    #[error("upload would exceed the maximum number of stored files: {limit}")]
    QuotaExceeded { limit: u64 },

    #[error("file {name} exceeds the maximum upload size of {limit} bytes")]
    FileTooLarge { name: String, limit: u64 },

    #[error("file {name} with content-type {content_type} is not allowed")]
    TypeNotAllowed { name: String, content_type: String },
}

/// Admission rules for upload batches.
///
/// The quota check is read-then-act against a count fetched by the
/// caller, so near the boundary two concurrent uploads can both pass.
/// The limit is advisory, not a hard guarantee.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_file_size_bytes: u64,
    max_file_count: Option<u64>,
    allowed: Vec<AllowedType>,
}

impl UploadPolicy {
    pub fn new(
        max_file_size_bytes: u64,
        max_file_count: Option<u64>,
        allowed: Vec<AllowedType>,
    ) -> Self {
        Self {
            max_file_size_bytes,
            max_file_count,
            allowed,
        }
    }

    /// Whether a total-file-count quota is configured at all.
    ///
    /// When this is false the caller can skip fetching the count.
    pub fn has_quota(&self) -> bool {
        self.max_file_count.is_some()
    }

    /// The configured whitelist, as loaded at startup.
    pub fn allowed_types(&self) -> &[AllowedType] {
        &self.allowed
    }

    /// Validate a batch against quota, size, and type rules.
    ///
    /// Zero-length files are skipped: they are not stored, and they do
    /// not count toward any check. `current_count` is the number of
    /// non-deleted files already in storage; it is only consulted when
    /// a quota is configured.
    pub fn validate(
        &self,
        files: &[UploadedFile],
        current_count: Option<u64>,
    ) -> Result<(), PolicyRejection> {
        let admitted: Vec<&UploadedFile> = files.iter().filter(|f| !f.is_empty()).collect();

        if let (Some(limit), Some(current)) = (self.max_file_count, current_count) {
            if current + admitted.len() as u64 > limit {
                return Err(PolicyRejection::QuotaExceeded { limit });
            }
        }

        for file in admitted {
            if file.bytes.len() as u64 > self.max_file_size_bytes {
                return Err(PolicyRejection::FileTooLarge {
                    name: file.name.clone(),
                    limit: self.max_file_size_bytes,
                });
            }

            let allowed = self
                .allowed
                .iter()
                .any(|t| t.content_type == file.content_type && file.name.ends_with(&t.extension));

            if !allowed {
                return Err(PolicyRejection::TypeNotAllowed {
                    name: file.name.clone(),
                    content_type: file.content_type.clone(),
                });
            }
        }

        Ok(())
    }
}
