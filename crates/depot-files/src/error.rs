//! Error types for the file service

use axum::http::StatusCode;
use depot_core::problemdetails::{self, Problem};
use depot_metadata::MetadataError;
use depot_storage::BlobError;
use thiserror::Error;

use crate::policy::PolicyRejection;

/// Errors that can occur in the file service
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Rejected(#[from] PolicyRejection),

    #[error("blob storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("metadata store error: {0}")]
    Metadata(#[from] MetadataError),
}

impl FileError {
    /// Whether the error means "no such file" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileError::Blob(e) if e.is_not_found())
    }
}

impl From<FileError> for Problem {
    fn from(error: FileError) -> Self {
        match error {
            FileError::Rejected(PolicyRejection::QuotaExceeded { limit }) => {
                problemdetails::new(StatusCode::NOT_ACCEPTABLE)
                    .with_title("Upload Quota Exceeded")
                    .with_detail(format!(
                        "Upload would exceed the maximum number of stored files: {}",
                        limit
                    ))
                    .with_value("limit", limit)
            }

            FileError::Rejected(PolicyRejection::FileTooLarge { name, limit }) => {
                problemdetails::new(StatusCode::PAYLOAD_TOO_LARGE)
                    .with_title("Payload Too Large")
                    .with_detail(format!(
                        "File '{}' exceeds the {} byte upload limit",
                        name, limit
                    ))
                    .with_value("limit", limit)
            }

            FileError::Rejected(PolicyRejection::TypeNotAllowed { name, content_type }) => {
                problemdetails::new(StatusCode::UNSUPPORTED_MEDIA_TYPE)
                    .with_title("Unsupported Media Type")
                    .with_detail(format!(
                        "File '{}' with content-type '{}' is not allowed",
                        name, content_type
                    ))
                    .with_value("contentType", content_type)
            }

            FileError::Blob(BlobError::NotFound(id)) => {
                problemdetails::new(StatusCode::NOT_FOUND)
                    .with_title("File Not Found")
                    .with_detail(format!("No file stored under id '{}'", id))
            }

            FileError::Blob(BlobError::ConnectionFailed(msg))
            | FileError::Metadata(MetadataError::ConnectionFailed(msg)) => {
                problemdetails::new(StatusCode::SERVICE_UNAVAILABLE)
                    .with_title("Storage Unavailable")
                    .with_detail(msg)
            }

            FileError::Blob(e) => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title("Storage Error")
                .with_detail(e.to_string()),

            FileError::Metadata(e) => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title("Metadata Error")
                .with_detail(e.to_string()),
        }
    }
}
