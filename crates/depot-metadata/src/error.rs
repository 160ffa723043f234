//! Error types for the metadata store

use thiserror::Error;

/// Errors that can occur against the metadata store
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),
}
