//! depot-files: the file service core
//!
//! Composes the blob backend and the metadata store behind a single
//! façade. Uploads pass the admission policy before anything is
//! written; the orchestrator then writes bytes first and records
//! metadata only after every write in the batch succeeded, so metadata
//! never points at a missing blob.

pub mod error;
pub mod handlers;
pub mod policy;
pub mod service;

pub use error::FileError;
pub use policy::{PolicyRejection, UploadPolicy, UploadedFile};
pub use service::FileService;
