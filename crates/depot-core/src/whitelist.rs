//! Upload whitelist model
//!
//! The whitelist is a JSON array of (content type, extension) pairs read
//! once at startup. The service treats it as opaque, immutable data; it
//! is consulted by the admission policy and returned verbatim to clients
//! asking which types are accepted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// A single allowed upload type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowedType {
    /// MIME type, e.g. "image/png"
    #[schema(example = "image/png")]
    pub content_type: String,
    /// Filename extension including the dot, e.g. ".png"
    #[schema(example = ".png")]
    pub extension: String,
}

/// Errors raised while loading the whitelist file
#[derive(Error, Debug)]
pub enum WhitelistError {
    #[error("failed to read whitelist file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse whitelist file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Load the whitelist from a JSON file.
///
/// An empty list is allowed and means no upload type is accepted.
pub fn load_whitelist(path: impl AsRef<Path>) -> Result<Vec<AllowedType>, WhitelistError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| WhitelistError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| WhitelistError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
