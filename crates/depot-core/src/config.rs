//! Process configuration for the Depot service
//!
//! The whole configuration is read once at startup from a JSON settings
//! file and passed explicitly into every component constructor. Nothing
//! in the service reads configuration through ambient lookup, so tests
//! can substitute any configuration they like.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which blob backend stores uploaded bytes.
///
/// Resolved once at startup; there is no per-request backend switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under a configured root directory on local disk
    Local,
    /// An S3-compatible object store (AWS S3, MinIO, RustFS)
    S3,
    /// In-memory store, for tests and local experiments only
    Memory,
}

/// MongoDB connection settings for the metadata store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection URL, e.g. "mongodb://localhost:27017"
    pub url: String,
    pub database: String,
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://localhost:27017".to_string(),
            database: "depot".to_string(),
            collection: "file_records".to_string(),
        }
    }
}

/// S3/MinIO connection settings for the object-store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Endpoint URL; empty means the AWS default resolution
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Path-style addressing, required by MinIO
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: "depot-files".to_string(),
            access_key: None,
            secret_key: None,
            force_path_style: true,
        }
    }
}

/// Upload admission limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-file byte limit; a file exactly at the limit is accepted
    pub max_file_size_bytes: u64,
    /// Maximum number of non-deleted files in storage; `None` = unlimited
    pub max_file_count: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 25 * 1024 * 1024,
            max_file_count: None,
        }
    }
}

/// Immutable top-level configuration for the Depot service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    pub backend: StorageBackend,
    pub mongo: MongoConfig,
    pub s3: S3Config,
    /// Root directory for the local-disk backend
    pub local_storage_path: PathBuf,
    pub limits: LimitsConfig,
    /// Path to the JSON whitelist of allowed (content type, extension) pairs
    pub whitelist_path: PathBuf,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            mongo: MongoConfig::default(),
            s3: S3Config::default(),
            local_storage_path: PathBuf::from("./data/files"),
            limits: LimitsConfig::default(),
            whitelist_path: PathBuf::from("./whitelist.json"),
        }
    }
}

impl DepotConfig {
    /// Load configuration from a JSON settings file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: DepotConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the serde model cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StorageBackend::S3 && self.s3.bucket.is_empty() {
            return Err(ConfigError::Invalid(
                "s3.bucket must be set when backend is \"s3\"".to_string(),
            ));
        }

        if self.backend == StorageBackend::Local
            && self.local_storage_path.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid(
                "local_storage_path must be set when backend is \"local\"".to_string(),
            ));
        }

        if self.limits.max_file_size_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_file_size_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = DepotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend, StorageBackend::Local);
        assert!(config.limits.max_file_count.is_none());
    }

    #[test]
    fn loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "backend": "s3",
                "s3": {{ "bucket": "uploads", "endpoint": "http://localhost:9000" }},
                "limits": {{ "max_file_size_bytes": 1024, "max_file_count": 100 }}
            }}"#
        )
        .unwrap();

        let config = DepotConfig::from_file(file.path()).unwrap();
        assert_eq!(config.backend, StorageBackend::S3);
        assert_eq!(config.s3.bucket, "uploads");
        assert_eq!(config.s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.limits.max_file_size_bytes, 1024);
        assert_eq!(config.limits.max_file_count, Some(100));
        // Unset sections fall back to defaults
        assert_eq!(config.mongo.database, "depot");
    }

    #[test]
    fn rejects_s3_backend_without_bucket() {
        let config = DepotConfig {
            backend: StorageBackend::S3,
            s3: S3Config {
                bucket: String::new(),
                ..S3Config::default()
            },
            ..DepotConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_size_limit() {
        let config = DepotConfig {
            limits: LimitsConfig {
                max_file_size_bytes: 0,
                max_file_count: None,
            },
            ..DepotConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = DepotConfig::from_file("/nonexistent/depot.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
