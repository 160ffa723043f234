//! depot-core: shared types for the Depot file service
//!
//! Holds the pieces every other crate leans on: the immutable process
//! configuration, the upload whitelist model, the file identifier
//! generator, and RFC 7807 problem-details responses.

pub mod config;
pub mod id;
pub mod problemdetails;
pub mod whitelist;

pub use config::{ConfigError, DepotConfig, LimitsConfig, MongoConfig, S3Config, StorageBackend};
pub use id::new_file_id;
pub use whitelist::{load_whitelist, AllowedType, WhitelistError};
