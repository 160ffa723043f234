//! File identifier generation
//!
//! Blobs and metadata records share a single opaque identifier. The id
//! is the only join key between the two stores, so it must never repeat
//! across the life of a deployment.

use uuid::Uuid;

/// Generate a new opaque file identifier.
///
/// A canonical hyphenated UUID v4: 128 random bits, so collisions are
/// not a practical concern. The identifier names both the blob and its
/// metadata record, with no extension or prefix.
pub fn new_file_id() -> String {
    Uuid::new_v4().to_string()
}
