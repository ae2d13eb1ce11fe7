//! Secret bundles and their server-assigned version metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata the store assigns to one revision of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleVersion {
    /// Monotonic version number, starting at 1 for the first write
    pub version: u64,
    /// When this revision was written
    pub created_time: DateTime<Utc>,
}

/// A key/value mapping stored at one path, plus its revision metadata
///
/// Keys are held in a `BTreeMap` so iteration and serialized output are
/// deterministic. Values are secret material: `Debug` prints key names
/// only, serialization is explicit caller output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretBundle {
    /// The key/value pairs of this revision
    pub data: BTreeMap<String, String>,
    /// Revision metadata assigned by the store
    pub metadata: BundleVersion,
}

impl SecretBundle {
    /// Assemble a bundle from its mapping and revision metadata
    #[must_use]
    pub fn new(data: BTreeMap<String, String>, metadata: BundleVersion) -> Self {
        Self { data, metadata }
    }

    /// Value for `key`, if the bundle holds it
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Whether the bundle holds `key`
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Key names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Number of keys in the bundle
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the bundle holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle")
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Union of an existing mapping and an incoming payload.
///
/// Every existing key survives unless the payload also names it; on a
/// collision the payload's value wins. This is the merge applied by
/// append-style writes.
#[must_use]
pub fn merge_payload(
    existing: &BTreeMap<String, String>,
    incoming: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = existing.clone();
    for (key, value) in incoming {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// One entry in a bundle's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretVersion {
    /// Version number of this revision
    pub version: u64,
    /// When this revision was written
    pub created_time: DateTime<Utc>,
    /// When this revision was soft-deleted, if it was
    pub deletion_time: Option<DateTime<Utc>>,
    /// Whether the revision's data has been permanently destroyed
    pub destroyed: bool,
}

/// Version history for one path, as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    /// The version a plain read resolves to
    pub current_version: u64,
    /// When the path was first written
    pub created_time: DateTime<Utc>,
    /// When the path was last written
    pub updated_time: DateTime<Utc>,
    /// Per-revision history, sorted by ascending version number
    pub versions: Vec<SecretVersion>,
}
