use madam_types::{Asset, Metadata, MetadataValue};

use crate::error::StoreResult;

/// Keyed, versioned index over assets.
///
/// All implementations must satisfy these invariants:
/// - `put` appends; existing versions are never replaced.
/// - `versions_of` returns versions in write order, oldest first.
/// - `get` returns the last version written.
/// - `delete` removes every version of the key.
pub trait AssetStore: Send + Sync {
    /// Append a new version of `key`.
    fn put(&self, key: &str, asset: Asset) -> StoreResult<()>;

    /// The current version of `key`.
    ///
    /// Returns `Err(StoreError::KeyNotFound)` if the key has no versions.
    fn get(&self, key: &str) -> StoreResult<Asset>;

    /// Every version of `key`, oldest first.
    fn versions_of(&self, key: &str) -> StoreResult<Vec<Asset>>;

    /// Remove `key` and its whole history.
    ///
    /// Returns `Err(StoreError::KeyNotFound)` if the key does not exist.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Check whether `key` has at least one version.
    fn contains(&self, key: &str) -> StoreResult<bool>;

    /// All keys, sorted.
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Current versions whose metadata satisfies `predicate`, ordered by key.
    fn query(&self, predicate: &dyn Fn(&Metadata) -> bool) -> StoreResult<Vec<Asset>>;

    /// Current versions whose attribute `key` equals `value`. Numbers match
    /// by value, so `1` finds a duration stored as `1.0`.
    fn find_by(&self, key: &str, value: &MetadataValue) -> StoreResult<Vec<Asset>> {
        self.query(&|metadata: &Metadata| metadata.get(key) == Some(value))
    }
}
