use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use madam_types::{Asset, Metadata};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::AssetStore;

/// In-memory, `BTreeMap`-based asset store.
///
/// Intended for tests and embedding. Histories live behind a `RwLock`;
/// concurrent readers are safe and writers are serialized. Data is lost when
/// the store is dropped.
pub struct InMemoryAssetStore {
    histories: RwLock<BTreeMap<String, Vec<Asset>>>,
}

impl InMemoryAssetStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            histories: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.len())
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_lock()?.is_empty())
    }

    /// Total number of versions across all keys.
    pub fn version_count(&self) -> StoreResult<usize> {
        Ok(self.read_lock()?.values().map(Vec::len).sum())
    }

    /// Remove every key.
    pub fn clear(&self) -> StoreResult<()> {
        self.write_lock()?.clear();
        Ok(())
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Vec<Asset>>>> {
        self.histories
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Vec<Asset>>>> {
        self.histories
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for InMemoryAssetStore {
    fn put(&self, key: &str, asset: Asset) -> StoreResult<()> {
        let mut map = self.write_lock()?;
        let history = map.entry(key.to_string()).or_default();
        history.push(asset);
        debug!(key, versions = history.len(), "stored asset version");
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Asset> {
        let map = self.read_lock()?;
        map.get(key)
            .and_then(|history| history.last())
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    fn versions_of(&self, key: &str) -> StoreResult<Vec<Asset>> {
        let map = self.read_lock()?;
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut map = self.write_lock()?;
        match map.remove(key) {
            Some(history) => {
                debug!(key, versions = history.len(), "deleted asset history");
                Ok(())
            }
            None => Err(StoreError::KeyNotFound(key.to_string())),
        }
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.read_lock()?.contains_key(key))
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.read_lock()?.keys().cloned().collect())
    }

    fn query(&self, predicate: &dyn Fn(&Metadata) -> bool) -> StoreResult<Vec<Asset>> {
        let map = self.read_lock()?;
        Ok(map
            .values()
            .filter_map(|history| history.last())
            .filter(|asset| predicate(asset.metadata()))
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryAssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or(0);
        f.debug_struct("InMemoryAssetStore")
            .field("key_count", &count)
            .finish()
    }
}
