//! Versioned asset index for MADAM.
//!
//! Every key maps to the full, append-only history of the assets written
//! under it. Lookups see the latest version; [`AssetStore::versions_of`]
//! sees all of them, oldest first.
//!
//! # Storage Backends
//!
//! All backends implement the [`AssetStore`] trait:
//!
//! - [`InMemoryAssetStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Versions are never mutated in place; every write appends.
//! 2. Version order equals write order; the last element is current.
//! 3. Deleting a key drops its entire history.
//! 4. Queries scan current versions only. There is no secondary index.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryAssetStore;
pub use traits::AssetStore;
