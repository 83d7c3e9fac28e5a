//! Foundation types for MADAM, the media asset abstraction layer.
//!
//! Every other MADAM crate depends on `madam-types`. The types here carry no
//! format knowledge: they describe what a processed asset looks like, not how
//! it was produced.
//!
//! # Key Types
//!
//! - [`Asset`] -- essence plus a mapping of metadata attributes
//! - [`Essence`] -- immutable, cheaply clonable payload buffer
//! - [`EssenceDigest`] -- domain-separated BLAKE3 digest of an essence
//! - [`MetadataValue`] / [`Metadata`] -- numeric, text, or nested namespaced values

pub mod asset;
pub mod essence;
pub mod metadata;
pub mod mime;

pub use asset::Asset;
pub use essence::{Essence, EssenceDigest};
pub use metadata::{Metadata, MetadataValue};
