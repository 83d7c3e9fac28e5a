//! MADAM: a media asset abstraction layer.
//!
//! [`Madam`] bundles a processor registry preloaded with the built-in
//! formats (WAV, SVG, MP3) and metadata namespaces (`rdf`, `id3`) with a
//! versioned in-memory asset store. This is the main entry point for
//! applications embedding MADAM.

pub mod config;
pub mod error;
pub mod library;

pub use config::MadamConfig;
pub use error::{SdkError, SdkResult};
pub use library::{default_registry, Madam};

// Re-export key types
pub use madam_core::{MetadataProcessor, Processor, ProcessorError, ProcessorRegistry, RegistryConfig};
pub use madam_store::{AssetStore, InMemoryAssetStore, StoreError};
pub use madam_types::{mime, Asset, Essence, EssenceDigest, Metadata, MetadataValue};
