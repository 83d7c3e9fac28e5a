//! Processor registry and metadata round-trip protocol for MADAM.
//!
//! Given bytes of unknown type, the [`ProcessorRegistry`] probes every
//! registered [`Processor`] in order and lets the first one that accepts the
//! input extract an [`Asset`](madam_types::Asset). File extensions are never
//! consulted.
//!
//! Namespaced metadata (RDF, ID3, ...) is handled by [`MetadataProcessor`]s,
//! which the registry routes by namespace name rather than by probing.
//!
//! # Round-trip law
//!
//! For every metadata processor and every container `S` whose only mutable
//! region is the processor's namespace:
//!
//! ```text
//! combine(strip(S), read(S)) == S        (outside the namespace region)
//! strip(strip(S))            == strip(S)
//! read(combine(strip(S), M)) == M
//! ```
//!
//! No operation mutates its input. `strip` and `combine` always return a new
//! buffer, so a failed operation cannot corrupt the caller's data.

pub mod config;
pub mod error;
pub mod processor;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{Location, ProcessorError, ProcessorResult};
pub use processor::{require_namespace, Capability, MetadataProcessor, Processor, Registration};
pub use registry::ProcessorRegistry;
