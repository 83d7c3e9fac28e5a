use std::fmt;

use madam_types::{Asset, Metadata, MetadataValue};

use crate::error::{ProcessorError, ProcessorResult};

// ---------------------------------------------------------------------------
// Capability / Registration
// ---------------------------------------------------------------------------

/// What a registered processor can do.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Sniffs and extracts assets.
    Reader,
    /// Reads, strips, and combines one metadata namespace.
    Metadata(String),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader => write!(f, "reader"),
            Self::Metadata(ns) => write!(f, "metadata:{ns}"),
        }
    }
}

/// A registry entry as reported by
/// [`ProcessorRegistry::registrations`](crate::ProcessorRegistry::registrations).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    /// Name of the registered processor.
    pub name: String,
    pub capability: Capability,
    /// Higher priorities are consulted first.
    pub priority: i32,
}

// ---------------------------------------------------------------------------
// Processor trait
// ---------------------------------------------------------------------------

/// Sniffs a container format and extracts essence plus baseline metadata.
///
/// The registry calls [`Processor::probe`] on every candidate in order and
/// [`Processor::extract`] only on the first one that accepts. Probing must be
/// cheap; extraction is authoritative and may still reject input that passed
/// the probe.
///
/// The trait is object-safe and `Send + Sync` so processors can be stored in
/// a `Vec<Box<dyn Processor>>`.
pub trait Processor: Send + Sync {
    /// Human-readable name of this processor (e.g. "svg", "wav").
    fn name(&self) -> &str;

    /// Mime types of the assets this processor produces.
    fn mime_types(&self) -> &[&'static str];

    /// Non-destructive format test. Never fails: anything that cannot be
    /// parsed is simply not accepted.
    fn probe(&self, data: &[u8]) -> bool;

    /// Extract an asset. The returned essence is an owned copy, independent
    /// of `data`.
    fn extract(&self, data: &[u8]) -> ProcessorResult<Asset>;
}

// ---------------------------------------------------------------------------
// MetadataProcessor trait
// ---------------------------------------------------------------------------

/// Reads, strips, and re-injects the metadata namespaces of one container
/// format.
///
/// All three operations take the container by reference and never modify it.
/// Each namespace payload is stored under its namespace key, so processors
/// never see each other's metadata.
pub trait MetadataProcessor: Send + Sync {
    /// Human-readable name of this processor.
    fn name(&self) -> &str;

    /// Namespaces this processor owns (e.g. `["rdf"]`).
    fn namespaces(&self) -> &[&'static str];

    /// Mime types of the containers this processor understands.
    fn mime_types(&self) -> &[&'static str];

    /// Read every owned namespace. An absent namespace yields an empty
    /// mapping under its key, not an error.
    fn read(&self, data: &[u8]) -> ProcessorResult<Metadata>;

    /// Return a copy of `data` with all owned namespaces removed. Stripping
    /// a container without such metadata returns an equivalent copy.
    fn strip(&self, data: &[u8]) -> ProcessorResult<Vec<u8>>;

    /// Return a copy of `data` with the namespace payloads from `metadata`
    /// injected, reusing an existing metadata anchor when one is present.
    fn combine(&self, data: &[u8], metadata: &Metadata) -> ProcessorResult<Vec<u8>>;
}

/// Look up the payload for `namespace` in a mapping passed to `combine`.
///
/// Empty mappings and missing namespaces are validation errors; a payload
/// that is not itself a mapping is an unsupported format.
pub fn require_namespace<'a>(metadata: &'a Metadata, namespace: &str) -> ProcessorResult<&'a Metadata> {
    if metadata.is_empty() {
        return Err(ProcessorError::validation("no metadata provided"));
    }
    match metadata.get(namespace) {
        None => Err(ProcessorError::validation(format!(
            "no '{namespace}' metadata found"
        ))),
        Some(MetadataValue::Map(payload)) => Ok(payload),
        Some(_) => Err(ProcessorError::unsupported(format!(
            "'{namespace}' metadata must be a mapping"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_tags() {
        assert_eq!(Capability::Reader.to_string(), "reader");
        assert_eq!(Capability::Metadata("rdf".into()).to_string(), "metadata:rdf");
    }

    #[test]
    fn require_namespace_rejects_empty() {
        let err = require_namespace(&Metadata::new(), "rdf").unwrap_err();
        assert!(matches!(err, ProcessorError::Validation(_)));
    }

    #[test]
    fn require_namespace_rejects_missing() {
        let mut meta = Metadata::new();
        meta.insert("id3".into(), MetadataValue::empty_map());
        let err = require_namespace(&meta, "rdf").unwrap_err();
        assert!(matches!(err, ProcessorError::Validation(_)));
    }

    #[test]
    fn require_namespace_rejects_non_map() {
        let mut meta = Metadata::new();
        meta.insert("rdf".into(), "<rdf:RDF/>".into());
        let err = require_namespace(&meta, "rdf").unwrap_err();
        assert!(matches!(err, ProcessorError::UnsupportedFormat { .. }));
    }

    #[test]
    fn require_namespace_returns_payload() {
        let mut payload = Metadata::new();
        payload.insert("xml".into(), "<x/>".into());
        let mut meta = Metadata::new();
        meta.insert("rdf".into(), payload.clone().into());
        assert_eq!(require_namespace(&meta, "rdf").unwrap(), &payload);
    }
}
