use serde::{Deserialize, Serialize};

/// Configuration for the processor registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Largest input, in bytes, the registry will buffer and dispatch.
    pub max_input_bytes: u64,
    /// When `true`, every metadata processor scoped to the extracted mime
    /// type reads its namespaces after extraction, and non-empty payloads
    /// are attached to the asset under their namespace key.
    pub attach_metadata: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 256 * 1024 * 1024,
            attach_metadata: true,
        }
    }
}

impl RegistryConfig {
    /// Extraction only: no namespace reads after extraction.
    pub fn extract_only() -> Self {
        Self {
            attach_metadata: false,
            ..Default::default()
        }
    }
}
