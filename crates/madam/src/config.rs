use std::path::Path;
use std::time::Duration;

use madam_core::RegistryConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SdkError, SdkResult};

/// Top-level configuration, usually loaded from a TOML file.
///
/// ```toml
/// extract_timeout_ms = 5000
///
/// [registry]
/// max_input_bytes = 1048576
/// attach_metadata = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MadamConfig {
    pub registry: RegistryConfig,
    /// Upper bound for [`Madam::read_with_timeout`](crate::Madam::read_with_timeout).
    /// `0` disables the bound.
    pub extract_timeout_ms: Option<u64>,
}

impl Default for MadamConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            extract_timeout_ms: Some(30_000),
        }
    }
}

impl MadamConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        info!(
            path = %path.display(),
            max_input_bytes = config.registry.max_input_bytes,
            timeout_ms = ?config.extract_timeout_ms,
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn extract_timeout(&self) -> Option<Duration> {
        self.extract_timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}
