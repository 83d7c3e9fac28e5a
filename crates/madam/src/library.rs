use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use madam_audio::{Id3MetadataProcessor, Mp3Processor, WavProcessor};
use madam_core::{ProcessorRegistry, RegistryConfig};
use madam_store::{AssetStore, InMemoryAssetStore};
use madam_types::{Asset, Metadata};
use madam_vector::{SvgMetadataProcessor, SvgProcessor};
use tracing::{debug, warn};

use crate::config::MadamConfig;
use crate::error::{SdkError, SdkResult};

/// A registry with every built-in processor.
///
/// Readers go from strict to permissive: WAV needs a PCM RIFF/WAVE stream,
/// SVG needs a well-formed document, and MP3 needs one complete MPEG frame.
pub fn default_registry(config: RegistryConfig) -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new(config);
    registry.register_reader(Box::new(WavProcessor::new()));
    registry.register_reader(Box::new(SvgProcessor::new()));
    registry.register_reader(Box::new(Mp3Processor::new()));
    registry.register_metadata(Box::new(SvgMetadataProcessor::new()));
    registry.register_metadata(Box::new(Id3MetadataProcessor::new()));
    registry
}

/// High-level MADAM API.
pub struct Madam {
    registry: Arc<ProcessorRegistry>,
    store: InMemoryAssetStore,
    extract_timeout: Option<Duration>,
}

impl Default for Madam {
    fn default() -> Self {
        Self::new()
    }
}

impl Madam {
    /// Built-in processors, default configuration.
    pub fn new() -> Self {
        Self::with_config(MadamConfig::default())
    }

    pub fn with_config(config: MadamConfig) -> Self {
        let timeout = config.extract_timeout();
        Self::from_registry(default_registry(config.registry), timeout)
    }

    /// Load the configuration at `path` and build on the built-in processors.
    pub fn open(path: impl AsRef<Path>) -> SdkResult<Self> {
        Ok(Self::with_config(MadamConfig::load(path)?))
    }

    /// Wrap a caller-assembled registry.
    pub fn from_registry(registry: ProcessorRegistry, extract_timeout: Option<Duration>) -> Self {
        Self {
            registry: Arc::new(registry),
            store: InMemoryAssetStore::new(),
            extract_timeout,
        }
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    pub fn store(&self) -> &InMemoryAssetStore {
        &self.store
    }

    // ---- Extraction ----

    pub fn read(&self, data: &[u8]) -> SdkResult<Asset> {
        Ok(self.registry.read(data)?)
    }

    pub fn read_from(&self, reader: impl Read) -> SdkResult<Asset> {
        Ok(self.registry.read_from(reader)?)
    }

    pub fn read_path(&self, path: impl AsRef<Path>) -> SdkResult<Asset> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let asset = self.registry.read_from(file)?;
        debug!(path = %path.display(), mime_type = asset.mime_type(), "read asset from file");
        Ok(asset)
    }

    /// Extract on the blocking pool, giving up after the configured timeout.
    ///
    /// The extraction itself is not cancelled; its result is dropped.
    pub async fn read_with_timeout(&self, data: Vec<u8>) -> SdkResult<Asset> {
        let registry = Arc::clone(&self.registry);
        let task = tokio::task::spawn_blocking(move || registry.read(&data));

        let joined = match self.extract_timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                warn!(timeout_ms = limit.as_millis() as u64, "extraction timed out");
                SdkError::Timeout(limit)
            })?,
            None => task.await,
        };
        Ok(joined.map_err(|e| SdkError::Internal(e.to_string()))??)
    }

    // ---- Metadata ----

    /// Read one namespace, returned as `{namespace: payload}`.
    pub fn read_metadata(&self, data: &[u8], namespace: &str) -> SdkResult<Metadata> {
        Ok(self.registry.read_metadata(data, namespace)?)
    }

    pub fn strip(&self, data: &[u8], namespace: &str) -> SdkResult<Vec<u8>> {
        Ok(self.registry.strip_metadata(data, namespace)?)
    }

    /// Remove every namespace scoped to `mime_type`.
    pub fn strip_all(&self, data: &[u8], mime_type: &str) -> SdkResult<Vec<u8>> {
        Ok(self.registry.strip_all(data, mime_type)?)
    }

    pub fn combine(&self, data: &[u8], metadata: &Metadata) -> SdkResult<Vec<u8>> {
        Ok(self.registry.combine_metadata(data, metadata)?)
    }

    // ---- Store ----

    /// Extract `data` and store the asset as the newest version under `key`.
    pub fn import(&self, key: &str, data: &[u8]) -> SdkResult<Asset> {
        let asset = self.read(data)?;
        self.store.put(key, asset.clone())?;
        Ok(asset)
    }

    pub fn import_path(&self, key: &str, path: impl AsRef<Path>) -> SdkResult<Asset> {
        let asset = self.read_path(path)?;
        self.store.put(key, asset.clone())?;
        Ok(asset)
    }
}
