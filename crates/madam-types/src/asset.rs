use crate::essence::Essence;
use crate::metadata::{Metadata, MetadataValue};
use crate::mime::MIME_TYPE_KEY;

/// A media asset: an essence plus an open mapping of metadata attributes.
///
/// Two assets are equal iff their metadata mappings are equal. The essence
/// takes no part in equality; use [`Asset::same_essence`] when the payload
/// matters.
#[derive(Clone, Debug, Default)]
pub struct Asset {
    essence: Essence,
    metadata: Metadata,
}

impl Asset {
    /// Create an asset from an essence and its metadata.
    pub fn new(essence: impl Into<Essence>, metadata: Metadata) -> Self {
        Self {
            essence: essence.into(),
            metadata,
        }
    }

    /// An asset with an empty essence and no metadata.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style attribute insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn essence(&self) -> &Essence {
        &self.essence
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// Set an attribute, returning the previous value if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Option<MetadataValue> {
        self.metadata.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.metadata.remove(key)
    }

    /// The `mime_type` attribute, if present and textual.
    pub fn mime_type(&self) -> Option<&str> {
        self.get(MIME_TYPE_KEY).and_then(MetadataValue::as_text)
    }

    /// Returns `true` if both assets carry byte-identical essences.
    pub fn same_essence(&self, other: &Asset) -> bool {
        self.essence == other.essence
    }

    /// Split the asset into its parts.
    pub fn into_parts(self) -> (Essence, Metadata) {
        (self.essence, self.metadata)
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_essence() {
        let a = Asset::new(b"one".to_vec(), Metadata::new()).with("some_attr", 42);
        let b = Asset::new(b"two".to_vec(), Metadata::new()).with("some_attr", 42);
        assert_eq!(a, b);
        assert!(!a.same_essence(&b));
    }

    #[test]
    fn equality_compares_metadata() {
        let a = Asset::empty().with("duration", 1);
        let b = Asset::empty().with("duration", 2);
        assert_ne!(a, b);
    }

    #[test]
    fn mime_type_accessor() {
        let asset = Asset::empty().with(MIME_TYPE_KEY, "audio/wav");
        assert_eq!(asset.mime_type(), Some("audio/wav"));
        assert_eq!(Asset::empty().mime_type(), None);
    }

    #[test]
    fn metadata_is_mutable_in_place() {
        let mut asset = Asset::empty();
        assert!(asset.insert("width", 4).is_none());
        assert_eq!(asset.insert("width", 8), Some(MetadataValue::Int(4)));
        asset.metadata_mut().insert("height".into(), 3.into());
        assert_eq!(asset.get("height").and_then(MetadataValue::as_int), Some(3));
        assert_eq!(asset.remove("width"), Some(MetadataValue::Int(8)));
    }

    #[test]
    fn into_parts() {
        let asset = Asset::new(b"essence".to_vec(), Metadata::new()).with("k", "v");
        let (essence, metadata) = asset.into_parts();
        assert_eq!(essence.as_bytes(), b"essence");
        assert_eq!(metadata.len(), 1);
    }
}
