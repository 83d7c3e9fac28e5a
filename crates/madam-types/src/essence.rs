use std::fmt;
use std::io::Cursor;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Domain tag mixed into every essence digest.
const DIGEST_DOMAIN: &str = "madam-essence-v1";

/// The opaque payload of an asset.
///
/// An `Essence` is immutable once created. Cloning is cheap (the buffer is
/// reference counted), so assets can be handed out by value without copying
/// audio or image data.
///
/// Consumers never share a read position: [`Essence::reader`] always returns
/// a fresh cursor positioned at the start.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Essence(Bytes);

impl Essence {
    /// An empty essence.
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Copy the given bytes into a new essence.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(data))
    }

    /// A new cursor over the essence, positioned at byte 0.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.0.as_ref())
    }

    /// The essence bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Copy the essence into an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the essence holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Domain-separated BLAKE3 digest of the essence bytes.
    pub fn digest(&self) -> EssenceDigest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DIGEST_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(&self.0);
        EssenceDigest(*hasher.finalize().as_bytes())
    }
}

impl From<Vec<u8>> for Essence {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<Bytes> for Essence {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl From<&'static [u8]> for Essence {
    fn from(data: &'static [u8]) -> Self {
        Self(Bytes::from_static(data))
    }
}

impl AsRef<[u8]> for Essence {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Essence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Essence({} bytes, {})", self.len(), self.digest().short_hex())
    }
}

/// Content digest of an [`Essence`].
///
/// Two essences with identical bytes always produce the same digest. This is
/// the essence-aware counterpart to [`crate::Asset`] equality, which only
/// compares metadata.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EssenceDigest([u8; 32]);

impl EssenceDigest {
    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for EssenceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EssenceDigest({})", self.short_hex())
    }
}

impl fmt::Display for EssenceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
