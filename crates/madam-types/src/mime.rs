//! Mime types reported by the bundled processors, and the well-known
//! attribute names they populate.

pub const SVG: &str = "image/svg+xml";
pub const WAV: &str = "audio/wav";
pub const MPEG_AUDIO: &str = "audio/mpeg";

/// Attribute holding the asset's mime type.
pub const MIME_TYPE_KEY: &str = "mime_type";
