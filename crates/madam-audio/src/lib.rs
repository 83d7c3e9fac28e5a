//! Audio support for MADAM.
//!
//! - [`WavProcessor`] extracts raw PCM frames from RIFF/WAVE containers.
//! - [`Mp3Processor`] extracts MPEG audio frames, dropping ID3 tags.
//! - [`Id3MetadataProcessor`] owns the `id3` namespace of MP3 files.
//!
//! Containers are demuxed with symphonia. Samples are never decoded.

mod demux;
pub mod id3_tags;
pub mod mp3;
mod tag_bounds;
pub mod wav;

pub use id3_tags::Id3MetadataProcessor;
pub use mp3::Mp3Processor;
pub use wav::WavProcessor;
