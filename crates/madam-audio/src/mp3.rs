use madam_core::{Processor, ProcessorError, ProcessorResult};
use madam_types::mime::{MIME_TYPE_KEY, MPEG_AUDIO};
use madam_types::{Asset, Metadata};
use symphonia::core::codecs::{CodecType, CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3};
use tracing::debug;

use crate::demux::demux;

const MPEG_CODECS: &[CodecType] = &[CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3];

/// Reader for MPEG audio (MP1/MP2/MP3) streams.
///
/// The essence is the sequence of MPEG frames, so leading ID3v2 and
/// trailing ID3v1 tags never reach it. Duration sums the frames' sample
/// counts.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3Processor;

impl Mp3Processor {
    pub fn new() -> Self {
        Self
    }
}

impl Processor for Mp3Processor {
    fn name(&self) -> &str {
        "mp3"
    }

    fn mime_types(&self) -> &[&'static str] {
        &[MPEG_AUDIO]
    }

    fn probe(&self, data: &[u8]) -> bool {
        demux(data, "mp3", MPEG_CODECS, Some(1)).is_ok()
    }

    fn extract(&self, data: &[u8]) -> ProcessorResult<Asset> {
        let stream = demux(data, "mp3", MPEG_CODECS, None)?;
        let framerate = stream
            .params
            .sample_rate
            .ok_or_else(|| ProcessorError::unsupported("MPEG stream without sample rate"))?;

        let mut metadata = Metadata::new();
        metadata.insert(MIME_TYPE_KEY.into(), MPEG_AUDIO.into());
        if let Some(channels) = stream.channels() {
            metadata.insert("channels".into(), channels.into());
        }
        metadata.insert("framerate".into(), framerate.into());
        if let Some(duration) = stream.duration() {
            metadata.insert("duration".into(), duration.into());
        }
        debug!(
            frames = stream.packets,
            samples = stream.frames,
            framerate,
            "extracted MPEG audio"
        );

        Ok(Asset::new(stream.essence, metadata))
    }
}
