use madam_core::{Processor, ProcessorError, ProcessorResult};
use madam_types::mime::{MIME_TYPE_KEY, WAV};
use madam_types::{Asset, Metadata};
use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_U8,
};
use tracing::debug;

use crate::demux::demux;

/// Integer PCM layouts a WAVE `fmt ` chunk can declare.
const PCM_CODECS: &[CodecType] = &[
    CODEC_TYPE_PCM_U8,
    CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S24LE,
    CODEC_TYPE_PCM_S32LE,
];

/// Reader for uncompressed WAV files.
///
/// The essence is the raw PCM frame data. `channels`, `framerate`,
/// `sample_width` (bytes) and `duration` (seconds) describe it.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavProcessor;

impl WavProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Processor for WavProcessor {
    fn name(&self) -> &str {
        "wav"
    }

    fn mime_types(&self) -> &[&'static str] {
        &[WAV]
    }

    fn probe(&self, data: &[u8]) -> bool {
        demux(data, "wav", PCM_CODECS, Some(1)).is_ok()
    }

    fn extract(&self, data: &[u8]) -> ProcessorResult<Asset> {
        let stream = demux(data, "wav", PCM_CODECS, None)?;
        let params = &stream.params;
        let channels = stream
            .channels()
            .ok_or_else(|| ProcessorError::unsupported("WAV stream without channel layout"))?;
        let framerate = params
            .sample_rate
            .ok_or_else(|| ProcessorError::unsupported("WAV stream without sample rate"))?;

        let mut metadata = Metadata::new();
        metadata.insert(MIME_TYPE_KEY.into(), WAV.into());
        metadata.insert("channels".into(), channels.into());
        metadata.insert("framerate".into(), framerate.into());
        if let Some(bits) = params.bits_per_sample {
            metadata.insert("sample_width".into(), bits.div_ceil(8).into());
        }
        if let Some(duration) = stream.duration() {
            metadata.insert("duration".into(), duration.into());
        }
        debug!(frames = stream.frames, channels, framerate, "extracted WAV");

        Ok(Asset::new(stream.essence, metadata))
    }
}
