//! Container demuxing on top of symphonia.
//!
//! Both audio readers open the input with symphonia's default probe, pick
//! the default track and collect its packets without decoding them.

use std::io::Cursor;

use madam_core::{ProcessorError, ProcessorResult};
use symphonia::core::codecs::{CodecParameters, CodecType};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Packets of the default track of a container.
#[derive(Debug)]
pub(crate) struct Demuxed {
    pub params: CodecParameters,
    /// Concatenated packet payloads.
    pub essence: Vec<u8>,
    /// Sum of packet durations, in frames.
    pub frames: u64,
    pub packets: usize,
}

impl Demuxed {
    pub fn channels(&self) -> Option<u32> {
        self.params.channels.map(|c| c.count() as u32)
    }

    pub fn duration(&self) -> Option<f64> {
        let rate = self.params.sample_rate.filter(|&r| r > 0)?;
        Some(self.frames as f64 / f64::from(rate))
    }
}

fn open(data: &[u8], extension: &str) -> Result<Box<dyn FormatReader>, SymphoniaError> {
    let source = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(probed.format)
}

/// Demux the default track of `data`.
///
/// Fails unless the track's codec is one of `accepted`. At most `limit`
/// packets are read; the input's end terminates the walk otherwise.
pub(crate) fn demux(
    data: &[u8],
    extension: &str,
    accepted: &[CodecType],
    limit: Option<usize>,
) -> ProcessorResult<Demuxed> {
    let mut format = open(data, extension)
        .map_err(|e| ProcessorError::unsupported(format!("unrecognized container: {e}")))?;

    let track = format
        .default_track()
        .ok_or_else(|| ProcessorError::unsupported("no audio track found"))?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    if !accepted.contains(&params.codec) {
        return Err(ProcessorError::unsupported(format!(
            "unsupported codec {:?}",
            params.codec
        )));
    }

    let mut out = Demuxed {
        params,
        essence: Vec::new(),
        frames: 0,
        packets: 0,
    };
    while limit.map_or(true, |l| out.packets < l) {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(ProcessorError::unsupported(format!("malformed stream: {e}")));
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        out.essence.extend_from_slice(packet.buf());
        out.frames += packet.dur;
        out.packets += 1;
    }

    if out.packets == 0 {
        return Err(ProcessorError::unsupported("stream holds no audio packets"));
    }
    debug!(
        codec = ?out.params.codec,
        packets = out.packets,
        frames = out.frames,
        bytes = out.essence.len(),
        "demuxed audio track"
    );
    Ok(out)
}
