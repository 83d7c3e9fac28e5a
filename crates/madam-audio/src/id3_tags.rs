//! ID3 metadata for MPEG audio.
//!
//! The `id3` namespace holds one entry per ID3v2 frame id:
//!
//! - text (`T...`) and URL (`W...`) frames map to their value;
//! - `TXXX` and `WXXX` map descriptions to values;
//! - `COMM` and `USLT` map `"<lang>:<description>"` to the text;
//! - `APIC` maps descriptions to `{mime_type, picture_type, data}` with
//!   hex-encoded image data;
//! - frames the `id3` crate does not interpret map to their hex-encoded body.
//!
//! Two reserved keys describe the container: `version` (3 or 4) is the
//! ID3v2 revision written back by [`combine`](MetadataProcessor::combine),
//! and `v1` is the hex-encoded trailing ID3v1 tag. Other structured frames
//! (`POPM`, `PRIV`, `CHAP`, ...) are not carried.

use std::io::Cursor;

use id3::frame::{
    Comment, Content, ExtendedLink, ExtendedText, Lyrics, Picture, PictureType, Unknown,
};
use id3::{Frame, Tag, TagLike, Version};
use madam_core::{require_namespace, MetadataProcessor, ProcessorError, ProcessorResult};
use madam_types::mime::MPEG_AUDIO;
use madam_types::{Metadata, MetadataValue};
use tracing::debug;

use crate::tag_bounds::{id3v1, id3v1_start, id3v2_len, skip_id3v2};

pub const ID3_NAMESPACE: &str = "id3";

const VERSION_KEY: &str = "version";
const V1_KEY: &str = "v1";

/// `u8` codes of the picture types, in numeric order.
const PICTURE_TYPES: [PictureType; 21] = [
    PictureType::Other,
    PictureType::Icon,
    PictureType::OtherIcon,
    PictureType::CoverFront,
    PictureType::CoverBack,
    PictureType::Leaflet,
    PictureType::Media,
    PictureType::LeadArtist,
    PictureType::Artist,
    PictureType::Conductor,
    PictureType::Band,
    PictureType::Composer,
    PictureType::Lyricist,
    PictureType::RecordingLocation,
    PictureType::DuringRecording,
    PictureType::DuringPerformance,
    PictureType::ScreenCapture,
    PictureType::BrightFish,
    PictureType::Illustration,
    PictureType::BandLogo,
    PictureType::PublisherLogo,
];

/// Metadata processor for ID3 tags in MPEG audio files.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3MetadataProcessor;

impl Id3MetadataProcessor {
    pub fn new() -> Self {
        Self
    }
}

fn truncated(at: usize) -> ProcessorError {
    ProcessorError::unsupported(format!("truncated ID3v2 tag at byte {at}"))
}

fn tag_error(e: id3::Error) -> ProcessorError {
    ProcessorError::unsupported(format!("invalid ID3 tag: {e}"))
}

fn invalid(id: &str, expected: &str) -> ProcessorError {
    ProcessorError::unsupported(format!("value of ID3 frame '{id}' must be {expected}"))
}

/// Decode the first ID3v2 tag, if the data starts with one.
fn leading_tag(data: &[u8]) -> ProcessorResult<Option<Tag>> {
    let Some(len) = id3v2_len(data) else {
        return Ok(None);
    };
    let bytes = data.get(..len).ok_or_else(|| truncated(0))?;
    Tag::read_from2(Cursor::new(bytes)).map(Some).map_err(tag_error)
}

fn is_frame_id(id: &str) -> bool {
    id.len() == 4 && id.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn version_number(version: Version) -> i64 {
    match version {
        Version::Id3v24 => 4,
        // v2.2 frames are upgraded to v2.3 ids on read.
        Version::Id3v22 | Version::Id3v23 => 3,
    }
}

fn parse_version(value: &MetadataValue) -> ProcessorResult<Version> {
    match value.as_int() {
        Some(3) => Ok(Version::Id3v23),
        Some(4) => Ok(Version::Id3v24),
        _ => Err(ProcessorError::unsupported(format!(
            "ID3 '{VERSION_KEY}' must be 3 or 4, got {value}"
        ))),
    }
}

fn parse_v1(value: &MetadataValue) -> ProcessorResult<Vec<u8>> {
    let bytes = value
        .as_text()
        .and_then(|s| hex::decode(s).ok())
        .filter(|b| b.len() == 128 && b.starts_with(b"TAG"))
        .ok_or_else(|| {
            ProcessorError::unsupported(format!("ID3 '{V1_KEY}' must be a hex-encoded ID3v1 tag"))
        })?;
    Ok(bytes)
}

fn picture_code(picture_type: PictureType) -> u8 {
    match picture_type {
        PictureType::Undefined(code) => code,
        known => PICTURE_TYPES
            .iter()
            .position(|t| *t == known)
            .map_or(0, |i| i as u8),
    }
}

fn picture_type(code: u8) -> PictureType {
    PICTURE_TYPES
        .get(usize::from(code))
        .copied()
        .unwrap_or(PictureType::Undefined(code))
}

/// The nested mapping stored under `id`, created on first use.
fn entries<'a>(frames: &'a mut Metadata, id: &str) -> Option<&'a mut Metadata> {
    match frames
        .entry(id.to_string())
        .or_insert_with(MetadataValue::empty_map)
    {
        MetadataValue::Map(map) => Some(map),
        _ => None,
    }
}

fn read_frame(frames: &mut Metadata, frame: &Frame) {
    let id = frame.id();
    let (key, value): (String, MetadataValue) = match frame.content() {
        Content::Text(text) => {
            frames.insert(id.to_string(), text.clone().into());
            return;
        }
        Content::Link(link) => {
            frames.insert(id.to_string(), link.clone().into());
            return;
        }
        Content::ExtendedText(et) => (et.description.clone(), et.value.clone().into()),
        Content::ExtendedLink(el) => (el.description.clone(), el.link.clone().into()),
        Content::Comment(c) => (format!("{}:{}", c.lang, c.description), c.text.clone().into()),
        Content::Lyrics(l) => (format!("{}:{}", l.lang, l.description), l.text.clone().into()),
        Content::Picture(p) => {
            let mut picture = Metadata::new();
            picture.insert("mime_type".into(), p.mime_type.clone().into());
            picture.insert("picture_type".into(), u32::from(picture_code(p.picture_type)).into());
            picture.insert("data".into(), hex::encode(&p.data).into());
            (p.description.clone(), picture.into())
        }
        Content::Unknown(unknown) if is_frame_id(id) => {
            frames.insert(id.to_string(), hex::encode(&unknown.data).into());
            return;
        }
        _ => {
            debug!(frame = id, "ID3 frame not carried");
            return;
        }
    };
    if let Some(map) = entries(frames, id) {
        map.insert(key, value);
    }
}

fn texts<'a>(id: &str, value: &'a MetadataValue) -> ProcessorResult<Vec<(&'a str, &'a str)>> {
    let map = value.as_map().ok_or_else(|| invalid(id, "a mapping"))?;
    map.iter()
        .map(|(key, value)| {
            let text = value.as_text().ok_or_else(|| invalid(id, "a mapping of text"))?;
            Ok((key.as_str(), text))
        })
        .collect()
}

fn lang_key<'a>(id: &str, key: &'a str) -> ProcessorResult<(&'a str, &'a str)> {
    key.split_once(':')
        .ok_or_else(|| invalid(id, "keyed by \"<lang>:<description>\""))
}

fn picture(description: &str, value: &MetadataValue) -> ProcessorResult<Picture> {
    let fields = value.as_map().ok_or_else(|| invalid("APIC", "a mapping of pictures"))?;
    let text = |key: &str| fields.get(key).and_then(MetadataValue::as_text);
    let mime_type = text("mime_type").ok_or_else(|| invalid("APIC", "given a mime_type"))?;
    let data = text("data")
        .and_then(|s| hex::decode(s).ok())
        .ok_or_else(|| invalid("APIC", "given hex-encoded data"))?;
    let code = match fields.get("picture_type") {
        None => 0,
        Some(v) => v
            .as_int()
            .and_then(|c| u8::try_from(c).ok())
            .ok_or_else(|| invalid("APIC", "given a picture_type between 0 and 255"))?,
    };
    Ok(Picture {
        mime_type: mime_type.to_string(),
        picture_type: picture_type(code),
        description: description.to_string(),
        data,
    })
}

/// Add the frames described by one payload entry to `tag`, replacing
/// conflicting frames.
fn apply(tag: &mut Tag, id: &str, value: &MetadataValue, version: Version) -> ProcessorResult<()> {
    if !is_frame_id(id) {
        return Err(ProcessorError::unsupported(format!("'{id}' is not an ID3 frame id")));
    }
    match id {
        "TXXX" => {
            for (description, value) in texts(id, value)? {
                tag.add_frame(ExtendedText {
                    description: description.to_string(),
                    value: value.to_string(),
                });
            }
        }
        "WXXX" => {
            for (description, link) in texts(id, value)? {
                tag.add_frame(ExtendedLink {
                    description: description.to_string(),
                    link: link.to_string(),
                });
            }
        }
        "COMM" => {
            for (key, text) in texts(id, value)? {
                let (lang, description) = lang_key(id, key)?;
                tag.add_frame(Comment {
                    lang: lang.to_string(),
                    description: description.to_string(),
                    text: text.to_string(),
                });
            }
        }
        "USLT" => {
            for (key, text) in texts(id, value)? {
                let (lang, description) = lang_key(id, key)?;
                tag.add_frame(Lyrics {
                    lang: lang.to_string(),
                    description: description.to_string(),
                    text: text.to_string(),
                });
            }
        }
        "APIC" => {
            let pictures = value.as_map().ok_or_else(|| invalid(id, "a mapping of pictures"))?;
            for (description, fields) in pictures {
                tag.add_frame(picture(description, fields)?);
            }
        }
        _ if id.starts_with('T') => {
            let text = value.as_text().ok_or_else(|| invalid(id, "text"))?;
            tag.add_frame(Frame::text(id, text));
        }
        _ if id.starts_with('W') => {
            let link = value.as_text().ok_or_else(|| invalid(id, "text"))?;
            tag.add_frame(Frame::link(id, link));
        }
        _ => {
            let data = value
                .as_text()
                .and_then(|s| hex::decode(s).ok())
                .ok_or_else(|| invalid(id, "hex-encoded frame data"))?;
            tag.add_frame(Frame::with_content(id, Content::Unknown(Unknown { data, version })));
        }
    }
    Ok(())
}

impl MetadataProcessor for Id3MetadataProcessor {
    fn name(&self) -> &str {
        "id3"
    }

    fn namespaces(&self) -> &[&'static str] {
        &[ID3_NAMESPACE]
    }

    fn mime_types(&self) -> &[&'static str] {
        &[MPEG_AUDIO]
    }

    fn read(&self, data: &[u8]) -> ProcessorResult<Metadata> {
        let mut frames = Metadata::new();
        if let Some(tag) = leading_tag(data)? {
            frames.insert(VERSION_KEY.into(), version_number(tag.version()).into());
            for frame in tag.frames() {
                read_frame(&mut frames, frame);
            }
        }
        let start = skip_id3v2(data).map_err(truncated)?;
        if let Some(v1) = id3v1(data, start) {
            frames.insert(V1_KEY.into(), hex::encode(v1).into());
        }

        let mut out = Metadata::new();
        out.insert(ID3_NAMESPACE.into(), frames.into());
        Ok(out)
    }

    fn strip(&self, data: &[u8]) -> ProcessorResult<Vec<u8>> {
        let start = skip_id3v2(data).map_err(truncated)?;
        let end = id3v1_start(data, start);
        Ok(data[start..end].to_vec())
    }

    fn combine(&self, data: &[u8], metadata: &Metadata) -> ProcessorResult<Vec<u8>> {
        let payload = require_namespace(metadata, ID3_NAMESPACE)?;
        if payload.is_empty() {
            return Err(ProcessorError::validation("no ID3 frames provided"));
        }

        let mut tag = leading_tag(data)?.unwrap_or_else(Tag::new);
        let version = match payload.get(VERSION_KEY) {
            Some(value) => parse_version(value)?,
            None if tag.version() == Version::Id3v24 => Version::Id3v24,
            None => Version::Id3v23,
        };
        let start = skip_id3v2(data).map_err(truncated)?;
        let v1 = match payload.get(V1_KEY) {
            Some(value) => Some(parse_v1(value)?),
            None => id3v1(data, start).map(<[u8]>::to_vec),
        };

        for (id, value) in payload {
            if id != VERSION_KEY && id != V1_KEY {
                apply(&mut tag, id, value, version)?;
            }
        }

        let mut out = Vec::new();
        tag.write_to(&mut out, version).map_err(tag_error)?;
        let tag_len = out.len();
        out.extend_from_slice(&data[start..id3v1_start(data, start)]);
        if let Some(v1) = &v1 {
            out.extend_from_slice(v1);
        }
        debug!(
            frames = tag.frames().count(),
            tag_len,
            version = %version,
            v1 = v1.is_some(),
            "wrote ID3v2 tag"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp3::tests::frames;
    use crate::mp3::Mp3Processor;
    use madam_core::Processor;

    fn tagged(audio: &[u8]) -> Vec<u8> {
        let mut tag = Tag::new();
        tag.set_text("TIT2", "Title");
        tag.set_text("TPE1", "Artist");
        let mut out = Vec::new();
        tag.write_to(&mut out, Version::Id3v24).unwrap();
        out.extend_from_slice(audio);
        out
    }

    fn id3v1_block() -> Vec<u8> {
        let mut block = b"TAGOld title".to_vec();
        block.resize(128, 0);
        block
    }

    /// A v2.3 tag with frames in key order, followed by audio and an ID3v1 tag.
    fn richly_tagged(audio: &[u8]) -> Vec<u8> {
        let mut tag = Tag::with_version(Version::Id3v23);
        tag.add_frame(Picture {
            mime_type: "image/png".into(),
            picture_type: PictureType::CoverFront,
            description: "cover".into(),
            data: vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3],
        });
        tag.add_frame(Comment {
            lang: "eng".into(),
            description: "".into(),
            text: "Recorded live".into(),
        });
        tag.set_text("TIT2", "Title");
        tag.add_frame(ExtendedText {
            description: "MOOD".into(),
            value: "calm".into(),
        });
        let mut out = Vec::new();
        tag.write_to(&mut out, Version::Id3v23).unwrap();
        out.extend_from_slice(audio);
        out.extend(id3v1_block());
        out
    }

    fn id3(pairs: &[(&str, MetadataValue)]) -> Metadata {
        let frames: Metadata = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let mut out = Metadata::new();
        out.insert(ID3_NAMESPACE.into(), frames.into());
        out
    }

    fn text(s: &str) -> MetadataValue {
        s.into()
    }

    #[test]
    fn reads_text_frames() {
        let data = tagged(&frames(2));
        let metadata = Id3MetadataProcessor::new().read(&data).unwrap();
        assert_eq!(
            metadata,
            id3(&[
                ("TIT2", text("Title")),
                ("TPE1", text("Artist")),
                ("version", 4.into()),
            ])
        );
    }

    #[test]
    fn reads_structured_frames() {
        let data = richly_tagged(&frames(2));
        let metadata = Id3MetadataProcessor::new().read(&data).unwrap();
        let payload = metadata[ID3_NAMESPACE].as_map().unwrap();

        assert_eq!(payload["version"], MetadataValue::from(3));
        assert_eq!(payload["TIT2"], text("Title"));
        assert_eq!(payload["COMM"].as_map().unwrap()["eng:"], text("Recorded live"));
        assert_eq!(payload["TXXX"].as_map().unwrap()["MOOD"], text("calm"));

        let cover = payload["APIC"].as_map().unwrap()["cover"].as_map().unwrap();
        assert_eq!(cover["mime_type"], text("image/png"));
        assert_eq!(cover["picture_type"], MetadataValue::from(3));
        assert_eq!(cover["data"], text("89504e4700010203"));
        assert_eq!(payload["v1"], text(&hex::encode(id3v1_block())));
    }

    #[test]
    fn untagged_file_reads_empty() {
        let metadata = Id3MetadataProcessor::new().read(&frames(2)).unwrap();
        assert!(metadata[ID3_NAMESPACE].is_empty_map());
    }

    #[test]
    fn strip_removes_tags() {
        let audio = frames(3);
        let p = Id3MetadataProcessor::new();
        assert_eq!(p.strip(&tagged(&audio)).unwrap(), audio);
        assert_eq!(p.strip(&audio).unwrap(), audio);

        let mut with_v1 = tagged(&audio);
        with_v1.extend(id3v1_block());
        assert_eq!(p.strip(&with_v1).unwrap(), audio);
        assert_eq!(p.strip(&richly_tagged(&audio)).unwrap(), audio);
    }

    #[test]
    fn round_trip_restores_original() {
        let original = tagged(&frames(2));
        let p = Id3MetadataProcessor::new();
        let stripped = p.strip(&original).unwrap();
        let combined = p.combine(&stripped, &p.read(&original).unwrap()).unwrap();
        assert_eq!(combined, original);
        assert_eq!(p.strip(&combined).unwrap(), stripped);
    }

    #[test]
    fn round_trip_keeps_comments_pictures_and_version() {
        let original = richly_tagged(&frames(3));
        let p = Id3MetadataProcessor::new();
        let stripped = p.strip(&original).unwrap();
        let metadata = p.read(&original).unwrap();

        let combined = p.combine(&stripped, &metadata).unwrap();
        assert_eq!(&combined[..4], b"ID3\x03");
        assert_eq!(p.read(&combined).unwrap(), metadata);
        assert_eq!(combined, original);

        let tag = Tag::read_from2(Cursor::new(&combined)).unwrap();
        assert_eq!(tag.version(), Version::Id3v23);
        assert_eq!(tag.comments().count(), 1);
        assert_eq!(tag.pictures().count(), 1);
    }

    #[test]
    fn combine_merges_into_existing_tag() {
        let p = Id3MetadataProcessor::new();
        let mut data = richly_tagged(&frames(1));
        let combined = p
            .combine(&data, &id3(&[("TIT2", text("New")), ("TALB", text("Album"))]))
            .unwrap();

        let payload = p.read(&combined).unwrap()[ID3_NAMESPACE].as_map().unwrap().clone();
        assert_eq!(payload["TIT2"], text("New"));
        assert_eq!(payload["TALB"], text("Album"));
        assert_eq!(payload["version"], MetadataValue::from(3));
        assert!(payload.contains_key("COMM"));
        assert!(payload.contains_key("APIC"));
        assert!(payload.contains_key("v1"));
        assert_eq!(p.strip(&combined).unwrap(), frames(1));

        data = tagged(&frames(1));
        let mut comments = Metadata::new();
        comments.insert("deu:".into(), text("Hallo"));
        let combined = p
            .combine(&data, &id3(&[("COMM", comments.into()), ("version", 3.into())]))
            .unwrap();
        let tag = Tag::read_from2(Cursor::new(&combined)).unwrap();
        assert_eq!(tag.version(), Version::Id3v23);
        assert_eq!(tag.title(), Some("Title"));
        assert_eq!(tag.comments().next().map(|c| c.lang.as_str()), Some("deu"));
    }

    #[test]
    fn combined_file_still_extracts() {
        let p = Id3MetadataProcessor::new();
        let combined = p.combine(&frames(4), &id3(&[("TIT2", text("Title"))])).unwrap();
        assert!(Mp3Processor::new().probe(&combined));
        let asset = Mp3Processor::new().extract(&combined).unwrap();
        assert_eq!(asset.essence().as_bytes(), frames(4).as_slice());
    }

    #[test]
    fn combine_validates_input() {
        let p = Id3MetadataProcessor::new();
        let audio = frames(1);

        let err = p.combine(&audio, &Metadata::new()).unwrap_err();
        assert!(matches!(err, ProcessorError::Validation(_)));
        let err = p.combine(&audio, &id3(&[])).unwrap_err();
        assert!(matches!(err, ProcessorError::Validation(_)));

        let bad = [
            ("TXXX", text("x")),
            ("APIC", text("x")),
            ("COMM", text("x")),
            ("PCNT", text("not hex")),
            ("tit2", text("x")),
            ("TIT", text("x")),
            ("TIT22", text("x")),
            ("TRCK", 3.into()),
            ("version", 2.into()),
            ("v1", text("00ff")),
        ];
        for (id, value) in bad {
            let err = p.combine(&audio, &id3(&[(id, value)])).unwrap_err();
            assert!(matches!(err, ProcessorError::UnsupportedFormat { .. }), "{id}");
        }

        let mut comments = Metadata::new();
        comments.insert("no language".into(), text("x"));
        let err = p.combine(&audio, &id3(&[("COMM", comments.into())])).unwrap_err();
        assert!(matches!(err, ProcessorError::UnsupportedFormat { .. }));
    }

    #[test]
    fn truncated_tag_is_unsupported() {
        let p = Id3MetadataProcessor::new();
        let data = b"ID3\x04\x00\x00\x00\x00\x7F\x7Fshort";
        assert!(matches!(p.strip(data), Err(ProcessorError::UnsupportedFormat { .. })));
        assert!(matches!(p.read(data), Err(ProcessorError::UnsupportedFormat { .. })));
    }
}
