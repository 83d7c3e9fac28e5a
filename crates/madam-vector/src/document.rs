//! Byte-span layout of an SVG document.
//!
//! The scanner walks the document once with a streaming reader and records
//! where the root element and its `metadata` children start and end. Callers
//! splice the original bytes with these offsets instead of re-serializing.

use madam_core::{Location, ProcessorError, ProcessorResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Name of the synthetic element wrapping a fragment during validation.
const FRAGMENT_WRAPPER: &str = "madam-fragment";

/// Byte offsets of one element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ElementSpan {
    /// Qualified name as written (`metadata`, `svg:metadata`).
    pub qname: String,
    /// Offset of the opening `<`.
    pub start: usize,
    /// Offset just past the start tag (equal to `end` for empty elements).
    pub open_end: usize,
    /// Offset of the end tag's `<`; `None` for empty elements.
    pub close_start: Option<usize>,
    /// Offset just past the element.
    pub end: usize,
}

impl ElementSpan {
    fn open(qname: String, start: usize, open_end: usize) -> Self {
        Self {
            qname,
            start,
            open_end,
            close_start: None,
            end: open_end,
        }
    }

    pub fn is_empty_element(&self) -> bool {
        self.close_start.is_none()
    }
}

/// Everything the SVG processors need to know about a document.
#[derive(Clone, Debug)]
pub(crate) struct SvgLayout {
    pub root: ElementSpan,
    pub root_local_name: String,
    pub root_prefix: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    /// `xmlns` and `xmlns:*` attributes of the root, as written.
    pub root_namespaces: Vec<String>,
    /// `metadata` children of the root, in document order.
    pub metadata: Vec<ElementSpan>,
    /// First child element of the first `metadata` element.
    pub metadata_payload: Option<(usize, usize)>,
}

impl SvgLayout {
    pub fn is_svg(&self) -> bool {
        self.root_local_name == "svg"
    }

    /// Qualified name for a new `metadata` anchor, sharing the root's prefix.
    pub fn anchor_name(&self) -> String {
        match &self.root_prefix {
            Some(prefix) => format!("{prefix}:metadata"),
            None => "metadata".to_string(),
        }
    }
}

fn parse_error(data: &[u8], offset: usize, message: impl std::fmt::Display) -> ProcessorError {
    ProcessorError::unsupported_at(
        format!("error while parsing XML: {message}"),
        Location::from_offset(data, offset),
    )
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn qname_of(e: &BytesStart<'_>) -> String {
    lossy(e.name().as_ref())
}

fn local_name_of(e: &BytesStart<'_>) -> String {
    lossy(e.local_name().as_ref())
}

fn is_blank(text: &[u8]) -> bool {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    text.iter().all(u8::is_ascii_whitespace)
}

/// Namespace-aware event reader that rejects unbound prefixes, malformed or
/// duplicate attributes and undefined entity references.
///
/// Offsets are reported relative to `source`, which starts `shift` bytes into
/// the parsed buffer.
struct StrictReader<'a> {
    reader: NsReader<&'a [u8]>,
    source: &'a [u8],
    shift: usize,
}

impl<'a> StrictReader<'a> {
    fn new(parsed: &'a [u8], source: &'a [u8], shift: usize) -> Self {
        Self {
            reader: NsReader::from_reader(parsed),
            source,
            shift,
        }
    }

    fn error(&self, offset: usize, message: impl std::fmt::Display) -> ProcessorError {
        parse_error(self.source, offset.saturating_sub(self.shift), message)
    }

    /// Next event with the byte range it covers in the parsed buffer.
    fn next(&mut self) -> ProcessorResult<(Event<'a>, usize, usize)> {
        let before = self.reader.buffer_position() as usize;
        let (resolved, event) = match self.reader.read_resolved_event() {
            Ok(pair) => pair,
            Err(e) => {
                let at = self.reader.error_position() as usize;
                return Err(self.error(at, e));
            }
        };
        let unbound = match resolved {
            ResolveResult::Unknown(prefix) => Some(prefix),
            _ => None,
        };
        let after = self.reader.buffer_position() as usize;

        if let Some(prefix) = unbound {
            return Err(self.error(
                before,
                format!("unbound namespace prefix '{}'", lossy(&prefix)),
            ));
        }
        match &event {
            Event::Start(e) | Event::Empty(e) => self.check_attributes(e, before)?,
            Event::Text(t) => {
                t.unescape().map_err(|err| self.error(before, err))?;
            }
            _ => {}
        }
        Ok((event, before, after))
    }

    fn check_attributes(&self, e: &BytesStart<'_>, at: usize) -> ProcessorResult<()> {
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.error(at, err))?;
            if let (ResolveResult::Unknown(prefix), _) = self.reader.resolve_attribute(attr.key) {
                return Err(self.error(
                    at,
                    format!("unbound namespace prefix '{}'", lossy(&prefix)),
                ));
            }
            attr.unescape_value().map_err(|err| self.error(at, err))?;
        }
        Ok(())
    }
}

/// Check that `xml` is exactly one well-formed element, optionally
/// surrounded by whitespace.
///
/// `namespaces` are `xmlns` attributes in scope where the fragment will be
/// inserted; prefixes they bind may be used without redeclaring them.
pub(crate) fn validate_fragment(xml: &str, namespaces: &[String]) -> ProcessorResult<()> {
    let mut open = format!("<{FRAGMENT_WRAPPER}");
    for declaration in namespaces {
        open.push(' ');
        open.push_str(declaration);
    }
    open.push('>');
    let wrapped = format!("{open}{xml}</{FRAGMENT_WRAPPER}>");
    let source = xml.as_bytes();
    let mut reader = StrictReader::new(wrapped.as_bytes(), source, open.len());

    // The wrapper itself.
    let (first, _, _) = reader.next()?;
    if !matches!(first, Event::Start(_)) {
        return Err(reader.error(0, "malformed XML fragment"));
    }

    let mut depth = 1usize;
    let mut elements = 0usize;
    loop {
        let (event, before, after) = reader.next()?;
        match event {
            Event::Start(_) | Event::Empty(_) => {
                if depth == 1 {
                    elements += 1;
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    if after != wrapped.len() {
                        return Err(reader.error(before, "unexpected end tag"));
                    }
                    break;
                }
            }
            Event::Text(ref t) if depth == 1 && !is_blank(t) => {
                return Err(reader.error(before, "text outside of element"));
            }
            Event::Eof => return Err(reader.error(wrapped.len(), "unclosed element")),
            _ => {}
        }
        if elements > 1 {
            return Err(reader.error(before, "more than one top-level element"));
        }
    }

    if elements == 0 {
        return Err(ProcessorError::unsupported("XML fragment contains no element"));
    }
    Ok(())
}

/// Scan a document and record its layout.
///
/// Fails on malformed XML, unbound namespace prefixes, undefined entities,
/// text or elements outside the root, and documents that end before the root
/// is closed.
pub(crate) fn scan(data: &[u8]) -> ProcessorResult<SvgLayout> {
    let mut reader = StrictReader::new(data, data, 0);

    let mut root: Option<ElementSpan> = None;
    let mut root_local_name = String::new();
    let mut root_prefix = None;
    let mut root_namespaces = Vec::new();
    let mut width = None;
    let mut height = None;
    let mut root_closed = false;

    let mut metadata: Vec<ElementSpan> = Vec::new();
    let mut in_metadata = false;
    let mut payload_start: Option<usize> = None;
    let mut payload: Option<(usize, usize)> = None;

    // Number of currently open elements.
    let mut depth = 0usize;

    loop {
        let (event, before, after) = reader.next()?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                if root_closed {
                    return Err(parse_error(data, before, "junk after document element"));
                }
                match depth {
                    0 => {
                        let mut span = ElementSpan::open(qname_of(e), before, after);
                        if empty {
                            root_closed = true;
                        } else {
                            span.end = data.len();
                        }
                        root_local_name = local_name_of(e);
                        root_prefix = e.name().prefix().map(|p| lossy(p.as_ref()));
                        for attr in e.attributes() {
                            let attr = attr.map_err(|err| parse_error(data, before, err))?;
                            if attr.key.as_namespace_binding().is_some() {
                                root_namespaces.push(declaration(&attr.key.0, &attr.value));
                                continue;
                            }
                            let value = attr
                                .unescape_value()
                                .map_err(|err| parse_error(data, before, err))?
                                .into_owned();
                            match attr.key.local_name().as_ref() {
                                b"width" => width = Some(value),
                                b"height" => height = Some(value),
                                _ => {}
                            }
                        }
                        root = Some(span);
                    }
                    1 if e.local_name().as_ref() == b"metadata" => {
                        metadata.push(ElementSpan::open(qname_of(e), before, after));
                        in_metadata = !empty;
                    }
                    2 if in_metadata && metadata.len() == 1 && payload.is_none() => {
                        if empty {
                            payload = Some((before, after));
                        } else if payload_start.is_none() {
                            payload_start = Some(before);
                        }
                    }
                    _ => {}
                }
                if !empty {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match depth {
                    0 => {
                        if let Some(span) = root.as_mut() {
                            span.close_start = Some(before);
                            span.end = after;
                        }
                        root_closed = true;
                    }
                    1 if in_metadata => {
                        if let Some(span) = metadata.last_mut() {
                            span.close_start = Some(before);
                            span.end = after;
                        }
                        in_metadata = false;
                    }
                    2 if in_metadata => {
                        if let (Some(start), None) = (payload_start, payload) {
                            payload = Some((start, after));
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) if depth == 0 && !is_blank(t) => {
                return Err(parse_error(data, before, "text outside of root element"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let root = root.ok_or_else(|| parse_error(data, data.len(), "no root element found"))?;
    if !root_closed {
        return Err(parse_error(data, data.len(), "unclosed root element"));
    }

    Ok(SvgLayout {
        root,
        root_local_name,
        root_prefix,
        width,
        height,
        root_namespaces,
        metadata,
        metadata_payload: payload,
    })
}

/// Re-render an attribute with its raw (still escaped) value.
fn declaration(key: &[u8], raw_value: &[u8]) -> String {
    let value = lossy(raw_value);
    let quote = if value.contains('"') { '\'' } else { '"' };
    format!("{}={quote}{value}{quote}", lossy(key))
}
