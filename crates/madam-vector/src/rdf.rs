use madam_core::{require_namespace, MetadataProcessor, ProcessorError, ProcessorResult};
use madam_types::mime::SVG;
use madam_types::{Metadata, MetadataValue};
use tracing::debug;

use crate::document::{scan, validate_fragment, SvgLayout};

/// Namespace owned by [`SvgMetadataProcessor`].
pub const RDF_NAMESPACE: &str = "rdf";

/// Key of the markup string inside the `rdf` payload.
pub const XML_KEY: &str = "xml";

/// Key of the `metadata` start tag inside the `rdf` payload, present when
/// the tag carries attributes.
pub const ANCHOR_KEY: &str = "anchor";

/// Metadata processor for RDF embedded in SVG documents.
///
/// The namespace region is the `metadata` element directly below the root.
/// Its payload is `{"xml": <markup of the first child element>}`, plus
/// `{"anchor": <start tag>}` when that element's start tag has attributes.
///
/// - `strip` removes every `metadata` child of the root, leaving all other
///   bytes untouched.
/// - `combine` replaces the content of the first existing `metadata` element,
///   or inserts a new one immediately before the root's end tag, opened with
///   the payload's `anchor` tag if there is one. A stripped anchor therefore
///   comes back with its attributes but not at its original position.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgMetadataProcessor;

impl SvgMetadataProcessor {
    pub fn new() -> Self {
        Self
    }
}

fn namespace_map(payload: Metadata) -> Metadata {
    let mut out = Metadata::new();
    out.insert(RDF_NAMESPACE.into(), payload.into());
    out
}

fn splice(data: &[u8], start: usize, end: usize, replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() - (end - start) + replacement.len());
    out.extend_from_slice(&data[..start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&data[end..]);
    out
}

/// Turn the empty tag `<name .../>` into an open tag `<name ...>`.
fn reopen(empty_tag: &[u8]) -> Vec<u8> {
    let body = empty_tag.strip_suffix(b"/>").unwrap_or(empty_tag);
    let mut out = body.to_vec();
    out.push(b'>');
    out
}

/// Qualified name of a start tag such as `<svg:metadata id="m">`.
fn start_tag_name(tag: &str) -> Option<&str> {
    let rest = tag.strip_prefix('<')?;
    let end = rest
        .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Check a payload `anchor` and return its start tag and qualified name.
fn parse_anchor<'a>(
    value: &'a MetadataValue,
    layout: &SvgLayout,
) -> ProcessorResult<(&'a str, &'a str)> {
    let tag = value
        .as_text()
        .ok_or_else(|| ProcessorError::unsupported("metadata anchor must be a string"))?;
    let name = start_tag_name(tag)
        .filter(|name| name.rsplit(':').next() == Some("metadata"))
        .ok_or_else(|| {
            ProcessorError::unsupported(format!("'{tag}' is not a metadata start tag"))
        })?;
    validate_fragment(&format!("{tag}</{name}>"), &layout.root_namespaces)?;
    Ok((tag, name))
}

fn inject(data: &[u8], layout: &SvgLayout, xml: &str, anchor: Option<(&str, &str)>) -> Vec<u8> {
    if let Some(anchor) = layout.metadata.first() {
        return match anchor.close_start {
            Some(close_start) => splice(data, anchor.open_end, close_start, xml.as_bytes()),
            None => {
                let mut element = reopen(&data[anchor.start..anchor.end]);
                element.extend_from_slice(xml.as_bytes());
                element.extend_from_slice(format!("</{}>", anchor.qname).as_bytes());
                splice(data, anchor.start, anchor.end, &element)
            }
        };
    }

    let element = match anchor {
        Some((tag, name)) => format!("{tag}{xml}</{name}>"),
        None => {
            let name = layout.anchor_name();
            format!("<{name}>{xml}</{name}>")
        }
    };
    let root = &layout.root;
    match root.close_start {
        Some(close_start) => splice(data, close_start, close_start, element.as_bytes()),
        None => {
            let mut replacement = reopen(&data[root.start..root.end]);
            replacement.extend_from_slice(element.as_bytes());
            replacement.extend_from_slice(format!("</{}>", root.qname).as_bytes());
            splice(data, root.start, root.end, &replacement)
        }
    }
}

impl MetadataProcessor for SvgMetadataProcessor {
    fn name(&self) -> &str {
        "svg-rdf"
    }

    fn namespaces(&self) -> &[&'static str] {
        &[RDF_NAMESPACE]
    }

    fn mime_types(&self) -> &[&'static str] {
        &[SVG]
    }

    fn read(&self, data: &[u8]) -> ProcessorResult<Metadata> {
        let layout = scan(data)?;
        let mut payload = Metadata::new();
        let first = layout.metadata.first();
        if let (Some((start, end)), Some(anchor)) = (layout.metadata_payload, first) {
            let xml = String::from_utf8_lossy(&data[start..end]).into_owned();
            payload.insert(XML_KEY.into(), xml.into());

            let tag = String::from_utf8_lossy(&data[anchor.start..anchor.open_end]);
            if tag != format!("<{}>", anchor.qname) {
                payload.insert(ANCHOR_KEY.into(), tag.into_owned().into());
            }
        }
        Ok(namespace_map(payload))
    }

    fn strip(&self, data: &[u8]) -> ProcessorResult<Vec<u8>> {
        let layout = scan(data)?;
        let mut out = Vec::with_capacity(data.len());
        let mut cursor = 0;
        for span in &layout.metadata {
            out.extend_from_slice(&data[cursor..span.start]);
            cursor = span.end;
        }
        out.extend_from_slice(&data[cursor..]);
        debug!(removed = layout.metadata.len(), "stripped SVG metadata");
        Ok(out)
    }

    fn combine(&self, data: &[u8], metadata: &Metadata) -> ProcessorResult<Vec<u8>> {
        let rdf = require_namespace(metadata, RDF_NAMESPACE)?;
        let xml = match rdf.get(XML_KEY) {
            Some(MetadataValue::Text(xml)) => xml,
            Some(_) => {
                return Err(ProcessorError::unsupported("RDF markup must be a string"));
            }
            None => {
                return Err(ProcessorError::validation("XML string missing from RDF metadata"));
            }
        };
        let layout = scan(data)?;
        validate_fragment(xml, &layout.root_namespaces)?;
        let anchor = rdf
            .get(ANCHOR_KEY)
            .map(|value| parse_anchor(value, &layout))
            .transpose()?;

        let out = inject(data, &layout, xml.trim(), anchor);
        debug!(reused_anchor = !layout.metadata.is_empty(), "combined SVG metadata");
        Ok(out)
    }
}
