//! Vector graphics support for MADAM.
//!
//! - [`units`] converts SVG length tokens (`12pt`, `1in`, `50%`) to pixels.
//! - [`SvgProcessor`] sniffs and extracts SVG documents.
//! - [`SvgMetadataProcessor`] owns the `rdf` namespace: the `metadata`
//!   element directly below the SVG root.
//!
//! Documents are never re-serialized. Both processors locate byte spans with
//! a streaming XML reader and splice the original bytes, so everything
//! outside the metadata element survives byte for byte.

mod document;
pub mod error;
pub mod rdf;
pub mod svg;
pub mod units;

pub use error::InvalidLengthError;
pub use rdf::SvgMetadataProcessor;
pub use svg::SvgProcessor;
