use madam_core::{Processor, ProcessorError, ProcessorResult};
use madam_types::mime::{MIME_TYPE_KEY, SVG};
use madam_types::{Asset, Metadata};
use tracing::debug;

use crate::document::scan;
use crate::units;

/// Reader for SVG documents.
///
/// Accepts well-formed XML whose root element is `svg`. The essence is the
/// whole document; `width` and `height` are reported in pixels when the root
/// declares them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgProcessor;

impl SvgProcessor {
    pub fn new() -> Self {
        Self
    }
}

fn length_px(attribute: &str, token: &str) -> ProcessorResult<f64> {
    units::convert(token).map_err(|e| ProcessorError::unsupported(format!("invalid {attribute}: {e}")))
}

impl Processor for SvgProcessor {
    fn name(&self) -> &str {
        "svg"
    }

    fn mime_types(&self) -> &[&'static str] {
        &[SVG]
    }

    fn probe(&self, data: &[u8]) -> bool {
        scan(data).map(|layout| layout.is_svg()).unwrap_or(false)
    }

    fn extract(&self, data: &[u8]) -> ProcessorResult<Asset> {
        let layout = scan(data)?;
        if !layout.is_svg() {
            return Err(ProcessorError::unsupported(format!(
                "root element is '{}', not 'svg'",
                layout.root_local_name
            )));
        }

        let mut metadata = Metadata::new();
        metadata.insert(MIME_TYPE_KEY.into(), SVG.into());
        if let Some(width) = &layout.width {
            metadata.insert("width".into(), length_px("width", width)?.into());
        }
        if let Some(height) = &layout.height {
            metadata.insert("height".into(), length_px("height", height)?.into());
        }
        debug!(len = data.len(), has_metadata = !layout.metadata.is_empty(), "extracted SVG");

        Ok(Asset::new(data.to_vec(), metadata))
    }
}
