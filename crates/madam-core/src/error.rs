use std::fmt;

/// Position inside a text container, reported with parse failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in bytes.
    pub column: usize,
}

impl Location {
    /// Translate a byte offset into a line/column pair.
    ///
    /// Offsets past the end of `data` are clamped to the end.
    pub fn from_offset(data: &[u8], offset: usize) -> Self {
        let offset = offset.min(data.len());
        let prefix = &data[..offset];
        let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
        let column = match prefix.iter().rposition(|&b| b == b'\n') {
            Some(newline) => offset - newline,
            None => offset + 1,
        };
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors from processor dispatch and metadata operations.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// No registered processor accepted the input.
    #[error("unrecognized format: no registered processor accepts the input")]
    UnrecognizedFormat,

    /// A processor accepted the input via probe, but could not parse it.
    #[error("unsupported format: {message}{}", at(.location))]
    UnsupportedFormat {
        message: String,
        location: Option<Location>,
    },

    /// The caller supplied empty or incomplete metadata.
    #[error("validation error: {0}")]
    Validation(String),

    /// No metadata processor is registered for the namespace.
    #[error("no metadata processor registered for namespace '{0}'")]
    UnknownNamespace(String),

    /// The input exceeds the configured size limit.
    #[error("input of {actual} bytes exceeds the limit of {limit} bytes")]
    InputTooLarge { limit: u64, actual: u64 },

    /// I/O error while buffering or rewinding the input stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn at(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" (at {loc})"),
        None => String::new(),
    }
}

impl ProcessorError {
    /// An unsupported-format error without location context.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
            location: None,
        }
    }

    /// An unsupported-format error pointing at a position in the input.
    pub fn unsupported_at(message: impl Into<String>, location: Location) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result alias for processor operations.
pub type ProcessorResult<T> = Result<T, ProcessorError>;
