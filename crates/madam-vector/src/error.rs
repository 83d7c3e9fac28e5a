/// A length token that cannot be converted to pixels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid length '{token}': {reason}")]
pub struct InvalidLengthError {
    pub token: String,
    pub reason: &'static str,
}

impl InvalidLengthError {
    pub(crate) fn new(token: &str, reason: &'static str) -> Self {
        Self {
            token: token.to_string(),
            reason,
        }
    }
}
