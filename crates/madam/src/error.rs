use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("processor error: {0}")]
    Processor(#[from] madam_core::ProcessorError),

    #[error("store error: {0}")]
    Store(#[from] madam_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
