/// Errors from asset store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key has no versions in the store.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
