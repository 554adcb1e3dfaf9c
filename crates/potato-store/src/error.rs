/// Errors from chain store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Persisted data exists but cannot be decoded as a potato collection.
    #[error("corrupt chain store at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    /// The collection could not be encoded for writing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if the persisted state is unreadable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
