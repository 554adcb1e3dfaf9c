use potato_store::StoreError;

use crate::validator::Rejection;

/// Errors produced by ownership operations.
///
/// None of these are retried by the custody layer. Only `StorageIo` is worth
/// a caller-side retry; rejections are permanent for the given inputs and
/// `StorageCorrupt` blocks all writes until the store is repaired by hand.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("invalid actor: {reason}")]
    InvalidActor { reason: String },

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("chain store is corrupt: {0}")]
    StorageCorrupt(String),

    #[error("chain store I/O failure: {0}")]
    StorageIo(String),
}

impl CustodyError {
    /// Stable snake_case reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidActor { .. } => "invalid_actor",
            Self::Rejected(rejection) => rejection.code(),
            Self::StorageCorrupt(_) => "storage_corrupt",
            Self::StorageIo(_) => "storage_io",
        }
    }

    /// Returns `true` if repeating the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageIo(_))
    }

    /// The validator rejection, if this error is one.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl From<StoreError> for CustodyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Corrupt { .. } => Self::StorageCorrupt(err.to_string()),
            StoreError::Serialization(_) | StoreError::Io(_) => Self::StorageIo(err.to_string()),
        }
    }
}

pub type CustodyResult<T> = Result<T, CustodyError>;
