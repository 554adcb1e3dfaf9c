use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("actor id must not be empty")]
    EmptyActor,

    #[error("invalid potato id {input:?}: {reason}")]
    InvalidPotatoId { input: String, reason: String },
}
