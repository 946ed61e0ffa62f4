//! Compiler error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort a selector compile.
///
/// Metadata misses are not errors: the resolver falls back to permissive
/// defaults. Only an unreachable store, an expired deadline, or input that
/// cannot be rendered safely ends a compile early.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("metadata store error")]
    Metadata(#[from] sqlx::Error),

    #[error("metadata lookup timed out after {0:?}")]
    MetadataTimeout(Duration),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("connection tree exceeds maximum depth of {depth}")]
    TooDeep { depth: usize },

    #[error("invalid selector request")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("invalid metadata file: {0}")]
    MetadataFile(String),
}

/// Result type alias using SelectorError.
pub type SelectorResult<T> = Result<T, SelectorError>;
