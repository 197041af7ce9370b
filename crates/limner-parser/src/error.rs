//! Parser error types

use thiserror::Error;

/// Errors raised while building image blocks
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// Block id is empty or contains characters that would break the marker
    #[error("Invalid block id: {0:?}")]
    InvalidId(String),

    /// Artifact path would break the embed syntax
    #[error("Invalid artifact path: {0:?}")]
    InvalidArtifactPath(String),
}

/// Specialized Result type for block operations
pub type BlockResult<T> = Result<T, BlockError>;

impl BlockError {
    /// Create an invalid id error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Create an invalid artifact path error
    pub fn invalid_artifact_path(path: impl Into<String>) -> Self {
        Self::InvalidArtifactPath(path.into())
    }
}
