//! Error types
//!
//! Every externally visible failure maps to a stable code (see [`codes`]) so
//! callers can tell a conflict that deserves a retry prompt from an ordinary
//! I/O failure.

use limner_config::ConfigError;
use limner_parser::{BlockError, Fingerprint};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Stable error and diagnostic codes
pub mod codes {
    /// No sections found; insertion falls back to the document end
    pub const PARSE_EMPTY: &str = "PARSE_EMPTY";
    /// Target heading not found; insertion falls back to the last section
    pub const RESOLUTION_FALLBACK: &str = "RESOLUTION_FALLBACK";
    /// Note changed since it was read
    pub const CONFLICT: &str = "CONFLICT";
    /// Image job reported a terminal failure
    pub const JOB_FAILED: &str = "JOB_FAILED";
    /// Image job did not finish within the attempt budget
    pub const JOB_TIMEOUT: &str = "JOB_TIMEOUT";
    /// Image job completed without a usable result
    pub const MISSING_RESULT: &str = "MISSING_RESULT";
    /// Cleanup of a generated file failed (logged only)
    pub const ARTIFACT_DELETE_FAILED: &str = "ARTIFACT_DELETE_FAILED";
}

/// Failures while mutating note text
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The note changed since it was last read
    #[error("Note was modified externally (expected {expected}, found {actual}). Please try again.")]
    Conflict {
        /// Fingerprint captured at read time
        expected: Fingerprint,
        /// Fingerprint of the text about to be replaced
        actual: Fingerprint,
    },

    /// A block could not be built
    #[error(transparent)]
    Block(#[from] BlockError),

    /// No block with the given id exists in the note
    #[error("Image block not found: {0}")]
    BlockNotFound(String),

    /// No block spans the given line
    #[error("No image block at line {0}")]
    NoBlockAtLine(usize),

    /// The block carries no prompt to regenerate from
    #[error("Image block {0} has no prompt and cannot be regenerated")]
    MissingPrompt(String),
}

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

impl DocumentError {
    /// Create a conflict error
    pub fn conflict(expected: Fingerprint, actual: Fingerprint) -> Self {
        Self::Conflict { expected, actual }
    }

    /// Stable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Conflict { .. } => codes::CONFLICT,
            Self::Block(_) => "INVALID_BLOCK",
            Self::BlockNotFound(_) => "BLOCK_NOT_FOUND",
            Self::NoBlockAtLine(_) => "NO_BLOCK_AT_LINE",
            Self::MissingPrompt(_) => "MISSING_PROMPT",
        }
    }

    /// Whether re-reading the note and retrying can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Failures talking to the planning or image service
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Network failure or timeout
    #[error("Request failed: {0}")]
    Transport(String),

    /// The service answered with something we cannot use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service returned a structured error
    #[error("{code}: {message}")]
    Api {
        /// Service error code (e.g. `RATE_LIMITED`)
        code: String,
        /// Human-readable message
        message: String,
        /// Whether the service marked the error retryable
        retryable: bool,
        /// Suggested wait in seconds
        retry_after: Option<u64>,
    },
}

/// Result type for service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an invalid-response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a structured API error
    pub fn api(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
            retryable,
            retry_after: None,
        }
    }

    /// Stable code for this error
    pub fn code(&self) -> &str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Api { code, .. } => code,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::InvalidResponse(_) => false,
            Self::Api { retryable, .. } => *retryable,
        }
    }
}

/// Failures of a single image job
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// The job reached the `failed` state
    #[error("Image generation failed: {message}")]
    Failed {
        /// Job identifier
        job_id: String,
        /// Message reported by the service
        message: String,
    },

    /// The attempt budget ran out before a terminal state
    #[error("Image generation timed out after {attempts} checks ({waited:?})")]
    Timeout {
        /// Job identifier
        job_id: String,
        /// Status checks performed
        attempts: u32,
        /// Total time spent waiting
        waited: Duration,
    },

    /// The job completed without a result reference
    #[error("Image job {job_id} completed without an image")]
    MissingResult {
        /// Job identifier
        job_id: String,
    },

    /// Creating, polling or downloading failed
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Result type for image jobs
pub type JobResult<T> = Result<T, JobError>;

impl JobError {
    /// Stable code for this error
    pub fn code(&self) -> &str {
        match self {
            Self::Failed { .. } => codes::JOB_FAILED,
            Self::Timeout { .. } => codes::JOB_TIMEOUT,
            Self::MissingResult { .. } => codes::MISSING_RESULT,
            Self::Service(err) => err.code(),
        }
    }
}

/// Failures of the note, artifact and backup stores
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("{action} {path}: {source}")]
    Io {
        /// What was being done (e.g. "Failed to read")
        action: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Path is absolute or escapes the vault
    #[error("Path is outside the vault: {0}")]
    InvalidPath(String),

    /// Stored data could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Create an IO error with context
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether the error means the file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Top-level error for pipeline and undo operations
#[derive(Debug, Error)]
pub enum LimnerError {
    /// Note mutation failed
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Planning failed
    #[error("Planning failed: {0}")]
    Plan(#[source] ServiceError),

    /// Image generation failed
    #[error(transparent)]
    Job(#[from] JobError),

    /// Storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for top-level operations
pub type LimnerResult<T> = Result<T, LimnerError>;

impl LimnerError {
    /// Stable code for this error
    pub fn code(&self) -> &str {
        match self {
            Self::Document(err) => err.code(),
            Self::Plan(err) => err.code(),
            Self::Job(err) => err.code(),
            Self::Storage(_) => "STORAGE",
            Self::Config(_) => "CONFIG",
        }
    }

    /// True for the optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Document(DocumentError::Conflict { .. }))
    }
}
