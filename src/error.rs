use thiserror::Error;

use crate::store::StoreError;

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse classification of an [`EngineError`], for callers that map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input (empty upload, unsupported or malformed content, empty filter, bad paging).
    InvalidInput,
    /// The upload name is already taken.
    Conflict,
    /// The delete target does not exist.
    NotFound,
    /// The store (or a worker task) failed.
    Backend,
}

/// Error type returned by ingestion and query operations.
///
/// Every variant except [`EngineError::Store`] and [`EngineError::Task`] is a client error: the
/// request itself is at fault and retrying it unchanged will fail the same way.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No file payload was supplied.
    #[error("no file was uploaded")]
    EmptyUpload,

    /// A file with this name has already been ingested.
    #[error("file '{filename}' has already been uploaded")]
    DuplicateFile { filename: String },

    /// The declared content type is not one of the supported tabular formats.
    #[error("unsupported file format '{content_type}'")]
    UnsupportedFormat { content_type: String },

    /// The upload could not be parsed.
    #[error("failed to parse {format} file: {reason}")]
    Parse { format: &'static str, reason: String },

    /// A field filter was requested with no usable field.
    #[error("no field supplied")]
    NoFieldSupplied,

    /// Nothing is stored under this filename.
    #[error("file '{filename}' not found")]
    NotFound { filename: String },

    /// `page` or `page_size` is out of range.
    #[error("invalid pagination: {message}")]
    InvalidPagination { message: String },

    /// Underlying store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A blocking worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(String),
}

impl EngineError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::EmptyUpload
            | EngineError::UnsupportedFormat { .. }
            | EngineError::Parse { .. }
            | EngineError::NoFieldSupplied
            | EngineError::InvalidPagination { .. } => ErrorKind::InvalidInput,
            EngineError::DuplicateFile { .. } => ErrorKind::Conflict,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Store(_) | EngineError::Task(_) => ErrorKind::Backend,
        }
    }

    /// Whether the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        self.kind() != ErrorKind::Backend
    }

    pub(crate) fn parse(format: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Parse {
            format,
            reason: reason.into(),
        }
    }
}
