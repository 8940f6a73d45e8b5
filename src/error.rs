//! Error taxonomy shared across component boundaries.
//!
//! Every component converts failures from its external dependencies into one
//! of these kinds before returning; no dependency error crosses a component
//! boundary unconverted, and nothing panics across one either. The HTTP layer
//! maps each kind to a status code in [`crate::server`].

use thiserror::Error;

/// Failure kinds returned from component-level operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The store or language model could not be reached.
    #[error("storage backend unreachable: {0}")]
    ConnectionUnavailable(String),

    /// The loader produced no usable content for a document.
    #[error("no content could be extracted from the document")]
    EmptyDocument,

    /// No loader matched the file and the generic fallback also failed.
    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),

    /// A write was rejected by the storage backend.
    #[error("storage operation failed: {0}")]
    StorageFailure(String),

    /// A lookup by identifier missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// A matched loader failed to parse its input.
    #[error("failed to load .{extension} file: {message}")]
    Loader { extension: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("row not found".to_string()),
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Error::ConnectionUnavailable(err.to_string()),
            other => Error::StorageFailure(other.to_string()),
        }
    }
}
