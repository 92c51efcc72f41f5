//! Error types for Blob and File bindings.

use thiserror::Error;

/// Errors that can occur reading or slicing a blob.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The blob has been closed and can no longer be read.
    #[error("blob closed")]
    Closed,

    /// Slice bounds outside `0 <= start <= end <= size`.
    #[error("invalid range {start}..{end} for blob of size {size}")]
    InvalidRange { start: u64, end: u64, size: u64 },

    /// The asynchronous read failed; carries the native diagnostic.
    #[error("read failed: {0}")]
    Read(String),

    /// A native operation failed.
    #[error(transparent)]
    Native(#[from] webbind_native::Error),
}

/// Result type alias for blob operations.
pub type Result<T> = std::result::Result<T, BlobError>;
