//! Buffer pool errors.

use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Every frame is pinned and the replacer has no candidate.
    ///
    /// Recoverable: release pins and retry.
    #[error("buffer pool is full, all pages are pinned")]
    PoolFull,

    /// The disk manager failed underneath the pool.
    #[error(transparent)]
    Disk(#[from] DiskError),
}
