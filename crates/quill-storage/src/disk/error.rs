//! Error types for the disk manager.

use std::io;
use std::path::PathBuf;

use quill_common::types::PageId;
use thiserror::Error;

/// Result type for disk manager operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during disk manager operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// The backing file could not be opened or stat'ed.
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    /// The backing file length is not a multiple of the page size.
    ///
    /// Fatal for this manager: the file is not a valid page array.
    #[error("file {path} size {size} is not aligned to page size {page_size}")]
    Misaligned {
        path: PathBuf,
        size: u64,
        page_size: usize,
    },

    /// The page id is at or beyond the allocation frontier.
    #[error("page {page_id} out of bounds ({allocated} pages allocated)")]
    PageOutOfBounds { page_id: PageId, allocated: u64 },

    /// A page buffer with a length other than the page size was passed in.
    #[error("invalid page buffer length: got {actual}, want {expected}")]
    WrongBufferSize { expected: usize, actual: usize },

    /// The file ended before a full page could be read.
    #[error("short read on page {page_id}")]
    ShortRead { page_id: PageId },

    /// An underlying read/write failure, with the page and offset it hit.
    #[error("{operation} failed for page {page_id} at offset {offset}: {source}")]
    Io {
        operation: &'static str,
        page_id: PageId,
        offset: u64,
        source: io::Error,
    },

    /// Flushing OS buffers to durable storage failed.
    #[error("failed to sync file: {source}")]
    Sync { source: io::Error },

    /// The manager has been closed; the file handle is gone.
    #[error("disk manager is closed")]
    Closed,
}

impl DiskError {
    /// Wraps an I/O failure with the page it was addressed to.
    pub(crate) fn io(operation: &'static str, page_id: PageId, source: io::Error) -> Self {
        Self::Io {
            operation,
            page_id,
            offset: page_id.offset(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context() {
        let err = DiskError::io(
            "read",
            PageId::new(7),
            io::Error::new(io::ErrorKind::Other, "boom"),
        );
        let msg = err.to_string();
        assert!(msg.contains("read"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_out_of_bounds_display() {
        let err = DiskError::PageOutOfBounds {
            page_id: PageId::new(9),
            allocated: 3,
        };
        assert!(err.to_string().contains("out of bounds"));
    }
}
