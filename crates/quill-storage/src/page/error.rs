//! Error types for slotted page operations.

use thiserror::Error;

/// Result type for slotted page operations.
pub type PageResult<T> = Result<T, PageError>;

/// Errors that can occur during slotted page operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum PageError {
    /// The tuple does not fit, even after compaction.
    ///
    /// Recoverable at the caller: try another page.
    #[error("page is full")]
    PageFull,

    /// The slot id does not name an existing slot.
    #[error("slot {slot_id} out of bounds (slot count: {slot_count})")]
    SlotOutOfBounds { slot_id: u16, slot_count: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(PageError::PageFull.to_string(), "page is full");

        let err = PageError::SlotOutOfBounds {
            slot_id: 5,
            slot_count: 2,
        };
        assert!(err.to_string().contains("slot 5"));
    }
}
