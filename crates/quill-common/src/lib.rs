//! # quill-common
//!
//! Common types and constants for QuillDB.
//!
//! This crate provides the foundational pieces shared by the storage engine
//! and the command-line shell:
//!
//! - **Types**: the [`PageId`](types::PageId) identifier
//! - **Constants**: page geometry and slotted-page layout sizes
//!
//! ## Example
//!
//! ```rust
//! use quill_common::types::PageId;
//! use quill_common::constants::PAGE_SIZE;
//!
//! let page = PageId::new(42);
//! assert_eq!(page.offset(), 42 * PAGE_SIZE as u64);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::PageId;
