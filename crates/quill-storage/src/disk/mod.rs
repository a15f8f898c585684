//! Disk manager: page-granular I/O over a single backing file.
//!
//! The file is a contiguous array of [`PAGE_SIZE`](quill_common::constants::PAGE_SIZE)
//! byte pages starting at offset 0, with no file header. Page `i` occupies
//! `[i * PAGE_SIZE, (i + 1) * PAGE_SIZE)`. The next page id to allocate is
//! persisted implicitly as `file_length / PAGE_SIZE`.
//!
//! The manager knows nothing about page contents; higher layers interpret
//! the bytes.

mod error;
mod manager;

pub use error::{DiskError, DiskResult};
pub use manager::DiskManager;
