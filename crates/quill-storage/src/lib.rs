//! # quill-storage
//!
//! The storage core of QuillDB.
//!
//! Three layers, leaves first:
//!
//! - [`disk`] — a disk manager that owns one backing file as a dense array of
//!   fixed-size pages and exposes allocate / read / write / sync / close.
//! - [`page`] — a slotted page layout packing variable-length tuples into a
//!   fixed-size byte buffer, with logical delete, slot reuse, and in-page
//!   compaction.
//! - [`buffer`] — a buffer pool caching pages in memory frames, with pinning,
//!   per-page shared/exclusive latching, dirty tracking, and LRU eviction.
//!
//! The [`kv`] module holds the small in-memory key-value engine used by the
//! interactive shell; it is independent of the page/buffer core.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod disk;
pub mod kv;
pub mod page;
