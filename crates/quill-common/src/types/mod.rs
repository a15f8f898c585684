//! Core types shared across QuillDB crates.

mod ids;

pub use ids::PageId;
