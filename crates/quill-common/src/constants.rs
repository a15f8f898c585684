//! System-wide constants for QuillDB.

// =============================================================================
// Page geometry
// =============================================================================

/// Page size in bytes (4 KB).
///
/// The backing file is a dense array of pages of exactly this size, and every
/// buffer-pool frame hosts exactly one page. The file length is always a
/// multiple of this value.
pub const PAGE_SIZE: usize = 4 * 1024;

// =============================================================================
// Slotted page layout
// =============================================================================

/// Slotted page header size in bytes.
///
/// The header contains: slot_count (2), free_space_pointer (2) = 4 bytes.
pub const SLOTTED_HEADER_SIZE: usize = 4;

/// Slot size in the page slot directory.
///
/// Each slot packs offset (15 bits), length (15 bits), and flags (2 bits)
/// into a single little-endian u32.
pub const SLOT_SIZE: usize = 4;

/// Largest buffer a slotted page can address.
///
/// Offsets and lengths are 15-bit fields, so pages beyond 32767 bytes cannot
/// be represented.
pub const MAX_SLOTTED_PAGE_SIZE: usize = 0x7FFF;
