//! Buffer frames: fixed memory regions that host one page at a time.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use quill_common::constants::PAGE_SIZE;
use quill_common::types::PageId;

/// Frame identifier - index into the buffer pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    /// Creates a new frame ID.
    #[inline]
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for FrameId {
    fn from(id: usize) -> Self {
        Self::new(id)
    }
}

/// A frame's byte storage plus its dirty flag.
///
/// The readers-writer lock over the bytes *is* the frame latch: a pin in
/// Shared mode holds a read guard, a pin in Exclusive mode holds a write
/// guard. The dirty flag is atomic because it is set from latch-holding
/// contexts that must not touch the pool mutex.
///
/// Frames are created once at pool construction and live until the pool is
/// dropped. Which page a frame hosts, and how many pins it carries, is pool
/// metadata guarded by the pool mutex (see [`FrameMeta`]).
pub(crate) struct Frame {
    id: FrameId,
    data: RwLock<Box<[u8]>>,
    dirty: AtomicBool,
}

impl Frame {
    /// Creates a new zeroed frame.
    pub(crate) fn new(id: FrameId) -> Self {
        Self {
            id,
            data: RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice()),
            dirty: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> FrameId {
        self.id
    }

    /// The frame latch guarding the page bytes.
    #[inline]
    pub(crate) fn data(&self) -> &RwLock<Box<[u8]>> {
        &self.data
    }

    #[inline]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }
}

/// Per-frame metadata owned by the pool and guarded by the pool mutex.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameMeta {
    /// The resident page; [`PageId::INVALID`] while the frame is free.
    pub page_id: PageId,
    /// Outstanding pins. The frame is evictable only at zero.
    pub pin_count: u32,
}

impl FrameMeta {
    pub(crate) fn empty() -> Self {
        Self {
            page_id: PageId::INVALID,
            pin_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_clean_and_zeroed() {
        let frame = Frame::new(FrameId::new(3));
        assert_eq!(frame.id().index(), 3);
        assert!(!frame.is_dirty());
        assert!(frame.data().read().iter().all(|&b| b == 0));
        assert_eq!(frame.data().read().len(), PAGE_SIZE);
    }

    #[test]
    fn test_dirty_flag() {
        let frame = Frame::new(FrameId::new(0));
        frame.set_dirty(true);
        assert!(frame.is_dirty());
        frame.set_dirty(false);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_empty_meta() {
        let meta = FrameMeta::empty();
        assert!(!meta.page_id.is_valid());
        assert_eq!(meta.pin_count, 0);
    }
}
