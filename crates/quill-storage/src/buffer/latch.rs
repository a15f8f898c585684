//! Page pins: RAII handles that bundle one pin and one latch acquisition.

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use quill_common::types::PageId;

use super::frame::FrameId;
use super::pool::BufferPool;

/// The mode a page latch is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMode {
    /// Any number of shared holders may coexist; none may mutate the bytes.
    Shared,
    /// A single holder with mutable access to the bytes.
    Exclusive,
}

/// The held frame latch, in either mode.
pub(crate) enum LatchGuard<'a> {
    Shared(RwLockReadGuard<'a, Box<[u8]>>),
    Exclusive(RwLockWriteGuard<'a, Box<[u8]>>),
}

/// A pinned page.
///
/// The handle carries exactly one unit of pin and one instance of the frame
/// latch in its mode. While it exists, the frame cannot be evicted and the
/// latch excludes conflicting access. Dropping the handle (or calling
/// [`unpin`](PagePin::unpin)) releases the latch, decrements the pin count,
/// and hands the frame to the replacer once no pins remain.
///
/// The pin is not `Clone`: releasing happens exactly once, and the borrow
/// checker prevents use after release.
pub struct PagePin<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    frame_id: FrameId,
    mode: LatchMode,
    /// `Some` for the whole life of the pin; taken only in `drop` so the
    /// latch is released before the pool metadata is touched.
    guard: Option<LatchGuard<'a>>,
}

impl<'a> PagePin<'a> {
    pub(crate) fn new(
        pool: &'a BufferPool,
        page_id: PageId,
        frame_id: FrameId,
        mode: LatchMode,
        guard: LatchGuard<'a>,
    ) -> Self {
        Self {
            pool,
            page_id,
            frame_id,
            mode,
            guard: Some(guard),
        }
    }

    /// Returns the pinned page's id.
    #[inline]
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the latch mode this pin was taken in.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> LatchMode {
        self.mode
    }

    /// Returns the page bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self.guard() {
            LatchGuard::Shared(g) => &g[..],
            LatchGuard::Exclusive(g) => &g[..],
        }
    }

    /// Returns the page bytes mutably.
    ///
    /// # Panics
    ///
    /// Panics if the pin was taken in [`LatchMode::Shared`]: shared holders
    /// may be reading the same bytes.
    #[must_use]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match self
            .guard
            .as_mut()
            .expect("page pin used after release")
        {
            LatchGuard::Exclusive(g) => &mut g[..],
            LatchGuard::Shared(_) => panic!("cannot mutate page bytes through a shared pin"),
        }
    }

    /// Records that the page bytes have been modified, so the frame is
    /// written back before eviction or on the next flush.
    ///
    /// Call only while holding an Exclusive pin.
    pub fn mark_dirty(&self) {
        debug_assert_eq!(self.mode, LatchMode::Exclusive);
        self.pool.frame(self.frame_id).set_dirty(true);
    }

    /// Releases the pin: the latch is dropped, the pin count decremented,
    /// and the frame becomes an eviction candidate if no pins remain.
    ///
    /// Equivalent to dropping the handle; spelled out for call sites where
    /// the release is the point.
    pub fn unpin(self) {
        // Drop runs the release.
    }

    fn guard(&self) -> &LatchGuard<'a> {
        // Only `drop` takes the guard, and the pin is gone afterwards.
        self.guard.as_ref().expect("page pin used after release")
    }
}

impl Drop for PagePin<'_> {
    fn drop(&mut self) {
        // Latch first, pool metadata second: a latch holder must never wait
        // on the pool mutex.
        self.guard.take();
        self.pool.release_pin(self.frame_id);
    }
}

impl std::fmt::Debug for PagePin<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagePin")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame_id)
            .field("mode", &self.mode)
            .finish()
    }
}
