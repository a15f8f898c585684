//! The buffer pool implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use quill_common::types::PageId;

use super::error::{BufferError, BufferResult};
use super::eviction::Replacer;
use super::frame::{Frame, FrameId, FrameMeta};
use super::latch::{LatchGuard, LatchMode, PagePin};
use super::BufferPoolStats;
use crate::disk::DiskManager;

/// Metadata guarded by the single pool mutex: the page table, the free-frame
/// stack, per-frame page/pin bookkeeping, and the replacer.
///
/// Critical sections stay short — index lookups, counter updates, replacer
/// calls, and the write-back of an unpinned eviction victim. Frame latches
/// are only ever acquired after this mutex is released (the one exception,
/// reading an unpinned victim's bytes during eviction, cannot block because
/// no pin means no latch holder).
struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_frames: Vec<FrameId>,
    metas: Vec<FrameMeta>,
    replacer: Box<dyn Replacer>,
}

/// A fixed-size cache of pages in memory.
///
/// The pool owns an array of frames created once at construction, resolves
/// page identity to frame identity, reads through to the disk manager on
/// miss, writes dirty frames back on eviction, and issues [`PagePin`]
/// handles that carry a shared or exclusive latch until released.
pub struct BufferPool {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    disk: DiskManager,
    fetches: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    flushes: AtomicU64,
}

impl BufferPool {
    /// Creates a pool of `size` frames over `disk`, delegating eviction
    /// choice to `replacer`.
    #[must_use]
    pub fn new(replacer: Box<dyn Replacer>, disk: DiskManager, size: usize) -> Self {
        let frames = (0..size).map(|i| Frame::new(FrameId::new(i))).collect();
        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(size),
                free_frames: (0..size).map(FrameId::new).collect(),
                metas: vec![FrameMeta::empty(); size],
                replacer,
            }),
            disk,
            fetches: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn size(&self) -> usize {
        self.frames.len()
    }

    /// Allocates a new page on disk, loads it into a frame, and returns an
    /// Exclusive pin on it.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::PoolFull`] if every frame is pinned, or
    /// with a disk error from allocation, read-through, or the write-back
    /// of an evicted dirty page.
    pub fn new_page(&self) -> BufferResult<PagePin<'_>> {
        let mut state = self.state.lock();

        let frame_id = self.find_free_frame(&mut state)?;
        let page_id = match self.disk.allocate_page() {
            Ok(id) => id,
            Err(e) => {
                state.free_frames.push(frame_id);
                return Err(e.into());
            }
        };
        if let Err(e) = self.read_into_frame(page_id, frame_id) {
            state.free_frames.push(frame_id);
            return Err(e);
        }
        self.install(&mut state, page_id, frame_id);

        drop(state);
        let guard = self.acquire_latch(frame_id, LatchMode::Exclusive);
        Ok(PagePin::new(
            self,
            page_id,
            frame_id,
            LatchMode::Exclusive,
            guard,
        ))
    }

    /// Returns a pin on `page_id` in the requested latch mode, reading the
    /// page from disk if it is not resident.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::PoolFull`] if a frame is needed and every
    /// frame is pinned, or with a disk error from read-through or eviction
    /// write-back.
    pub fn fetch_page(&self, page_id: PageId, mode: LatchMode) -> BufferResult<PagePin<'_>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            state.metas[frame_id.index()].pin_count += 1;
            state.replacer.pin(frame_id);
            drop(state);

            self.hits.fetch_add(1, Ordering::Relaxed);
            let guard = self.acquire_latch(frame_id, mode);
            return Ok(PagePin::new(self, page_id, frame_id, mode, guard));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.find_free_frame(&mut state)?;
        if let Err(e) = self.read_into_frame(page_id, frame_id) {
            state.free_frames.push(frame_id);
            return Err(e);
        }
        self.install(&mut state, page_id, frame_id);

        drop(state);
        let guard = self.acquire_latch(frame_id, mode);
        Ok(PagePin::new(self, page_id, frame_id, mode, guard))
    }

    /// Writes every dirty frame through the disk manager and clears the
    /// flags. Does not sync.
    ///
    /// # Errors
    ///
    /// Returns the first write failure; remaining frames keep their dirty
    /// flags.
    pub fn flush_all_pages(&self) -> BufferResult<()> {
        let state = self.state.lock();

        for frame in &self.frames {
            if !frame.is_dirty() {
                continue;
            }
            let page_id = state.metas[frame.id().index()].page_id;
            // A dirty frame is always mapped. The read latch may wait for a
            // writer to release; latch holders never wait on the pool mutex,
            // so this cannot deadlock.
            let data = frame.data().read();
            self.disk.write_page(page_id, &data)?;
            frame.set_dirty(false);
            self.flushes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Flushes all pages, syncs the file, and closes the disk manager.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; later steps do not run.
    pub fn close(&self) -> BufferResult<()> {
        self.flush_all_pages()?;
        self.disk.sync()?;
        self.disk.close()?;
        Ok(())
    }

    /// Returns a snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> BufferPoolStats {
        BufferPoolStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }

    // -------------------------------------------------------------------------
    // Crate-internal plumbing
    // -------------------------------------------------------------------------

    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.index()]
    }

    /// Called by a dropping [`PagePin`], after it released its latch.
    pub(crate) fn release_pin(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        let index = frame_id.index();
        debug_assert!(state.metas[index].pin_count > 0, "unpin without a pin");
        state.metas[index].pin_count -= 1;
        if state.metas[index].pin_count == 0 {
            state.replacer.unpin(frame_id);
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Pops a free frame, or evicts the replacer's victim (writing it back
    /// first if dirty). Caller holds the pool mutex.
    fn find_free_frame(&self, state: &mut PoolState) -> BufferResult<FrameId> {
        if let Some(frame_id) = state.free_frames.pop() {
            return Ok(frame_id);
        }

        let victim = state.replacer.evict().ok_or(BufferError::PoolFull)?;
        let frame = &self.frames[victim.index()];
        let old_page = state.metas[victim.index()].page_id;

        if frame.is_dirty() {
            // The victim is unpinned, so its latch has no holder.
            let data = frame.data().read();
            if let Err(e) = self.disk.write_page(old_page, &data) {
                drop(data);
                // Keep the victim evictable so the page is not stranded.
                state.replacer.unpin(victim);
                return Err(e.into());
            }
            frame.set_dirty(false);
        }

        state.page_table.remove(&old_page);
        self.evictions.fetch_add(1, Ordering::Relaxed);
        Ok(victim)
    }

    /// Reads `page_id` from disk into the frame's data window. The frame is
    /// free (unmapped and unpinned), so the write latch is uncontended.
    fn read_into_frame(&self, page_id: PageId, frame_id: FrameId) -> BufferResult<()> {
        let mut data = self.frames[frame_id.index()].data().write();
        self.disk.read_page(page_id, &mut data)?;
        Ok(())
    }

    /// Maps `page_id` to `frame_id` with a single pin. Caller holds the
    /// pool mutex.
    fn install(&self, state: &mut PoolState, page_id: PageId, frame_id: FrameId) {
        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);
        state.metas[frame_id.index()] = FrameMeta {
            page_id,
            pin_count: 1,
        };
    }

    fn acquire_latch(&self, frame_id: FrameId, mode: LatchMode) -> LatchGuard<'_> {
        let frame = &self.frames[frame_id.index()];
        match mode {
            LatchMode::Shared => LatchGuard::Shared(frame.data().read()),
            LatchMode::Exclusive => LatchGuard::Exclusive(frame.data().write()),
        }
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BufferPool")
            .field("size", &self.frames.len())
            .field("pages_resident", &state.page_table.len())
            .field("free_frames", &state.free_frames.len())
            .finish()
    }
}
