//! The disk manager implementation.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use quill_common::constants::PAGE_SIZE;
use quill_common::types::PageId;

use super::error::{DiskError, DiskResult};

/// State guarded by the manager's reader-writer lock.
///
/// Allocation takes the lock exclusively, covering both the zero-page write
/// and the counter increment, so a reader can never observe a `next_page`
/// for which the page does not yet exist on disk. Reads and writes take it
/// shared only to snapshot `next_page` and clone the file handle; the
/// positional I/O itself runs outside the lock.
struct State {
    /// `None` once the manager is closed.
    file: Option<Arc<File>>,
    /// Next page id to allocate; equals `file_length / PAGE_SIZE`.
    next_page: u64,
}

/// Manages page-granular I/O over a single backing file.
///
/// All operations are safe to call from any thread. Writes are not durable
/// until [`sync`](DiskManager::sync).
pub struct DiskManager {
    path: PathBuf,
    state: RwLock<State>,
    /// Reused buffer of zeros written out by every allocation.
    zero_page: Box<[u8]>,
}

impl DiskManager {
    /// Opens the backing file at `path`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or if its length is not a multiple
    /// of the page size.
    pub fn open(path: impl AsRef<Path>) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| DiskError::Open {
                path: path.clone(),
                source,
            })?;

        let size = file
            .metadata()
            .map_err(|source| DiskError::Open {
                path: path.clone(),
                source,
            })?
            .len();

        if size % PAGE_SIZE as u64 != 0 {
            return Err(DiskError::Misaligned {
                path,
                size,
                page_size: PAGE_SIZE,
            });
        }

        Ok(Self {
            path,
            state: RwLock::new(State {
                file: Some(Arc::new(file)),
                next_page: size / PAGE_SIZE as u64,
            }),
            zero_page: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of pages allocated so far.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        self.state.read().next_page
    }

    /// Extends the file by one zeroed page and returns its id.
    ///
    /// Ids are handed out densely from 0 upward. Concurrent allocations are
    /// serialized: each returns a distinct consecutive id with its zero page
    /// already written.
    ///
    /// # Errors
    ///
    /// Fails if the manager is closed or the zero-page write fails.
    pub fn allocate_page(&self) -> DiskResult<PageId> {
        let mut state = self.state.write();
        let file = state.file.clone().ok_or(DiskError::Closed)?;

        let page_id = PageId::new(state.next_page);
        file.write_all_at(&self.zero_page, page_id.offset())
            .map_err(|e| DiskError::io("allocate", page_id, e))?;
        state.next_page += 1;

        Ok(page_id)
    }

    /// Reads exactly one page into `buf`.
    ///
    /// # Errors
    ///
    /// Fails if `buf` is not page-sized, `page_id` has not been allocated,
    /// the manager is closed, or the read comes up short.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        let file = self.checked_handle(page_id, buf.len())?;

        file.read_exact_at(buf, page_id.offset()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DiskError::ShortRead { page_id }
            } else {
                DiskError::io("read", page_id, e)
            }
        })
    }

    /// Writes exactly one page from `buf`.
    ///
    /// Does not imply durability; call [`sync`](DiskManager::sync) for that.
    ///
    /// # Errors
    ///
    /// Fails if `buf` is not page-sized, `page_id` has not been allocated,
    /// the manager is closed, or the write fails.
    pub fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()> {
        let file = self.checked_handle(page_id, buf.len())?;

        file.write_all_at(buf, page_id.offset())
            .map_err(|e| DiskError::io("write", page_id, e))
    }

    /// Flushes OS buffers for the file to durable storage.
    ///
    /// # Errors
    ///
    /// Fails if the manager is closed or the fsync fails.
    pub fn sync(&self) -> DiskResult<()> {
        let file = {
            let state = self.state.read();
            state.file.clone().ok_or(DiskError::Closed)?
        };
        file.sync_all().map_err(|source| DiskError::Sync { source })
    }

    /// Releases the file handle. Subsequent operations fail with
    /// [`DiskError::Closed`].
    ///
    /// Does not flush; callers wanting durability sync first.
    ///
    /// # Errors
    ///
    /// Fails if the manager was already closed.
    pub fn close(&self) -> DiskResult<()> {
        let mut state = self.state.write();
        state.file.take().ok_or(DiskError::Closed)?;
        Ok(())
    }

    /// Bounds-checks an access and snapshots the file handle, releasing the
    /// state lock before the caller performs positional I/O.
    fn checked_handle(&self, page_id: PageId, buf_len: usize) -> DiskResult<Arc<File>> {
        if buf_len != PAGE_SIZE {
            return Err(DiskError::WrongBufferSize {
                expected: PAGE_SIZE,
                actual: buf_len,
            });
        }

        let state = self.state.read();
        let file = state.file.clone().ok_or(DiskError::Closed)?;
        if page_id.as_u64() >= state.next_page {
            return Err(DiskError::PageOutOfBounds {
                page_id,
                allocated: state.next_page,
            });
        }
        Ok(file)
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("path", &self.path)
            .field("page_count", &self.page_count())
            .finish()
    }
}
