//! Cross-thread tests for the buffer pool and disk manager.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use quill_common::constants::PAGE_SIZE;
use quill_common::types::PageId;
use quill_storage::buffer::{BufferError, BufferPool, LatchMode, LruReplacer, PagePin};
use quill_storage::disk::DiskManager;

fn new_pool(dir: &tempfile::TempDir, size: usize) -> Arc<BufferPool> {
    let disk = DiskManager::open(dir.path().join("test.db")).unwrap();
    Arc::new(BufferPool::new(Box::new(LruReplacer::new()), disk, size))
}

/// Fetches a page, retrying while every frame is pinned by other threads.
/// A full pool is a recoverable condition, not a failure.
fn fetch_with_retry(pool: &BufferPool, page_id: PageId, mode: LatchMode) -> PagePin<'_> {
    loop {
        match pool.fetch_page(page_id, mode) {
            Ok(pin) => return pin,
            Err(BufferError::PoolFull) => thread::yield_now(),
            Err(e) => panic!("fetch failed: {e}"),
        }
    }
}

/// Fills a page with random bytes and a trailing crc32 of them.
fn write_test_data(page: &mut [u8], rng: &mut impl rand::RngCore) {
    let split = PAGE_SIZE - 4;
    rng.fill_bytes(&mut page[..split]);
    let sum = crc32fast::hash(&page[..split]);
    page[split..].copy_from_slice(&sum.to_be_bytes());
}

/// Verifies the trailing crc32 of a page written by `write_test_data`.
fn check_test_data(page: &[u8]) {
    let split = PAGE_SIZE - 4;
    let stored = u32::from_be_bytes(page[split..].try_into().unwrap());
    assert_eq!(stored, crc32fast::hash(&page[..split]), "torn page observed");
}

#[test]
fn concurrent_fetch_unpin_across_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pool = new_pool(&dir, 10);

    let page_ids: Vec<PageId> = (0..5)
        .map(|_| {
            let pin = pool.new_page().unwrap();
            pin.page_id()
        })
        .collect();

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let pool = Arc::clone(&pool);
            let page_id = page_ids[i % page_ids.len()];
            thread::spawn(move || {
                let pin = pool.fetch_page(page_id, LatchMode::Shared).unwrap();
                let _ = pin.bytes();
                pin.unpin();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    pool.close().unwrap();
}

#[test]
fn exclusive_access_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let pool = new_pool(&dir, 5);

    let page_id = {
        let pin = pool.new_page().unwrap();
        pin.page_id()
    };

    // Shared readers and exclusive writers hammer one page; a counter
    // incremented under the exclusive latch must never see company.
    let active_writers = Arc::new(AtomicI32::new(0));
    let mut handles = Vec::new();

    for _ in 0..10 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..20 {
                let pin = pool.fetch_page(page_id, LatchMode::Shared).unwrap();
                let _ = pin.bytes();
            }
        }));
    }

    for _ in 0..3 {
        let pool = Arc::clone(&pool);
        let active_writers = Arc::clone(&active_writers);
        handles.push(thread::spawn(move || {
            for _ in 0..20 {
                let mut pin = pool.fetch_page(page_id, LatchMode::Exclusive).unwrap();
                let current = active_writers.fetch_add(1, Ordering::SeqCst) + 1;
                assert_eq!(current, 1, "two exclusive holders at once");

                let current_value = pin.bytes()[0];
                pin.bytes_mut()[0] = current_value.wrapping_add(1);
                pin.mark_dirty();

                active_writers.fetch_sub(1, Ordering::SeqCst);
                pin.unpin();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    pool.close().unwrap();
}

#[test]
fn fetch_and_flush_race() {
    let dir = tempfile::tempdir().unwrap();
    let pool = new_pool(&dir, 10);

    let page_ids: Vec<PageId> = (0..3)
        .map(|_| {
            let pin = pool.new_page().unwrap();
            pin.mark_dirty();
            pin.page_id()
        })
        .collect();

    let mut handles = Vec::new();

    for _ in 0..10 {
        let pool = Arc::clone(&pool);
        let page_ids = page_ids.clone();
        handles.push(thread::spawn(move || {
            for j in 0..20 {
                let page_id = page_ids[j % page_ids.len()];
                let pin = pool.fetch_page(page_id, LatchMode::Shared).unwrap();
                let _ = pin.bytes();
            }
        }));
    }

    for _ in 0..3 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                pool.flush_all_pages().unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    pool.close().unwrap();
}

#[test]
fn new_page_and_flush_race() {
    let dir = tempfile::tempdir().unwrap();
    let pool = new_pool(&dir, 20);

    let mut handles = Vec::new();

    for _ in 0..5 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                let pin = pool.new_page().unwrap();
                pin.mark_dirty();
                pin.unpin();
            }
        }));
    }

    for _ in 0..3 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..15 {
                pool.flush_all_pages().unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    pool.close().unwrap();
}

#[test]
fn reader_writer_flusher_chaos() {
    const NUM_PAGES: usize = 10;
    const READERS: usize = 50;
    const WRITERS: usize = 50;
    const FLUSHERS: usize = 10;

    let dir = tempfile::tempdir().unwrap();
    let pool = new_pool(&dir, NUM_PAGES);

    // Phase 1: allocate the working set, each page checksummed.
    let page_ids: Vec<PageId> = (0..NUM_PAGES)
        .map(|_| {
            let mut rng = rand::thread_rng();
            let mut pin = pool.new_page().unwrap();
            write_test_data(pin.bytes_mut(), &mut rng);
            pin.mark_dirty();
            pin.page_id()
        })
        .collect();

    // Phase 2: readers verify checksums, writers rewrite whole pages,
    // flushers write everything back, all at once.
    let barrier = Arc::new(Barrier::new(READERS + WRITERS + FLUSHERS));
    let mut handles = Vec::new();

    for i in 0..READERS {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        let page_id = page_ids[i % NUM_PAGES];
        handles.push(thread::spawn(move || {
            barrier.wait();
            let pin = fetch_with_retry(&pool, page_id, LatchMode::Shared);
            check_test_data(pin.bytes());
        }));
    }

    for i in 0..WRITERS {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        let page_id = page_ids[i % NUM_PAGES];
        handles.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            barrier.wait();
            let mut pin = fetch_with_retry(&pool, page_id, LatchMode::Exclusive);
            write_test_data(pin.bytes_mut(), &mut rng);
            pin.mark_dirty();
        }));
    }

    for _ in 0..FLUSHERS {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            pool.flush_all_pages().unwrap();
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // Everything settled: every page must carry a consistent checksum.
    for &page_id in &page_ids {
        let pin = pool.fetch_page(page_id, LatchMode::Shared).unwrap();
        check_test_data(pin.bytes());
    }
    pool.close().unwrap();
}

#[test]
fn eviction_pressure_preserves_contents() {
    let dir = tempfile::tempdir().unwrap();
    // Far more pages than frames, so fetches constantly evict.
    let pool = new_pool(&dir, 2);

    let page_ids: Vec<PageId> = (0..8)
        .map(|i| {
            let mut pin = pool.new_page().unwrap();
            pin.bytes_mut().fill(i as u8);
            pin.mark_dirty();
            pin.page_id()
        })
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let page_ids = page_ids.clone();
            thread::spawn(move || {
                for round in 0..10 {
                    let page_id = page_ids[round % page_ids.len()];
                    let pin = fetch_with_retry(&pool, page_id, LatchMode::Shared);
                    let expected = page_id.as_u64() as u8;
                    assert!(pin.bytes().iter().all(|&b| b == expected));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    pool.close().unwrap();
}
