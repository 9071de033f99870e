//! Integration tests for the LRU-K replacer over buffer pool page keys

use std::sync::Arc;
use std::thread;

use heapdb::buffer::LruKReplacer;
use heapdb::common::{FileId, PageId, PageKey};

fn key(file: u32, page: u32) -> PageKey {
    PageKey::new(FileId(file), PageId::new(page))
}

#[test]
fn test_lru_k_eviction_order() {
    let replacer = LruKReplacer::new(2);

    for i in 0..5 {
        replacer.record_access(key(0, i));
        replacer.set_evictable(key(0, i), true);
    }
    assert_eq!(replacer.size(), 5);

    // One access each (< k), so every page has +inf distance: FIFO
    for i in 0..5 {
        assert_eq!(replacer.evict(), Some(key(0, i)));
    }
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_lru_k_respects_k_distance() {
    let replacer = LruKReplacer::new(2);

    replacer.record_access(key(0, 0));
    replacer.record_access(key(0, 1));
    replacer.record_access(key(0, 1));
    replacer.record_access(key(1, 0));
    replacer.record_access(key(1, 0));

    for k in [key(0, 0), key(0, 1), key(1, 0)] {
        replacer.set_evictable(k, true);
    }

    // +inf first, then the larger finite distance
    assert_eq!(replacer.evict(), Some(key(0, 0)));
    assert_eq!(replacer.evict(), Some(key(0, 1)));
    assert_eq!(replacer.evict(), Some(key(1, 0)));
}

#[test]
fn test_lru_k_non_evictable_pages_stay() {
    let replacer = LruKReplacer::new(2);

    replacer.record_access(key(0, 0));
    replacer.record_access(key(0, 1));
    replacer.record_access(key(0, 2));
    replacer.set_evictable(key(0, 1), true);
    replacer.set_evictable(key(0, 2), true);
    assert_eq!(replacer.size(), 2);

    assert_eq!(replacer.evict(), Some(key(0, 1)));
    assert_eq!(replacer.evict(), Some(key(0, 2)));
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_lru_k_toggle_evictable() {
    let replacer = LruKReplacer::new(2);

    replacer.record_access(key(0, 0));
    replacer.set_evictable(key(0, 0), true);
    assert_eq!(replacer.size(), 1);

    replacer.set_evictable(key(0, 0), false);
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);

    replacer.set_evictable(key(0, 0), true);
    assert_eq!(replacer.evict(), Some(key(0, 0)));
}

#[test]
fn test_lru_k_remove() {
    let replacer = LruKReplacer::new(2);

    replacer.record_access(key(0, 0));
    replacer.record_access(key(0, 1));
    replacer.set_evictable(key(0, 0), true);
    replacer.set_evictable(key(0, 1), true);

    replacer.remove(key(0, 0));
    assert_eq!(replacer.size(), 1);
    assert_eq!(replacer.evict(), Some(key(0, 1)));
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_lru_k_evict_where_skips_rejected() {
    let replacer = LruKReplacer::new(2);

    for i in 0..3 {
        replacer.record_access(key(0, i));
        replacer.set_evictable(key(0, i), true);
    }

    // Stand-in for "page 0 is dirty"
    assert_eq!(replacer.evict_where(|k| k.page_id != PageId::new(0)), Some(key(0, 1)));
    assert_eq!(replacer.evict_where(|k| k.page_id != PageId::new(0)), Some(key(0, 2)));
    assert_eq!(replacer.evict_where(|k| k.page_id != PageId::new(0)), None);
    assert_eq!(replacer.size(), 1);
    assert_eq!(replacer.evict(), Some(key(0, 0)));
}

#[test]
fn test_lru_k_history_limit() {
    let replacer = LruKReplacer::new(2);

    for _ in 0..10 {
        replacer.record_access(key(0, 0));
    }
    replacer.record_access(key(0, 1));
    replacer.record_access(key(0, 1));
    replacer.set_evictable(key(0, 0), true);
    replacer.set_evictable(key(0, 1), true);

    // Only the last k accesses count
    assert_eq!(replacer.evict(), Some(key(0, 0)));
    assert_eq!(replacer.evict(), Some(key(0, 1)));
}

#[test]
fn test_lru_k_concurrent_access() {
    let replacer = Arc::new(LruKReplacer::new(2));

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let replacer = Arc::clone(&replacer);
            thread::spawn(move || {
                for i in 0..25 {
                    replacer.record_access(key(t, i));
                    replacer.set_evictable(key(t, i), true);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(replacer.size(), 100);

    for _ in 0..100 {
        assert!(replacer.evict().is_some());
    }
    assert_eq!(replacer.size(), 0);
}
