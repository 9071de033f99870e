use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};

use crate::common::{
    FileId, HeapDbError, PageId, PageKey, Permission, Result, TransactionId,
    DEFAULT_BUFFER_POOL_SIZE, DEFAULT_LRUK_K,
};
use crate::storage::page::HeapPage;
use crate::storage::DbFile;

use super::{LruKReplacer, PageLockState};

/// Shared handle to a resident page. Never hold its guard across a call
/// into the pool.
pub type PageRef = Arc<RwLock<HeapPage>>;

type PageLock = Arc<Mutex<PageLockState>>;

/// Everything guarded by the pool-wide mutex
struct PoolState {
    /// Resident pages
    pages: HashMap<PageKey, PageRef>,
    /// Lock table; entries are dropped once no transaction holds them
    page_locks: HashMap<PageKey, PageLock>,
    /// Transactions that have begun and not yet committed or aborted
    running: HashSet<TransactionId>,
    /// Open files, so evictions and commits can write pages back
    files: HashMap<FileId, Weak<dyn DbFile>>,
}

impl PoolState {
    fn owning_file(&self, key: &PageKey) -> Option<Arc<dyn DbFile>> {
        self.files.get(&key.file_id).and_then(Weak::upgrade)
    }

    fn release_locks(&mut self, tid: TransactionId) {
        self.page_locks.retain(|_, entry| {
            let mut lock = entry.lock();
            lock.release(tid);
            if lock.is_free() {
                lock.retire();
                false
            } else {
                true
            }
        });
    }
}

/// BufferPool caches a bounded number of heap pages and mediates every page
/// access.
///
/// Pages are locked per transaction with shared/exclusive locks that are held
/// until commit or abort (strict two-phase locking, no waiting). Dirty pages
/// never leave memory before their transaction commits (NO-STEAL), and commit
/// writes every page the transaction dirtied (FORCE), so abort only has to
/// re-read the on-disk images.
pub struct BufferPool {
    /// Maximum number of resident pages
    capacity: usize,
    state: Mutex<PoolState>,
    /// Chooses eviction victims among clean pages
    replacer: LruKReplacer<PageKey>,
}

impl BufferPool {
    /// Creates a pool holding at most `capacity` pages, using LRU-2 replacement.
    pub fn new(capacity: usize) -> Self {
        Self::with_lru_k(capacity, DEFAULT_LRUK_K)
    }

    pub fn with_lru_k(capacity: usize, k: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(PoolState {
                pages: HashMap::new(),
                page_locks: HashMap::new(),
                running: HashSet::new(),
                files: HashMap::new(),
            }),
            replacer: LruKReplacer::new(k),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_resident_pages(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_resident(&self, key: PageKey) -> bool {
        self.state.lock().pages.contains_key(&key)
    }

    /// Makes `file` known to the pool so its pages can be written back.
    /// The pool only keeps a weak handle.
    pub fn register_file(&self, file: &Arc<dyn DbFile>) {
        self.state
            .lock()
            .files
            .insert(file.file_id(), Arc::downgrade(file));
    }

    /// Drops every resident page of a file that is going away.
    pub fn forget_file(&self, file_id: FileId) {
        let mut state = self.state.lock();
        state.files.remove(&file_id);
        let keys: Vec<PageKey> = state
            .pages
            .keys()
            .filter(|k| k.file_id == file_id)
            .copied()
            .collect();
        for key in keys {
            state.pages.remove(&key);
            self.replacer.remove(key);
        }
        debug!("forgot pages of {}", file_id);
    }

    pub fn begin_transaction(&self, tid: TransactionId) -> Result<()> {
        let mut state = self.state.lock();
        if !state.running.insert(tid) {
            return Err(HeapDbError::TransactionAlreadyRunning(tid));
        }
        debug!("began {}", tid);
        Ok(())
    }

    pub fn is_running(&self, tid: TransactionId) -> bool {
        self.state.lock().running.contains(&tid)
    }

    /// True if `tid` holds at least `perm` on `key`.
    pub fn holds_lock(&self, key: PageKey, tid: TransactionId, perm: Permission) -> bool {
        let entry = self.state.lock().page_locks.get(&key).cloned();
        entry.map_or(false, |lock| lock.lock().holds(tid, perm))
    }

    /// Returns page `page_id` of `file`, locked for `tid` with `perm`.
    ///
    /// Fails with `LockUnavailable` if another transaction holds a conflicting
    /// lock, and with `BufferPoolFull` if the page must be read in but every
    /// resident page is dirty or still handed out.
    pub fn get_page(
        &self,
        file: &dyn DbFile,
        page_id: PageId,
        tid: TransactionId,
        perm: Permission,
    ) -> Result<PageRef> {
        let key = PageKey::new(file.file_id(), page_id);
        self.acquire_lock(key, tid, perm)?;

        let mut state = self.state.lock();
        if let Some(page) = state.pages.get(&key) {
            let page = Arc::clone(page);
            self.replacer.record_access(key);
            trace!("{} hit {} ({:?})", tid, key, perm);
            return Ok(page);
        }

        self.make_room(&mut state)?;
        let page = file.read_page(page_id)?;
        trace!("{} read {} from disk ({:?})", tid, key, perm);
        Ok(self.install(&mut state, key, page))
    }

    /// Caches a page that was just appended to `file`, write-locked for `tid`.
    pub fn insert_page(
        &self,
        file: &dyn DbFile,
        page: HeapPage,
        tid: TransactionId,
    ) -> Result<PageRef> {
        let key = PageKey::new(file.file_id(), page.page_id());
        self.acquire_lock(key, tid, Permission::Write)?;

        let mut state = self.state.lock();
        if let Some(existing) = state.pages.get(&key) {
            let existing = Arc::clone(existing);
            *existing.write() = page;
            self.replacer.record_access(key);
            return Ok(existing);
        }
        self.make_room(&mut state)?;
        Ok(self.install(&mut state, key, page))
    }

    /// Writes every dirty resident page to disk and marks it clean.
    ///
    /// This ignores transaction boundaries, so it must not run while other
    /// transactions are modifying pages.
    pub fn flush_all_pages(&self) -> Result<()> {
        let state = self.state.lock();
        for (key, page) in state.pages.iter() {
            let mut guard = page.write();
            if !guard.is_dirty() {
                continue;
            }
            match state.owning_file(key) {
                Some(file) => file.flush_page(&mut guard)?,
                None => warn!("dropping dirty page {} of a closed file", key),
            }
        }
        Ok(())
    }

    /// Forces the pages `tid` dirtied to disk, then releases its locks.
    pub fn commit_transaction(&self, tid: TransactionId) -> Result<()> {
        let mut state = self.state.lock();
        let mut flushed = 0;
        for (key, page) in state.pages.iter() {
            let mut guard = page.write();
            if !guard.is_dirty() || guard.dirtied_by() != Some(tid) {
                continue;
            }
            match state.owning_file(key) {
                Some(file) => {
                    file.flush_page(&mut guard)?;
                    flushed += 1;
                }
                None => warn!("{} dirtied {} of a closed file", tid, key),
            }
        }
        state.release_locks(tid);
        state.running.remove(&tid);
        debug!("committed {} ({} pages flushed)", tid, flushed);
        Ok(())
    }

    /// Restores the on-disk image of every page `tid` dirtied, then releases
    /// its locks.
    pub fn abort_transaction(&self, tid: TransactionId) -> Result<()> {
        let mut state = self.state.lock();
        let mut restored = 0;
        for (key, page) in state.pages.iter() {
            let mut guard = page.write();
            if !guard.is_dirty() || guard.dirtied_by() != Some(tid) {
                continue;
            }
            match state.owning_file(key) {
                Some(file) => {
                    *guard = file.read_page(key.page_id)?;
                    restored += 1;
                }
                None => guard.mark_clean(),
            }
        }
        state.release_locks(tid);
        state.running.remove(&tid);
        debug!("aborted {} ({} pages restored)", tid, restored);
        Ok(())
    }

    /// Grants `perm` on `key` to `tid` without waiting.
    fn acquire_lock(&self, key: PageKey, tid: TransactionId, perm: Permission) -> Result<()> {
        loop {
            let entry = {
                let mut state = self.state.lock();
                Arc::clone(
                    state
                        .page_locks
                        .entry(key)
                        .or_insert_with(|| Arc::new(Mutex::new(PageLockState::new()))),
                )
            };
            let mut lock = entry.lock();
            if lock.is_retired() {
                // Released and dropped from the table since we looked it up
                continue;
            }
            return if lock.try_acquire(tid, perm) {
                Ok(())
            } else {
                Err(HeapDbError::LockUnavailable {
                    page: key.page_id,
                    tid,
                })
            };
        }
    }

    /// Evicts clean pages that nobody holds a handle to until there is room
    /// for one more.
    fn make_room(&self, state: &mut PoolState) -> Result<()> {
        while state.pages.len() >= self.capacity {
            let pages = &state.pages;
            let victim = self
                .replacer
                .evict_where(|key| {
                    pages.get(key).map_or(true, |p| {
                        // Handles are only cloned under the pool mutex, so an
                        // unshared page cannot gain a holder while we evict it
                        Arc::strong_count(p) == 1
                            && p.try_read().map_or(false, |g| !g.is_dirty())
                    })
                })
                .ok_or(HeapDbError::BufferPoolFull)?;

            let Some(page) = state.pages.remove(&victim) else {
                continue;
            };
            let mut guard = page.write();
            if let Some(file) = state.owning_file(&victim) {
                if let Err(e) = file.flush_page(&mut guard) {
                    drop(guard);
                    self.restore(state, victim, page);
                    return Err(e);
                }
            }
            debug!("evicted {}", victim);
        }
        Ok(())
    }

    fn restore(&self, state: &mut PoolState, key: PageKey, page: PageRef) {
        state.pages.insert(key, page);
        self.replacer.record_access(key);
        self.replacer.set_evictable(key, true);
    }

    fn install(&self, state: &mut PoolState, key: PageKey, page: HeapPage) -> PageRef {
        let page = Arc::new(RwLock::new(page));
        self.restore(state, key, Arc::clone(&page));
        page
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_POOL_SIZE)
    }
}
