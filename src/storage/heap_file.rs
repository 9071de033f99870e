use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use tempfile::{NamedTempFile, TempPath};

use crate::buffer::{BufferPool, PageRef};
use crate::common::{
    FileId, HeapDbError, PageId, Permission, RecordId, Result, SlotId, TransactionId, PAGE_SIZE,
};
use crate::storage::disk::DiskManager;
use crate::storage::page::HeapPage;
use crate::tuple::{Tuple, TupleDesc};

use super::{load_from_csv, CsvOptions, DbFile};

/// An unordered collection of tuples stored in fixed-size heap pages.
///
/// All page access goes through the buffer pool; the file itself only knows
/// how to move page images between memory and disk.
pub struct HeapFile {
    file_id: FileId,
    desc: Arc<TupleDesc>,
    disk: DiskManager,
    pool: Arc<BufferPool>,
    /// Serializes appends so concurrent inserts never hand out the same page id
    append_latch: Mutex<()>,
    /// Never read; it deletes the backing file of a temporary heap file when
    /// dropped, after `disk`
    _temp_path: Option<TempPath>,
}

impl HeapFile {
    /// Opens (or creates) the heap file at `path` and registers it with `pool`.
    /// Existing pages are read lazily.
    pub fn open<P: AsRef<Path>>(
        path: P,
        desc: Arc<TupleDesc>,
        pool: Arc<BufferPool>,
    ) -> Result<Arc<Self>> {
        Self::create(DiskManager::new(path)?, desc, pool, None)
    }

    /// Creates a heap file backed by a fresh temporary file that is removed
    /// when the heap file is dropped.
    pub fn temporary(desc: Arc<TupleDesc>, pool: Arc<BufferPool>) -> Result<Arc<Self>> {
        let temp_path = NamedTempFile::new()?.into_temp_path();
        let disk = DiskManager::new(&temp_path)?;
        Self::create(disk, desc, pool, Some(temp_path))
    }

    fn create(
        disk: DiskManager,
        desc: Arc<TupleDesc>,
        pool: Arc<BufferPool>,
        temp_path: Option<TempPath>,
    ) -> Result<Arc<Self>> {
        desc.check_storable()?;
        let file = Arc::new(Self {
            file_id: FileId::next(),
            desc,
            disk,
            pool,
            append_latch: Mutex::new(()),
            _temp_path: temp_path,
        });
        let handle: Arc<dyn DbFile> = file.clone();
        file.pool.register_file(&handle);
        debug!(
            "opened {} at {} with {} pages",
            file.file_id,
            file.backing_file().display(),
            file.num_pages()
        );
        Ok(file)
    }

    pub fn descriptor(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn num_pages(&self) -> usize {
        self.disk.num_pages() as usize
    }

    /// Path of the file holding this heap file's pages.
    pub fn backing_file(&self) -> &Path {
        self.disk.db_path()
    }

    /// Page writes issued to the backing file since it was opened.
    pub fn num_disk_writes(&self) -> u32 {
        self.disk.num_writes()
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Iterates over every live tuple, page by page, in slot order.
    /// Pages are read-locked for `tid`.
    pub fn scan(&self, tid: TransactionId) -> HeapScan<'_> {
        HeapScan {
            file: self,
            tid,
            page_no: 0,
            slot: 0,
            current: None,
            done: false,
        }
    }

    /// Appends the rows of a delimited text source. Returns the number of
    /// tuples loaded.
    pub fn load_from_csv<R: BufRead>(&self, reader: R, options: &CsvOptions) -> Result<usize> {
        load_from_csv(self, reader, options)
    }

    /// Writes a new empty page to disk and caches it holding `tuple`.
    fn append_page_with(&self, tuple: Tuple, tid: TransactionId) -> Result<RecordId> {
        let _latch = self.append_latch.lock();

        let next = PageId::new(self.disk.num_pages());
        let empty = HeapPage::new(self.desc.clone(), next, self.file_id);
        let page_id = self.disk.append_page(&empty.to_bytes()?)?;

        let mut page = HeapPage::new(self.desc.clone(), page_id, self.file_id);
        let rid = page.insert_tuple(tuple)?;
        page.set_dirty(tid, true);
        self.pool.insert_page(self, page, tid)?;

        debug!("{} appended {} to {}", tid, page_id, self.file_id);
        Ok(rid)
    }
}

impl DbFile for HeapFile {
    fn file_id(&self) -> FileId {
        self.file_id
    }

    fn descriptor(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    fn num_pages(&self) -> usize {
        HeapFile::num_pages(self)
    }

    fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        let mut data = vec![0u8; PAGE_SIZE];
        self.disk.read_page(page_id, &mut data)?;
        HeapPage::from_bytes(self.desc.clone(), page_id, self.file_id, &data)
    }

    fn flush_page(&self, page: &mut HeapPage) -> Result<()> {
        let data = page.to_bytes()?;
        self.disk.write_page(page.page_id(), &data)?;
        page.mark_clean();
        Ok(())
    }

    /// Stores `tuple` in the first page with a free slot, growing the file
    /// when every page is full.
    fn insert_tuple(&self, tuple: Tuple, tid: TransactionId) -> Result<RecordId> {
        let tuple = tuple.rebind(self.desc.clone())?;

        for page_no in 0..self.disk.num_pages() {
            let page = self
                .pool
                .get_page(self, PageId::new(page_no), tid, Permission::Write)?;
            let mut guard = page.write();
            if guard.has_free_slot() {
                let rid = guard.insert_tuple(tuple)?;
                guard.set_dirty(tid, true);
                return Ok(rid);
            }
        }

        self.append_page_with(tuple, tid)
    }

    fn delete_tuple(&self, tuple: &Tuple, tid: TransactionId) -> Result<()> {
        let rid = tuple
            .rid()
            .ok_or_else(|| HeapDbError::InvalidRid("tuple has no record id".to_string()))?;
        if rid.page_id.as_u32() >= self.disk.num_pages() {
            return Err(HeapDbError::InvalidRid(format!(
                "{} is past the end of {}",
                rid, self.file_id
            )));
        }

        let page = self.pool.get_page(self, rid.page_id, tid, Permission::Write)?;
        let mut guard = page.write();
        guard.delete_tuple(rid.slot_id)?;
        guard.set_dirty(tid, true);
        Ok(())
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        self.pool.forget_file(self.file_id);
    }
}

/// Sequential scan over a heap file. Yields tuples carrying their record ids.
pub struct HeapScan<'a> {
    file: &'a HeapFile,
    tid: TransactionId,
    page_no: u32,
    slot: usize,
    /// Page being scanned; kept so each tuple doesn't cost a pool lookup
    current: Option<PageRef>,
    done: bool,
}

impl Iterator for HeapScan<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let page = match &self.current {
                Some(page) => Arc::clone(page),
                None => {
                    if self.page_no >= self.file.disk.num_pages() {
                        self.done = true;
                        return None;
                    }
                    let fetched = self.file.pool.get_page(
                        self.file,
                        PageId::new(self.page_no),
                        self.tid,
                        Permission::Read,
                    );
                    match fetched {
                        Ok(page) => {
                            self.slot = 0;
                            self.current = Some(Arc::clone(&page));
                            page
                        }
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
            };

            let guard = page.read();
            while self.slot < guard.used_slots() {
                let slot = SlotId::new(self.slot as u16);
                self.slot += 1;
                if let Some(tuple) = guard.tuple(slot) {
                    return Some(Ok(tuple.clone()));
                }
            }
            drop(guard);

            self.current = None;
            self.page_no += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, TupleBuilder, Value};

    fn create_file(pool_size: usize) -> Arc<HeapFile> {
        let pool = Arc::new(BufferPool::new(pool_size));
        let desc = TupleDesc::builder()
            .field("a", DataType::Int)
            .field("b", DataType::String)
            .build_arc();
        HeapFile::temporary(desc, pool).unwrap()
    }

    #[test]
    fn test_insert_grows_file() {
        let file = create_file(10);
        let tid = TransactionId::new();
        file.pool().begin_transaction(tid).unwrap();
        assert_eq!(file.num_pages(), 0);

        let per_page = file.descriptor().slots_per_page();
        for i in 0..per_page + 1 {
            let t = TupleBuilder::new(file.descriptor()).value(i as i64).value("x").build();
            file.insert_tuple(t, tid).unwrap();
        }
        assert_eq!(file.num_pages(), 2);
        assert_eq!(file.scan(tid).count(), per_page + 1);
        file.pool().commit_transaction(tid).unwrap();
    }

    #[test]
    fn test_insert_rejects_wrong_shape() {
        let file = create_file(10);
        let desc = TupleDesc::builder().field("a", DataType::Int).build_arc();
        let t = TupleBuilder::new(desc).value(1).build();
        assert!(matches!(
            file.insert_tuple(t, TransactionId::new()),
            Err(HeapDbError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_scan_sets_rids() {
        let file = create_file(10);
        let tid = TransactionId::new();
        file.pool().begin_transaction(tid).unwrap();
        for i in 0..3 {
            let t = TupleBuilder::new(file.descriptor()).value(i).value("r").build();
            file.insert_tuple(t, tid).unwrap();
        }
        let rids: Vec<_> = file
            .scan(tid)
            .map(|t| t.unwrap().rid().unwrap().slot_id)
            .collect();
        assert_eq!(rids, vec![SlotId::new(0), SlotId::new(1), SlotId::new(2)]);
    }

    #[test]
    fn test_delete_without_rid() {
        let file = create_file(10);
        let t = TupleBuilder::new(file.descriptor()).value(1).value("r").build();
        assert!(matches!(
            file.delete_tuple(&t, TransactionId::new()),
            Err(HeapDbError::InvalidRid(_))
        ));
    }

    #[test]
    fn test_delete_past_end() {
        let file = create_file(10);
        let mut t = TupleBuilder::new(file.descriptor()).value(1).value("r").build();
        t.set_rid(Some(RecordId::new(PageId::new(3), SlotId::new(0))));
        assert!(matches!(
            file.delete_tuple(&t, TransactionId::new()),
            Err(HeapDbError::InvalidRid(_))
        ));
    }

    #[test]
    fn test_delete_hides_tuple() {
        let file = create_file(10);
        let tid = TransactionId::new();
        file.pool().begin_transaction(tid).unwrap();
        for i in 0..3 {
            let t = TupleBuilder::new(file.descriptor()).value(i).value("r").build();
            file.insert_tuple(t, tid).unwrap();
        }
        let second = file.scan(tid).nth(1).unwrap().unwrap();
        file.delete_tuple(&second, tid).unwrap();

        let left: Vec<_> = file
            .scan(tid)
            .map(|t| t.unwrap().value(0).cloned().unwrap())
            .collect();
        assert_eq!(left, vec![Value::Int(0), Value::Int(2)]);
    }

    #[test]
    fn test_temporary_file_removed_on_drop() {
        let file = create_file(2);
        let path = file.backing_file().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }
}
