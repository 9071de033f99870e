use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{HeapDbError, PageId, Result, PAGE_SIZE};

/// DiskManager is responsible for reading and writing pages to/from disk.
/// It manages a single heap file and tracks the number of pages it holds.
pub struct DiskManager {
    /// The backing file
    db_file: Mutex<File>,
    /// Path to the backing file
    db_path: PathBuf,
    /// Number of pages currently on disk
    num_pages: AtomicU32,
    /// Number of disk reads performed
    num_reads: AtomicU32,
    /// Number of disk writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at the given path, creating it if it doesn't exist.
    /// A trailing partial page is ignored.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            db_file: Mutex::new(file),
            db_path: db_path.as_ref().to_path_buf(),
            num_pages: AtomicU32::new(num_pages),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads a page from disk into the provided buffer.
    /// The buffer must be exactly PAGE_SIZE bytes.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        if page_id.as_u32() >= self.num_pages() {
            return Err(HeapDbError::PageNotFound(page_id));
        }

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to disk and waits for it to be durable.
    /// The buffer must be exactly PAGE_SIZE bytes.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        file.write_all(data)?;
        file.flush()?;
        file.sync_data()?;

        self.num_pages
            .fetch_max(page_id.as_u32() + 1, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `data` as a new page at the end of the file and returns its id.
    pub fn append_page(&self, data: &[u8]) -> Result<PageId> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let mut file = self.db_file.lock();
        let page_id = PageId::new(self.num_pages.load(Ordering::SeqCst));
        file.seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        file.write_all(data)?;
        file.flush()?;
        file.sync_data()?;

        self.num_pages.store(page_id.as_u32() + 1, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(page_id)
    }

    /// Returns the number of pages currently on disk.
    pub fn num_pages(&self) -> u32 {
        self.num_pages.load(Ordering::SeqCst)
    }

    /// Returns the number of disk reads performed.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of disk writes performed.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the backing file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.db_file.get_mut();
        let _ = file.sync_all();
    }
}
