use std::sync::Arc;

use crate::common::{FileId, PageId, RecordId, Result, TransactionId};
use crate::storage::page::HeapPage;
use crate::tuple::{Tuple, TupleDesc};

/// A paged file the buffer pool can cache pages for.
///
/// The pool reaches back into the owning file to read pages it doesn't hold
/// and to write dirty pages out.
pub trait DbFile: Send + Sync {
    fn file_id(&self) -> FileId;

    fn descriptor(&self) -> Arc<TupleDesc>;

    /// Number of pages currently in the file.
    fn num_pages(&self) -> usize;

    /// Reads and decodes a page straight from disk, bypassing the pool.
    fn read_page(&self, page_id: PageId) -> Result<HeapPage>;

    /// Writes `page` to disk durably and clears its dirty flag.
    fn flush_page(&self, page: &mut HeapPage) -> Result<()>;

    fn insert_tuple(&self, tuple: Tuple, tid: TransactionId) -> Result<RecordId>;

    fn delete_tuple(&self, tuple: &Tuple, tid: TransactionId) -> Result<()>;
}
