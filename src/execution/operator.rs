use std::sync::Arc;

use crate::common::{Result, TransactionId};
use crate::storage::HeapFile;
use crate::tuple::{Tuple, TupleDesc};

/// Pull-based stream of tuples. Errors are yielded in place of a tuple;
/// `None` ends the stream.
pub type TupleIterator<'a> = Box<dyn Iterator<Item = Result<Tuple>> + 'a>;

/// A node of a query plan.
pub trait Operator {
    /// Shape of the tuples this operator yields.
    fn descriptor(&self) -> Arc<TupleDesc>;

    /// Starts a fresh pass over the operator's output on behalf of `tid`.
    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>>;
}

impl<T: Operator + ?Sized> Operator for Arc<T> {
    fn descriptor(&self) -> Arc<TupleDesc> {
        (**self).descriptor()
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        (**self).iterator(tid)
    }
}

impl<T: Operator + ?Sized> Operator for Box<T> {
    fn descriptor(&self) -> Arc<TupleDesc> {
        (**self).descriptor()
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        (**self).iterator(tid)
    }
}

/// A heap file is the leaf of every plan: a sequential scan.
impl Operator for HeapFile {
    fn descriptor(&self) -> Arc<TupleDesc> {
        HeapFile::descriptor(self)
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        Ok(Box::new(self.scan(tid)))
    }
}

/// Drains `op` into a vector, stopping at the first error.
pub fn collect_tuples(op: &dyn Operator, tid: TransactionId) -> Result<Vec<Tuple>> {
    op.iterator(tid)?.collect()
}
