use std::sync::Arc;

use crate::common::{Result, TransactionId};
use crate::storage::DbFile;
use crate::tuple::{Tuple, TupleDesc, Value};

use super::insert::count_desc;
use super::{Operator, TupleIterator};

/// Deletes every child tuple from `target` by record id and yields one row
/// holding the number deleted.
pub struct Delete {
    target: Arc<dyn DbFile>,
    child: Box<dyn Operator>,
}

impl Delete {
    pub fn new(target: Arc<dyn DbFile>, child: impl Operator + 'static) -> Self {
        Self {
            target,
            child: Box::new(child),
        }
    }

    fn run(&self, tid: TransactionId) -> Result<Tuple> {
        let mut count = 0i64;
        for item in self.child.iterator(tid)? {
            self.target.delete_tuple(&item?, tid)?;
            count += 1;
        }
        Ok(Tuple::new(count_desc(), vec![Value::Int(count)]))
    }
}

impl Operator for Delete {
    fn descriptor(&self) -> Arc<TupleDesc> {
        count_desc()
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        let mut done = false;
        Ok(Box::new(std::iter::from_fn(move || {
            if done {
                return None;
            }
            done = true;
            Some(self.run(tid))
        })))
    }
}
