use std::sync::Arc;

use crate::common::{Result, TransactionId};
use crate::storage::DbFile;
use crate::tuple::{DataType, Tuple, TupleDesc, Value};

use super::{Operator, TupleIterator};

/// Descriptor of the single `count` row mutation operators return.
pub(crate) fn count_desc() -> Arc<TupleDesc> {
    TupleDesc::builder().field("count", DataType::Int).build_arc()
}

/// Inserts every child tuple into `target` and yields one row holding the
/// number inserted.
///
/// The child is drained before the first insert, so inserting a table into
/// itself terminates.
pub struct Insert {
    target: Arc<dyn DbFile>,
    child: Box<dyn Operator>,
}

impl Insert {
    pub fn new(target: Arc<dyn DbFile>, child: impl Operator + 'static) -> Self {
        Self {
            target,
            child: Box::new(child),
        }
    }

    fn run(&self, tid: TransactionId) -> Result<Tuple> {
        let tuples = self.child.iterator(tid)?.collect::<Result<Vec<_>>>()?;
        let count = tuples.len();
        for tuple in tuples {
            self.target.insert_tuple(tuple, tid)?;
        }
        Ok(Tuple::new(count_desc(), vec![Value::Int(count as i64)]))
    }
}

impl Operator for Insert {
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
