use std::sync::Arc;

use crate::common::{HeapDbError, Result, TransactionId};
use crate::tuple::{TupleDesc, Value};

use super::{Expr, Operator, TupleIterator};

/// Yields at most N child tuples, where N is a constant Int expression.
pub struct Limit {
    limit: Expr,
    child: Box<dyn Operator>,
}

impl Limit {
    pub fn new(limit: Expr, child: impl Operator + 'static) -> Self {
        Self {
            limit,
            child: Box::new(child),
        }
    }
}

impl Operator for Limit {
    fn descriptor(&self) -> Arc<TupleDesc> {
        self.child.descriptor()
    }

    /// A negative limit yields nothing.
    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        let n = match self.limit.eval(None)? {
            Value::Int(n) => usize::try_from(n).unwrap_or(0),
            other => {
                return Err(HeapDbError::IncompatibleTypes(format!(
                    "limit {} is a {}, not an int",
                    self.limit,
                    other.data_type()
                )))
            }
        };
        Ok(Box::new(self.child.iterator(tid)?.take(n)))
    }
}
