use std::sync::Arc;

use crate::common::{HeapDbError, Result, TransactionId};
use crate::tuple::{TupleDesc, Value};

use super::{Expr, Operator, TupleIterator};

/// Passes through the child tuples for which the predicate is a non-zero Int.
pub struct Filter {
    predicate: Expr,
    child: Box<dyn Operator>,
}

impl Filter {
    pub fn new(predicate: Expr, child: impl Operator + 'static) -> Self {
        Self {
            predicate,
            child: Box::new(child),
        }
    }
}

impl Operator for Filter {
    fn descriptor(&self) -> Arc<TupleDesc> {
        self.child.descriptor()
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        let predicate = &self.predicate;
        let child = self.child.iterator(tid)?;
        Ok(Box::new(child.filter_map(move |item| {
            let tuple = match item {
                Ok(tuple) => tuple,
                Err(e) => return Some(Err(e)),
            };
            match predicate.eval(Some(&tuple)) {
                Ok(Value::Int(0)) => None,
                Ok(Value::Int(_)) => Some(Ok(tuple)),
                Ok(other) => Some(Err(HeapDbError::IncompatibleTypes(format!(
                    "predicate {} produced {} instead of a truth value",
                    predicate,
                    other.data_type()
                )))),
                Err(e) => Some(Err(e)),
            }
        })))
    }
}
