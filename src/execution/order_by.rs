use std::cmp::Ordering;
use std::sync::Arc;

use crate::common::{HeapDbError, Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc, Value};

use super::{Expr, Operator, TupleIterator};

/// Sorts the child's output by a list of keys, each ascending or descending.
///
/// Blocking: the whole input is read and sorted in memory before the first
/// tuple is returned. Ties keep their input order.
pub struct OrderBy {
    exprs: Vec<Expr>,
    ascending: Vec<bool>,
    child: Box<dyn Operator>,
}

impl OrderBy {
    /// Fails if `exprs` and `ascending` differ in length.
    pub fn new(
        exprs: Vec<Expr>,
        child: impl Operator + 'static,
        ascending: Vec<bool>,
    ) -> Result<Self> {
        if exprs.len() != ascending.len() {
            return Err(HeapDbError::Malformed(format!(
                "{} sort keys but {} directions",
                exprs.len(),
                ascending.len()
            )));
        }
        Ok(Self {
            exprs,
            ascending,
            child: Box::new(child),
        })
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Result<Ordering> {
        for ((x, y), asc) in a.iter().zip(b).zip(&self.ascending) {
            match x.compare(y)? {
                Ordering::Equal => continue,
                ord if *asc => return Ok(ord),
                ord => return Ok(ord.reverse()),
            }
        }
        Ok(Ordering::Equal)
    }
}

impl Operator for OrderBy {
    fn descriptor(&self) -> Arc<TupleDesc> {
        self.child.descriptor()
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        let mut rows = Vec::new();
        for item in self.child.iterator(tid)? {
            let tuple = item?;
            let keys = self
                .exprs
                .iter()
                .map(|e| e.eval(Some(&tuple)))
                .collect::<Result<Vec<_>>>()?;
            rows.push((keys, tuple));
        }

        let mut failure = None;
        rows.sort_by(|(a, _), (b, _)| {
            self.compare_keys(a, b).unwrap_or_else(|e| {
                failure.get_or_insert(e);
                Ordering::Equal
            })
        });
        if let Some(e) = failure {
            return Err(e);
        }

        Ok(Box::new(rows.into_iter().map(|(_, tuple)| Ok::<Tuple, HeapDbError>(tuple))))
    }
}
