use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::common::{Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc, Value};

use super::{Expr, Operator, TupleIterator};

/// Joins two inputs on equality of one expression per side.
///
/// The right input is read completely up front. For each left tuple, every
/// matching right tuple is emitted in the right input's order.
pub struct EqualityJoin {
    left: Box<dyn Operator>,
    left_expr: Expr,
    right: Box<dyn Operator>,
    right_expr: Expr,
    max_buffer_size: usize,
}

impl EqualityJoin {
    pub fn new(
        left: impl Operator + 'static,
        left_expr: Expr,
        right: impl Operator + 'static,
        right_expr: Expr,
        max_buffer_size: usize,
    ) -> Self {
        Self {
            left: Box::new(left),
            left_expr,
            right: Box::new(right),
            right_expr,
            max_buffer_size,
        }
    }

    fn build_right(&self, tid: TransactionId) -> Result<HashMap<Value, Vec<Tuple>>> {
        let mut table: HashMap<Value, Vec<Tuple>> = HashMap::new();
        let mut buffered = 0;
        for item in self.right.iterator(tid)? {
            let tuple = item?;
            let key = self.right_expr.eval(Some(&tuple))?;
            table.entry(key).or_default().push(tuple);
            buffered += 1;
        }
        if buffered > self.max_buffer_size {
            debug!(
                "join buffered {} right tuples, above the expected {}",
                buffered, self.max_buffer_size
            );
        }
        Ok(table)
    }
}

impl Operator for EqualityJoin {
    fn descriptor(&self) -> Arc<TupleDesc> {
        Arc::new(self.left.descriptor().merge(&self.right.descriptor()))
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        let table = self.build_right(tid)?;
        let mut left = self.left.iterator(tid)?;
        // Left tuple being matched, its key, and the next right match to emit
        let mut current: Option<(Tuple, Value, usize)> = None;

        Ok(Box::new(std::iter::from_fn(move || loop {
            if let Some((outer, key, next)) = current.as_mut() {
                if let Some(inner) = table.get(key).and_then(|m| m.get(*next)) {
                    *next += 1;
                    return Some(Ok(outer.join(inner)));
                }
                current = None;
            }

            let outer = match left.next()? {
                Ok(tuple) => tuple,
                Err(e) => return Some(Err(e)),
            };
            match self.left_expr.eval(Some(&outer)) {
                Ok(key) => current = Some((outer, key, 0)),
                Err(e) => return Some(Err(e)),
            }
        })))
    }
}
