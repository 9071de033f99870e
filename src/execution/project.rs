use std::collections::HashSet;
use std::sync::Arc;

use crate::common::{HeapDbError, Result, TransactionId};
use crate::tuple::{FieldType, Tuple, TupleDesc};

use super::{Expr, Operator, TupleIterator};

/// Evaluates one expression per output column, optionally dropping
/// duplicate output rows.
pub struct Project {
    exprs: Vec<Expr>,
    distinct: bool,
    child: Box<dyn Operator>,
    desc: Arc<TupleDesc>,
}

impl Project {
    /// Fails if `exprs` and `output_names` differ in length.
    pub fn new(
        exprs: Vec<Expr>,
        output_names: Vec<String>,
        distinct: bool,
        child: impl Operator + 'static,
    ) -> Result<Self> {
        if exprs.len() != output_names.len() {
            return Err(HeapDbError::Malformed(format!(
                "{} projection expressions but {} output names",
                exprs.len(),
                output_names.len()
            )));
        }
        let child_desc = child.descriptor();
        let fields = exprs
            .iter()
            .zip(output_names)
            .map(|(expr, name)| FieldType::named(name, expr.resolve_type(&child_desc)))
            .collect();
        Ok(Self {
            exprs,
            distinct,
            child: Box::new(child),
            desc: Arc::new(TupleDesc::new(fields)),
        })
    }
}

impl Operator for Project {
    fn descriptor(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        let mut child = self.child.iterator(tid)?;
        let mut seen: HashSet<Vec<u8>> = HashSet::new();

        Ok(Box::new(std::iter::from_fn(move || loop {
            let tuple = match child.next()? {
                Ok(tuple) => tuple,
                Err(e) => return Some(Err(e)),
            };
            let values = match self
                .exprs
                .iter()
                .map(|e| e.eval(Some(&tuple)))
                .collect::<Result<Vec<_>>>()
            {
                Ok(values) => values,
                Err(e) => return Some(Err(e)),
            };
            let projected = Tuple::new(Arc::clone(&self.desc), values);

            if self.distinct {
                match projected.tuple_key() {
                    Ok(key) => {
                        if !seen.insert(key) {
                            continue;
                        }
                    }
                    Err(e) => return Some(Err(e)),
                }
            }
            return Some(Ok(projected));
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;
    use crate::execution::collect_tuples;
    use crate::storage::{DbFile, HeapFile};
    use crate::tuple::{DataType, TupleBuilder, Value};

    #[test]
    fn test_distinct_drops_repeated_rows() {
        let pool = Arc::new(BufferPool::new(4));
        let desc = TupleDesc::builder()
            .field("k", DataType::Int)
            .field("v", DataType::String)
            .build_arc();
        let file = HeapFile::temporary(desc.clone(), Arc::clone(&pool)).unwrap();
        let tid = TransactionId::new();
        pool.begin_transaction(tid).unwrap();
        for (k, v) in [(1, "a"), (2, "b"), (1, "c"), (3, "d"), (2, "e")] {
            let t = TupleBuilder::new(desc.clone()).value(k).value(v).build();
            file.insert_tuple(t, tid).unwrap();
        }

        let keys = |distinct| {
            let plan = Project::new(
                vec![Expr::field("k", DataType::Int)],
                vec!["k".to_string()],
                distinct,
                Arc::clone(&file),
            )
            .unwrap();
            collect_tuples(&plan, tid)
                .unwrap()
                .iter()
                .map(|t| t.value(0).cloned().unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(true), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(keys(false).len(), 5);
        pool.commit_transaction(tid).unwrap();
    }
}
