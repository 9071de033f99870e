use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{HeapDbError, Result, TransactionId};
use crate::tuple::{FieldType, Tuple, TupleDesc, Value};

use super::{AggState, Expr, Operator, TupleIterator};

/// Groups the child's tuples by a list of expressions and computes a set of
/// aggregates per group.
///
/// Output rows hold the group-by values followed by one column per
/// aggregate, in the order groups were first seen. Without group-by
/// expressions a single row is produced, even for empty input.
pub struct Aggregate {
    group_by: Vec<Expr>,
    states: Vec<AggState>,
    child: Box<dyn Operator>,
    desc: Arc<TupleDesc>,
}

impl Aggregate {
    pub fn new(
        group_by: Vec<Expr>,
        states: Vec<AggState>,
        child: impl Operator + 'static,
    ) -> Self {
        let child_desc = child.descriptor();
        let mut fields: Vec<FieldType> = group_by
            .iter()
            .map(|e| {
                let name = e.expr_type().name;
                FieldType::named(name, e.resolve_type(&child_desc))
            })
            .collect();
        for state in &states {
            fields.extend(state.tuple_desc().fields().iter().cloned());
        }
        Self {
            group_by,
            states,
            child: Box::new(child),
            desc: Arc::new(TupleDesc::new(fields)),
        }
    }

    fn compute(&self, tid: TransactionId) -> Result<Vec<Tuple>> {
        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<AggState>)> = Vec::new();

        for item in self.child.iterator(tid)? {
            let tuple = item?;
            let key = self
                .group_by
                .iter()
                .map(|e| e.eval(Some(&tuple)))
                .collect::<Result<Vec<_>>>()?;
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, self.states.clone()));
                    groups.len() - 1
                }
            };
            for state in &mut groups[slot].1 {
                state.add_tuple(&tuple);
            }
        }

        if groups.is_empty() && self.group_by.is_empty() {
            groups.push((Vec::new(), self.states.clone()));
        }

        Ok(groups
            .into_iter()
            .map(|(mut values, states)| {
                values.extend(states.iter().map(AggState::result));
                Tuple::new(Arc::clone(&self.desc), values)
            })
            .collect())
    }
}

impl Operator for Aggregate {
    fn descriptor(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }

    fn iterator(&self, tid: TransactionId) -> Result<TupleIterator<'_>> {
        let rows = self.compute(tid)?;
        Ok(Box::new(rows.into_iter().map(Ok::<Tuple, HeapDbError>)))
    }
}
