use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::common::{HeapDbError, Result, STRING_LENGTH};
use crate::tuple::{DataType, Tuple, TupleDesc, Value};

use super::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Max => "MAX",
            AggFunc::Min => "MIN",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
enum Accumulator {
    Count(i64),
    Sum(i64),
    Avg { sum: i64, count: i64 },
    /// Running extreme; `keep` is the ordering a new value must have against
    /// the current one to replace it
    Extreme { current: Value, keep: Ordering },
}

/// Running state of one aggregate over one group.
///
/// A template state is cloned for every new group, so a fresh clone always
/// starts from the seed value.
#[derive(Debug, Clone)]
pub struct AggState {
    func: AggFunc,
    alias: String,
    expr: Expr,
    acc: Accumulator,
}

impl AggState {
    /// Fails with `IncompatibleTypes` for MIN/MAX over an expression of
    /// unknown type, since the seed depends on the type.
    pub fn new(func: AggFunc, alias: impl Into<String>, expr: Expr) -> Result<Self> {
        let acc = match func {
            AggFunc::Count => Accumulator::Count(0),
            AggFunc::Sum => Accumulator::Sum(0),
            AggFunc::Avg => Accumulator::Avg { sum: 0, count: 0 },
            AggFunc::Max | AggFunc::Min => {
                let keep = if func == AggFunc::Max {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
                let current = match (expr.expr_type().data_type, func) {
                    (DataType::Int, AggFunc::Max) => Value::Int(i64::MIN),
                    (DataType::Int, _) => Value::Int(i64::MAX),
                    (DataType::String, AggFunc::Max) => Value::String(String::new()),
                    (DataType::String, _) => {
                        Value::String(std::iter::repeat(char::MAX).take(STRING_LENGTH).collect())
                    }
                    (DataType::Unknown, _) => {
                        return Err(HeapDbError::IncompatibleTypes(format!(
                            "{} over {} of unknown type",
                            func, expr
                        )))
                    }
                };
                Accumulator::Extreme { current, keep }
            }
        };
        Ok(Self {
            func,
            alias: alias.into(),
            expr,
            acc,
        })
    }

    pub fn func(&self) -> AggFunc {
        self.func
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Folds one tuple into the state. Values that fail to evaluate, or are
    /// of the wrong type, are skipped.
    pub fn add_tuple(&mut self, tuple: &Tuple) {
        if let Accumulator::Count(n) = &mut self.acc {
            *n += 1;
            return;
        }
        let Ok(value) = self.expr.eval(Some(tuple)) else {
            return;
        };
        match (&mut self.acc, value) {
            (Accumulator::Sum(sum), Value::Int(v)) => *sum = sum.wrapping_add(v),
            (Accumulator::Avg { sum, count }, Value::Int(v)) => {
                *sum = sum.wrapping_add(v);
                *count += 1;
            }
            (Accumulator::Extreme { current, keep }, value) => {
                if value.compare(current).ok() == Some(*keep) {
                    *current = value;
                }
            }
            _ => {}
        }
    }

    fn result_type(&self) -> DataType {
        match &self.acc {
            Accumulator::Extreme { current, .. } => current.data_type(),
            _ => DataType::Int,
        }
    }

    /// Single-column descriptor named after the alias.
    pub fn tuple_desc(&self) -> Arc<TupleDesc> {
        TupleDesc::builder()
            .field(self.alias.clone(), self.result_type())
            .build_arc()
    }

    pub fn result(&self) -> Value {
        match &self.acc {
            Accumulator::Count(n) | Accumulator::Sum(n) => Value::Int(*n),
            Accumulator::Avg { count: 0, .. } => Value::Int(0),
            Accumulator::Avg { sum, count } => Value::Int(sum / count),
            Accumulator::Extreme { current, .. } => current.clone(),
        }
    }

    /// One-row tuple holding the aggregate's result.
    pub fn finalize(&self) -> Tuple {
        Tuple::new(self.tuple_desc(), vec![self.result()])
    }
}
