use std::cmp::Ordering;
use std::fmt;

use crate::common::{HeapDbError, Result};
use crate::tuple::{DataType, FieldType, Tuple, TupleDesc, Value};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BoolOp {
    /// Whether a comparison that came out as `ord` satisfies this operator.
    pub fn holds(&self, ord: Ordering) -> bool {
        match self {
            BoolOp::Eq => ord == Ordering::Equal,
            BoolOp::Neq => ord != Ordering::Equal,
            BoolOp::Lt => ord == Ordering::Less,
            BoolOp::Le => ord != Ordering::Greater,
            BoolOp::Gt => ord == Ordering::Greater,
            BoolOp::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoolOp::Eq => "=",
            BoolOp::Neq => "<>",
            BoolOp::Lt => "<",
            BoolOp::Le => "<=",
            BoolOp::Gt => ">",
            BoolOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Integer arithmetic operators. Overflow wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn apply(&self, a: i64, b: i64) -> Result<i64> {
        match self {
            ArithOp::Add => Ok(a.wrapping_add(b)),
            ArithOp::Sub => Ok(a.wrapping_sub(b)),
            ArithOp::Mul => Ok(a.wrapping_mul(b)),
            ArithOp::Div | ArithOp::Mod if b == 0 => {
                Err(HeapDbError::Malformed("division by zero".to_string()))
            }
            ArithOp::Div => Ok(a.wrapping_div(b)),
            ArithOp::Mod => Ok(a.wrapping_rem(b)),
        }
    }
}

/// An expression evaluated against one tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a field, resolved by name (and qualifier) at evaluation time
    Field(FieldType),
    Const(Value),
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Yields Int 1 when the comparison holds, Int 0 otherwise
    Compare {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn field(name: impl Into<String>, data_type: DataType) -> Self {
        Expr::Field(FieldType::named(name, data_type))
    }

    pub fn qualified_field(
        qualifier: impl Into<String>,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Expr::Field(FieldType::new(name, qualifier, data_type))
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Const(value.into())
    }

    pub fn arith(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn compare(op: BoolOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluates the expression. Field references fail without a tuple.
    pub fn eval(&self, tuple: Option<&Tuple>) -> Result<Value> {
        match self {
            Expr::Field(field) => {
                let tuple = tuple.ok_or_else(|| {
                    HeapDbError::Malformed(format!(
                        "field {} referenced without a tuple",
                        field.display_name()
                    ))
                })?;
                let index = tuple.desc().find_field(field)?;
                tuple.value(index).cloned().ok_or_else(|| {
                    HeapDbError::Malformed(format!("tuple has no value at {}", index))
                })
            }
            Expr::Const(value) => Ok(value.clone()),
            Expr::Arith { op, left, right } => {
                match (left.eval(tuple)?, right.eval(tuple)?) {
                    (Value::Int(a), Value::Int(b)) => op.apply(a, b).map(Value::Int),
                    (a, b) => Err(HeapDbError::IncompatibleTypes(format!(
                        "arithmetic on {} and {}",
                        a.data_type(),
                        b.data_type()
                    ))),
                }
            }
            Expr::Compare { op, left, right } => {
                let ord = left.eval(tuple)?.compare(&right.eval(tuple)?)?;
                Ok(Value::Int(op.holds(ord) as i64))
            }
        }
    }

    /// Name and type of the value this expression produces.
    pub fn expr_type(&self) -> FieldType {
        match self {
            Expr::Field(field) => field.clone(),
            Expr::Const(value) => FieldType::named("const", value.data_type()),
            Expr::Arith { .. } => FieldType::named("arith", DataType::Int),
            Expr::Compare { .. } => FieldType::named("cmp", DataType::Int),
        }
    }

    /// Like `expr_type`, but resolves an `Unknown` field reference against
    /// the descriptor of the tuples it will be evaluated on.
    pub fn resolve_type(&self, desc: &TupleDesc) -> DataType {
        match self {
            Expr::Field(field) if field.data_type == DataType::Unknown => desc
                .find_field(field)
                .ok()
                .and_then(|i| desc.field(i))
                .map_or(DataType::Unknown, |f| f.data_type),
            other => other.expr_type().data_type,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(field) => write!(f, "{}", field.display_name()),
            Expr::Const(Value::String(s)) => write!(f, "'{}'", s),
            Expr::Const(value) => write!(f, "{}", value),
            Expr::Arith { op, left, right } => {
                let sym = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::Div => "/",
                    ArithOp::Mod => "%",
                };
                write!(f, "({} {} {})", left, sym, right)
            }
            Expr::Compare { op, left, right } => write!(f, "({} {} {})", left, op, right),
        }
    }
}
