use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};

use crate::common::{HeapDbError, RecordId, Result};
use crate::execution::Expr;

use super::schema::format_row;
use super::{FieldType, TupleDesc, Value};

/// Represents a single row.
///
/// A tuple holds one value per field of its descriptor and, when it was read
/// from or written to a heap file, the record id of the slot it occupies.
///
/// ## Tuple Binary Format
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | Field 0   | Field 1   | ... | Field N-1 |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// Int fields take 8 bytes (little-endian), String fields exactly
/// STRING_LENGTH bytes (zero-padded). There are no length prefixes, so every
/// tuple of a descriptor has the same width.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    values: Vec<Value>,
    rid: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple with the given descriptor and values.
    ///
    /// # Panics
    /// Panics if the number of values doesn't match the descriptor.
    pub fn new(desc: Arc<TupleDesc>, values: Vec<Value>) -> Self {
        assert_eq!(
            values.len(),
            desc.len(),
            "Value count must match descriptor field count"
        );
        Self {
            desc,
            values,
            rid: None,
        }
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Returns the same values under another descriptor, without a record id.
    /// Fails if the arity or any field type differs.
    pub fn rebind(&self, desc: Arc<TupleDesc>) -> Result<Tuple> {
        if desc.len() != self.values.len() {
            return Err(HeapDbError::TypeMismatch(format!(
                "tuple has {} fields, descriptor expects {}",
                self.values.len(),
                desc.len()
            )));
        }
        for (value, field) in self.values.iter().zip(desc.fields()) {
            if value.data_type() != field.data_type {
                return Err(HeapDbError::TypeMismatch(format!(
                    "field {} expects {}, got {}",
                    field.display_name(),
                    field.data_type,
                    value.data_type()
                )));
            }
        }
        Ok(Tuple::new(desc, self.values.clone()))
    }

    /// Serializes the fields, in descriptor order, into `buf`.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        for (value, field) in self.values.iter().zip(self.desc.fields()) {
            value.write_to(buf, field.data_type)?;
        }
        Ok(())
    }

    /// Reads one tuple of `desc` from the front of `buf`.
    pub fn read_from<B: Buf>(buf: &mut B, desc: Arc<TupleDesc>) -> Result<Tuple> {
        let values = desc
            .fields()
            .iter()
            .map(|f| Value::read_from(buf, f.data_type))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tuple::new(desc, values))
    }

    /// Serialized bytes, usable as a key for duplicate elimination and grouping.
    pub fn tuple_key(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.desc.tuple_width());
        self.write_to(&mut buf)?;
        Ok(buf.to_vec())
    }

    /// Builds a tuple holding only `fields`, each resolved by name against
    /// this tuple's descriptor.
    pub fn project(&self, fields: &[FieldType]) -> Result<Tuple> {
        let values = fields
            .iter()
            .map(|f| self.desc.find_field(f).map(|i| self.values[i].clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tuple::new(Arc::new(TupleDesc::new(fields.to_vec())), values))
    }

    /// Appends `other`'s fields to this tuple's.
    pub fn join(&self, other: &Tuple) -> Tuple {
        let desc = Arc::new(self.desc.merge(&other.desc));
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Tuple::new(desc, values)
    }

    /// Joins two optional tuples; when one side is absent the other is returned.
    pub fn join_tuples(left: Option<&Tuple>, right: Option<&Tuple>) -> Option<Tuple> {
        match (left, right) {
            (Some(l), Some(r)) => Some(l.join(r)),
            (Some(t), None) | (None, Some(t)) => Some(t.clone()),
            (None, None) => None,
        }
    }

    /// Orders `self` against `other` by the value `expr` takes on each.
    pub fn compare_field(&self, other: &Tuple, expr: &Expr) -> Result<Ordering> {
        let a = expr.eval(Some(self))?;
        let b = expr.eval(Some(other))?;
        a.compare(&b)
    }

    /// Values rendered either comma separated or in aligned columns.
    pub fn pretty_print(&self, aligned: bool) -> String {
        let cells: Vec<String> = self.values.iter().map(Value::to_string).collect();
        format_row(&cells, aligned)
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty_print(false))
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    desc: Arc<TupleDesc>,
    values: Vec<Value>,
}

impl TupleBuilder {
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let count = desc.len();
        Self {
            desc,
            values: Vec::with_capacity(count),
        }
    }

    /// Appends the next value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Builds the tuple.
    ///
    /// # Panics
    /// Panics if the number of values doesn't match the descriptor.
    pub fn build(self) -> Tuple {
        Tuple::new(self.desc, self.values)
    }
}
