use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{HeapDbError, Result, INT_FIELD_SIZE, STRING_LENGTH};

use super::DataType;

/// Represents a typed value that can be stored in a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// 64-bit signed integer
    Int(i64),

    /// String value, at most STRING_LENGTH bytes once stored
    String(String),
}

impl Value {
    /// Returns the DataType of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::String(_) => DataType::String,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    /// Serializes the value into `buf` using the fixed width of `data_type`.
    ///
    /// Strings longer than STRING_LENGTH are cut at the last character
    /// boundary that fits, shorter ones are zero-padded.
    pub fn write_to<B: BufMut>(&self, buf: &mut B, data_type: DataType) -> Result<()> {
        match (self, data_type) {
            (Value::Int(v), DataType::Int) => {
                buf.put_i64_le(*v);
                Ok(())
            }
            (Value::String(s), DataType::String) => {
                let stored = truncate_string(s, STRING_LENGTH);
                buf.put_slice(stored.as_bytes());
                buf.put_bytes(0, STRING_LENGTH - stored.len());
                Ok(())
            }
            (v, dt) => Err(HeapDbError::TypeMismatch(format!(
                "cannot write {} value into {} field",
                v.data_type(),
                dt
            ))),
        }
    }

    /// Deserializes a value of `data_type` from the front of `buf`.
    /// Trailing zero bytes of strings are trimmed.
    pub fn read_from<B: Buf>(buf: &mut B, data_type: DataType) -> Result<Self> {
        match data_type {
            DataType::Int => {
                if buf.remaining() < INT_FIELD_SIZE {
                    return Err(HeapDbError::Malformed(
                        "buffer too short for int field".to_string(),
                    ));
                }
                Ok(Value::Int(buf.get_i64_le()))
            }
            DataType::String => {
                if buf.remaining() < STRING_LENGTH {
                    return Err(HeapDbError::Malformed(
                        "buffer too short for string field".to_string(),
                    ));
                }
                let mut raw = [0u8; STRING_LENGTH];
                buf.copy_to_slice(&mut raw);
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                let s = std::str::from_utf8(&raw[..end])
                    .map_err(|e| HeapDbError::Malformed(format!("invalid string field: {}", e)))?;
                Ok(Value::String(s.to_string()))
            }
            DataType::Unknown => Err(HeapDbError::TypeMismatch(
                "cannot read a field of unknown type".to_string(),
            )),
        }
    }

    /// Compares two values of the same type.
    /// Strings compare by code point, which matches their byte order.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (a, b) => Err(HeapDbError::IncompatibleTypes(format!(
                "cannot compare {} with {}",
                a.data_type(),
                b.data_type()
            ))),
        }
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
pub(crate) fn truncate_string(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
