use std::fmt;

use crate::common::{INT_FIELD_SIZE, STRING_LENGTH};

/// Represents the field types supported by the database.
/// Every stored type has a fixed on-disk width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer: 8 bytes, little-endian
    Int,

    /// Fixed-length character string: exactly STRING_LENGTH bytes, zero-padded
    String,

    /// Wildcard used only when looking fields up by name
    Unknown,
}

impl DataType {
    /// Returns the on-disk width in bytes, or None for `Unknown`.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            DataType::Int => Some(INT_FIELD_SIZE),
            DataType::String => Some(STRING_LENGTH),
            DataType::Unknown => None,
        }
    }

    /// Returns true if a field of this type can be written to a page.
    pub fn is_storable(&self) -> bool {
        !matches!(self, DataType::Unknown)
    }

    /// True when a lookup for `self` accepts a field declared as `other`.
    pub fn matches(&self, other: &DataType) -> bool {
        *self == DataType::Unknown || self == other
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::String => write!(f, "STRING"),
            DataType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
