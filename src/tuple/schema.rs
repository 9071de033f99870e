use std::fmt;
use std::sync::Arc;

use crate::common::{
    HeapDbError, Result, HEAP_PAGE_HEADER_SIZE, PAGE_SIZE, PRETTY_PRINT_WIDTH,
};

use super::value::truncate_string;
use super::DataType;

/// A named, typed field, optionally qualified by the table (or alias) it
/// belongs to. An empty qualifier means "unqualified".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub name: String,
    pub qualifier: String,
    pub data_type: DataType,
}

impl FieldType {
    pub fn new(name: impl Into<String>, qualifier: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            qualifier: qualifier.into(),
            data_type,
        }
    }

    /// Unqualified field.
    pub fn named(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, "", data_type)
    }

    /// `qualifier.name`, or just `name` when unqualified.
    pub fn display_name(&self) -> String {
        if self.qualifier.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.qualifier, self.name)
        }
    }
}

/// Describes the ordered fields of a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TupleDesc {
    fields: Vec<FieldType>,
}

impl TupleDesc {
    pub fn new(fields: Vec<FieldType>) -> Self {
        Self { fields }
    }

    /// Creates a descriptor builder for fluent construction.
    pub fn builder() -> TupleDescBuilder {
        TupleDescBuilder::new()
    }

    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldType> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Concatenates the fields of `other` onto a copy of `self`.
    pub fn merge(&self, other: &TupleDesc) -> TupleDesc {
        let mut fields = Vec::with_capacity(self.len() + other.len());
        fields.extend_from_slice(&self.fields);
        fields.extend_from_slice(&other.fields);
        TupleDesc { fields }
    }

    /// Returns a copy with every field qualified by `alias`.
    pub fn with_qualifier(&self, alias: &str) -> TupleDesc {
        TupleDesc {
            fields: self
                .fields
                .iter()
                .map(|f| FieldType::new(f.name.clone(), alias, f.data_type))
                .collect(),
        }
    }

    /// Resolves `query` to a field index.
    ///
    /// A field is a candidate when its name matches and its type matches the
    /// query (or the query type is `Unknown`). An unqualified query with more
    /// than one candidate is ambiguous. A candidate whose qualifier equals the
    /// query's replaces an earlier provisional pick.
    pub fn find_field(&self, query: &FieldType) -> Result<usize> {
        let mut best: Option<usize> = None;
        for (i, field) in self.fields.iter().enumerate() {
            if field.name != query.name || !query.data_type.matches(&field.data_type) {
                continue;
            }
            if query.qualifier.is_empty() && best.is_some() {
                return Err(HeapDbError::AmbiguousName(query.name.clone()));
            }
            if field.qualifier == query.qualifier || best.is_none() {
                best = Some(i);
            }
        }
        best.ok_or_else(|| {
            HeapDbError::IncompatibleTypes(format!(
                "no field {} of type {} in [{}]",
                query.display_name(),
                query.data_type,
                self.header_string(false)
            ))
        })
    }

    /// Fails unless every field has a storable type.
    pub fn check_storable(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(HeapDbError::Malformed("tuple descriptor has no fields".to_string()));
        }
        match self.fields.iter().find(|f| !f.data_type.is_storable()) {
            Some(f) => Err(HeapDbError::Malformed(format!(
                "field {} has no storable type",
                f.display_name()
            ))),
            None => Ok(()),
        }
    }

    /// On-disk width of one tuple in bytes.
    pub fn tuple_width(&self) -> usize {
        self.fields
            .iter()
            .filter_map(|f| f.data_type.fixed_size())
            .sum()
    }

    /// Number of tuple slots that fit on one heap page.
    pub fn slots_per_page(&self) -> usize {
        match self.tuple_width() {
            0 => 0,
            width => (PAGE_SIZE - HEAP_PAGE_HEADER_SIZE) / width,
        }
    }

    /// Column names, either comma separated or centered in fixed-width columns.
    pub fn header_string(&self, aligned: bool) -> String {
        let names: Vec<String> = self.fields.iter().map(FieldType::display_name).collect();
        format_row(&names, aligned)
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header_string(false))
    }
}

/// Joins cells with commas, or centers each one in an equal share of the
/// print width followed by a `|` separator.
pub(crate) fn format_row(cells: &[String], aligned: bool) -> String {
    if !aligned {
        return cells.join(",");
    }
    let width = PRETTY_PRINT_WIDTH / cells.len().max(1);
    let mut out = String::new();
    for cell in cells {
        out.push(' ');
        let padding = width.saturating_sub(cell.len() + 3);
        if padding > 0 {
            let right = padding / 2;
            let left = padding - right;
            out.push_str(&" ".repeat(left));
            out.push_str(cell);
            out.push_str(&" ".repeat(right));
        } else {
            out.push(' ');
            out.push_str(truncate_string(cell, width.saturating_sub(4)));
        }
        out.push_str(" |");
    }
    out
}

/// Builder for constructing descriptors fluently.
pub struct TupleDescBuilder {
    fields: Vec<FieldType>,
}

impl TupleDescBuilder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds an unqualified field.
    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldType::named(name, data_type));
        self
    }

    /// Adds a field qualified by a table name.
    pub fn qualified_field(
        mut self,
        qualifier: impl Into<String>,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        self.fields.push(FieldType::new(name, qualifier, data_type));
        self
    }

    pub fn build(self) -> TupleDesc {
        TupleDesc::new(self.fields)
    }

    /// Builds the descriptor wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Arc<TupleDesc> {
        Arc::new(self.build())
    }
}

impl Default for TupleDescBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::STRING_LENGTH;

    fn create_test_desc() -> TupleDesc {
        TupleDesc::builder()
            .qualified_field("t", "id", DataType::Int)
            .qualified_field("t", "name", DataType::String)
            .qualified_field("u", "id", DataType::Int)
            .build()
    }

    #[test]
    fn test_tuple_width_and_slots() {
        let desc = TupleDesc::builder()
            .field("a", DataType::Int)
            .field("b", DataType::String)
            .build();
        assert_eq!(desc.tuple_width(), 8 + STRING_LENGTH);
        assert_eq!(desc.slots_per_page(), (PAGE_SIZE - 8) / (8 + STRING_LENGTH));
        assert_eq!(TupleDesc::default().slots_per_page(), 0);
    }

    #[test]
    fn test_find_field_qualified() {
        let desc = create_test_desc();
        let q = FieldType::new("id", "u", DataType::Int);
        assert_eq!(desc.find_field(&q).unwrap(), 2);
        let q = FieldType::new("id", "t", DataType::Unknown);
        assert_eq!(desc.find_field(&q).unwrap(), 0);
    }

    #[test]
    fn test_find_field_ambiguous() {
        let desc = create_test_desc();
        let q = FieldType::named("id", DataType::Int);
        assert!(matches!(desc.find_field(&q), Err(HeapDbError::AmbiguousName(_))));
    }

    #[test]
    fn test_find_field_unqualified_unique() {
        let desc = create_test_desc();
        let q = FieldType::named("name", DataType::Unknown);
        assert_eq!(desc.find_field(&q).unwrap(), 1);
    }

    #[test]
    fn test_find_field_type_mismatch() {
        let desc = create_test_desc();
        let q = FieldType::named("name", DataType::Int);
        assert!(matches!(desc.find_field(&q), Err(HeapDbError::IncompatibleTypes(_))));
        let q = FieldType::named("missing", DataType::Unknown);
        assert!(matches!(desc.find_field(&q), Err(HeapDbError::IncompatibleTypes(_))));
    }

    #[test]
    fn test_merge_and_qualifier() {
        let a = TupleDesc::builder().field("x", DataType::Int).build();
        let b = TupleDesc::builder().field("y", DataType::String).build();
        let merged = a.merge(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.field(1).unwrap().name, "y");

        let aliased = merged.with_qualifier("m");
        assert!(aliased.fields().iter().all(|f| f.qualifier == "m"));
        assert_ne!(aliased, merged);
    }

    #[test]
    fn test_check_storable() {
        assert!(TupleDesc::default().check_storable().is_err());
        let desc = TupleDesc::builder().field("x", DataType::Unknown).build();
        assert!(matches!(desc.check_storable(), Err(HeapDbError::Malformed(_))));
    }

    #[test]
    fn test_header_string() {
        let desc = create_test_desc();
        assert_eq!(desc.header_string(false), "t.id,t.name,u.id");
        let aligned = desc.header_string(true);
        assert_eq!(aligned.matches('|').count(), 3);
        assert!(aligned.contains("t.name"));
    }
}
