//! # Field Module - *Arrow-compliant column metadata*
//!
//! A `Field` captures a column's name, logical type, nullability and key/value
//! metadata. It is the in-memory form of one node of an `ArrowSchema` tree.
//!
//! This module holds only the schema description, no row data. Pair with
//! `FieldArray` to bind a field to values.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::ffi::arrow_dtype::ArrowType;
use crate::Array;

/// # Field
///
/// ## Description
/// - Name, logical type and nullability of a column or nested child.
/// - Light metadata as a few key/value pairs, carried through `ArrowSchema.metadata`.
///
/// ### Tips:
/// - `Field` is cloned often, and nested types share it through `Arc`.
/// - For temporal arrays, the `ArrowType` carries the logical type (e.g. `Timestamp`
///   vs `Duration`), so the correct format string is produced on export.
/// - Names may be empty. Arrow permits it, and it must survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub dtype: ArrowType,
    pub nullable: bool,
    pub metadata: BTreeMap<String, String>,
}

impl Field {
    /// Constructs a new `Field`.
    pub fn new<T: Into<String>>(
        name: T,
        dtype: ArrowType,
        nullable: bool,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Self {
        Field {
            name: name.into(),
            dtype,
            nullable,
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// Constructs a new `Field` from an `Array`, taking the dtype from the array and
    /// marking it nullable when the array carries a validity mask.
    pub fn from_array(
        name: impl Into<String>,
        array: &Array,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Self {
        let nullable = match array {
            Array::Null(_) => true,
            other => other.null_mask().is_some(),
        };
        Field::new(name, array.arrow_type(), nullable, metadata)
    }

    /// Returns a copy with `metadata` merged in.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Copy of the field with its type replaced by [`ArrowType::materialised`].
    pub fn materialised(&self) -> Field {
        Field {
            dtype: self.dtype.materialised(),
            ..self.clone()
        }
    }
}

/// Nullability check used by the exporter: a non-nullable field must not hold nulls.
pub(crate) fn nulls_allowed(field: &Field, array: &Array) -> bool {
    field.nullable || array.null_count() == 0
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Field \"{}\": {}{}",
            self.name,
            self.dtype,
            if self.nullable { " (nullable)" } else { "" }
        )?;
        if !self.metadata.is_empty() {
            write!(f, " [metadata: {:?}]", self.metadata)?;
        }
        Ok(())
    }
}

impl From<&Field> for Field {
    fn from(f: &Field) -> Self {
        f.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntegerArray;

    #[test]
    fn from_array_reads_mask() {
        let dense = Array::from_int32(IntegerArray::from_slice(&[1, 2]));
        assert!(!Field::from_array("a", &dense, None).nullable);
        let masked = Array::from_int32(IntegerArray::from_options(&[Some(1), None]));
        let f = Field::from_array("b", &masked, None);
        assert!(f.nullable);
        assert_eq!(f.dtype, ArrowType::Int32);
    }

    #[test]
    fn empty_names_are_kept() {
        assert_eq!(Field::new("", ArrowType::Null, true, None).name, "");
    }

    #[test]
    fn display_lists_metadata() {
        let mut meta = BTreeMap::new();
        meta.insert("unit".to_string(), "m".to_string());
        let f = Field::new("len", ArrowType::Float64, false, Some(meta));
        assert_eq!(f.to_string(), "Field \"len\": Float64 [metadata: {\"unit\": \"m\"}]");
    }
}
