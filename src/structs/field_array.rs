//! # FieldArray Module - *Column array tagged with its Field*
//!
//! Couples a `Field` (name, logical type, nullability, metadata) with an immutable
//! `Array` of values.
//!
//! This is the unit exported as an `(ArrowArray, ArrowSchema)` pair, and the column
//! type of `Table`. The field's `ArrowType` decides the format string on the wire, so
//! temporal columns should be built with the exact logical type intended.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::ffi::arrow_dtype::ArrowType;
use crate::{Array, Field};

/// # FieldArray
///
/// Named and typed data column with associated array values.
///
/// ```rust
/// use colbridge::{Array, ArrowType, Field, FieldArray, IntegerArray};
/// use colbridge::structs::field_array::field_array;
///
/// let arr = Array::from_int32(IntegerArray::from_slice(&[1, 2]));
///
/// // Infers type and nullability
/// let fa = field_array("id", arr.clone());
/// assert_eq!(fa.arrow_type(), ArrowType::Int32);
/// assert!(!fa.field.nullable);
///
/// // Explicit field
/// let fa = FieldArray::new(Field::new("id", ArrowType::Int32, true, None), arr);
/// assert_eq!(fa.slice(0, 1).len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArray {
    /// Column metadata, shared with the schemas built from it.
    pub field: Arc<Field>,

    /// Column values.
    pub array: Array,

    /// Cached null count of `array`.
    pub null_count: usize,
}

impl FieldArray {
    /// Binds `field` to `array`. Consistency between the two is checked on export.
    pub fn new(field: impl Into<Arc<Field>>, array: Array) -> Self {
        let null_count = array.null_count();
        FieldArray {
            field: field.into(),
            array,
            null_count,
        }
    }

    /// Builds the field from the array, see [`Field::from_array`].
    pub fn from_arr(name: impl Into<String>, array: Array) -> Self {
        let field = Field::from_array(name, &array, None);
        FieldArray::new(field, array)
    }

    /// Builds the field from the array, with metadata.
    pub fn from_parts(name: impl Into<String>, array: Array, metadata: BTreeMap<String, String>) -> Self {
        let field = Field::from_array(name, &array, Some(metadata));
        FieldArray::new(field, array)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Declared logical type.
    #[inline]
    pub fn arrow_type(&self) -> ArrowType {
        self.field.dtype.clone()
    }

    /// Zero-copy window `[offset, offset + len)`, keeping the field.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        FieldArray::new(self.field.clone(), self.array.slice(offset, len))
    }
}

/// Shorthand for [`FieldArray::from_arr`].
pub fn field_array(name: impl Into<String>, array: Array) -> FieldArray {
    FieldArray::from_arr(name, array)
}

impl Display for FieldArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{} rows, {} nulls]", self.field, self.len(), self.null_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringArray;

    #[test]
    fn slice_recounts_nulls() {
        let fa = field_array("s", Array::from_string32(StringArray::from_options(&[Some("a"), None, Some("c")])));
        assert_eq!(fa.null_count, 1);
        let tail = fa.slice(2, 1);
        assert_eq!(tail.null_count, 0);
        assert!(tail.field.nullable);
    }
}
