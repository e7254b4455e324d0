//! # **StructArray Module** - *Named child arrays of equal length*
//!
//! The `+s` layout: one validity buffer on the parent and one child per field.
//! Also the wire shape of a record batch, see `Table::to_struct_array`.

use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::{Array, Bitmask, Field, MaskedArray, Scalar};

/// # StructArray
///
/// ### Fields
/// - `fields`: child field definitions, shared with the `ArrowType::Struct` they form.
/// - `children`: one array per field, each `len` long.
/// - `null_mask`: optional struct-level validity.
/// - `len`: row count, explicit so that zero-child structs keep a length.
#[derive(PartialEq, Clone, Debug)]
pub struct StructArray {
    pub fields: Arc<[Field]>,
    pub children: Vec<Array>,
    pub null_mask: Option<Bitmask>,
    pub len: usize,
}

impl StructArray {
    /// Builds a struct array, taking the length from the first child.
    pub fn try_new(fields: Vec<Field>, children: Vec<Array>, null_mask: Option<Bitmask>) -> Result<Self> {
        let len = children
            .first()
            .map(Array::len)
            .or_else(|| null_mask.as_ref().map(Bitmask::len))
            .unwrap_or(0);
        Self::try_new_with_len(Arc::from(fields), children, null_mask, len)
    }

    /// Builds a struct array of `len` rows.
    ///
    /// # Errors
    /// `SchemaError` when the child count differs from the field count, a child has the
    /// wrong length or a type other than its field's, or the mask length differs.
    pub fn try_new_with_len(
        fields: Arc<[Field]>,
        children: Vec<Array>,
        null_mask: Option<Bitmask>,
        len: usize,
    ) -> Result<Self> {
        if fields.len() != children.len() {
            return Err(BridgeError::schema(format!(
                "struct has {} fields but {} children",
                fields.len(),
                children.len()
            )));
        }
        for (field, child) in fields.iter().zip(&children) {
            if child.len() != len {
                return Err(BridgeError::schema(format!(
                    "struct child '{}' has length {}, expected {len}",
                    field.name,
                    child.len()
                )));
            }
            let actual = child.arrow_type();
            if actual != field.dtype {
                return Err(BridgeError::schema(format!(
                    "struct child '{}' is {actual}, field declares {}",
                    field.name, field.dtype
                )));
            }
        }
        if let Some(mask) = &null_mask {
            if mask.len() != len {
                return Err(BridgeError::schema(format!(
                    "struct validity has {} bits for {len} rows",
                    mask.len()
                )));
            }
        }
        Ok(Self {
            fields,
            children,
            null_mask,
            len,
        })
    }

    /// `ArrowType::Struct` sharing this array's fields.
    pub fn arrow_type(&self) -> ArrowType {
        ArrowType::Struct(self.fields.clone())
    }

    /// Child array for the field named `name`.
    pub fn child(&self, name: &str) -> Option<&Array> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.children[i])
    }

    /// Row `idx` as a `Scalar::Struct`, or `Scalar::Null` when the row is null.
    pub fn value(&self, idx: usize) -> Scalar {
        if self.is_null(idx) {
            return Scalar::Null;
        }
        Scalar::Struct(
            self.fields
                .iter()
                .zip(&self.children)
                .map(|(f, c)| (f.name.clone(), c.value(idx)))
                .collect(),
        )
    }

    /// Zero-copy window over every child and the validity.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(offset + len <= self.len, "StructArray::slice out of bounds");
        Self {
            fields: self.fields.clone(),
            children: self.children.iter().map(|c| c.slice(offset, len)).collect(),
            null_mask: self.null_mask.as_ref().map(|m| m.slice(offset, len)),
            len,
        }
    }
}

impl MaskedArray for StructArray {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntegerArray;

    fn ids() -> Array {
        Array::from_int64(IntegerArray::from_slice(&[1, 2, 3]))
    }

    #[test]
    fn child_type_must_match_field() {
        let err = StructArray::try_new(vec![Field::new("id", ArrowType::Int32, false, None)], vec![ids()], None)
            .unwrap_err();
        assert!(matches!(err, BridgeError::SchemaError(_)));
    }

    #[test]
    fn zero_children_keep_length() {
        let s = StructArray::try_new_with_len(Arc::from(Vec::<Field>::new()), vec![], None, 4).unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.value(0), Scalar::Struct(vec![]));
    }

    #[test]
    fn slice_and_lookup() {
        let s = StructArray::try_new(vec![Field::new("id", ArrowType::Int64, false, None)], vec![ids()], None)
            .unwrap()
            .slice(1, 2);
        assert_eq!(s.child("id").map(Array::len), Some(2));
        assert_eq!(s.value(1), Scalar::Struct(vec![("id".into(), Scalar::Int(3))]));
    }
}
