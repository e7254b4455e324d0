//! # **ListArray Module** - *Variable-length lists of a single child type*
//!
//! `+l` (`T = u32`, 32-bit offsets) and `+L` (`T = u64`, 64-bit offsets). Offsets are
//! absolute into the child array, so slicing a list only narrows its offsets window.

use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::traits::type_unions::OffsetType;
use crate::{Array, Bitmask, Buffer, Field, MaskedArray, Scalar, Vec64, vec64};

/// # ListArray
///
/// ### Fields
/// - `offsets`: `len + 1` boundaries into `values`.
/// - `values`: the flattened child array.
/// - `field`: child field, named `item` by convention.
/// - `null_mask`: optional list-level validity.
#[derive(PartialEq, Clone, Debug)]
pub struct ListArray<T: OffsetType> {
    pub offsets: Buffer<T>,
    pub values: Array,
    pub field: Arc<Field>,
    pub null_mask: Option<Bitmask>,
}

impl<T: OffsetType> ListArray<T> {
    /// Builds a list array over `values`.
    ///
    /// # Errors
    /// - `SchemaError` when `values` is not of the child field's type.
    /// - `ImportError` when offsets decrease or run past `values`, or the mask length differs.
    pub fn try_new(
        field: impl Into<Arc<Field>>,
        offsets: Buffer<T>,
        values: Array,
        null_mask: Option<Bitmask>,
    ) -> Result<Self> {
        let field = field.into();
        let actual = values.arrow_type();
        if actual != field.dtype {
            return Err(BridgeError::schema(format!(
                "list child '{}' is {actual}, field declares {}",
                field.name, field.dtype
            )));
        }
        let offsets = if offsets.is_empty() {
            Buffer::from_vec64(vec64![T::zero()])
        } else {
            offsets
        };
        for (i, w) in offsets.windows(2).enumerate() {
            if w[0] > w[1] {
                return Err(BridgeError::import(format!("list offsets decrease at index {i}")));
            }
        }
        let last = offsets[offsets.len() - 1].as_usize();
        if last > values.len() {
            return Err(BridgeError::import(format!(
                "list offset {last} exceeds child length {}",
                values.len()
            )));
        }
        let len = offsets.len() - 1;
        if let Some(mask) = &null_mask {
            if mask.len() != len {
                return Err(BridgeError::import(format!(
                    "list validity has {} bits for {len} lists",
                    mask.len()
                )));
            }
        }
        Ok(Self {
            offsets,
            values,
            field,
            null_mask,
        })
    }

    /// Builds a list array from per-list child slices, concatenated into `values`.
    ///
    /// `None` entries become null, empty lists.
    pub fn from_lengths(field: impl Into<Arc<Field>>, values: Array, lengths: &[Option<usize>]) -> Result<Self> {
        let mut offsets = Vec64::with_capacity(lengths.len() + 1);
        let mut acc = 0usize;
        offsets.push(T::zero());
        for l in lengths {
            acc += l.unwrap_or(0);
            offsets.push(T::from_usize(acc));
        }
        let null_mask = lengths
            .iter()
            .any(Option::is_none)
            .then(|| Bitmask::from_bools(&lengths.iter().map(Option::is_some).collect::<Vec<_>>()));
        Self::try_new(field, Buffer::from_vec64(offsets), values, null_mask)
    }

    /// Child values of list `idx`, or `None` when null.
    pub fn list(&self, idx: usize) -> Option<Array> {
        if self.is_null(idx) {
            return None;
        }
        let start = self.offsets[idx].as_usize();
        let end = self.offsets[idx + 1].as_usize();
        Some(self.values.slice(start, end - start))
    }

    pub fn value(&self, idx: usize) -> Scalar {
        self.list(idx)
            .map_or(Scalar::Null, |a| Scalar::List(a.to_list()))
    }

    /// Zero-copy window `[offset, offset + len)`. The child array is shared unchanged.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        Self {
            offsets: self.offsets.slice(offset, len + 1),
            values: self.values.clone(),
            field: self.field.clone(),
            null_mask: self.null_mask.as_ref().map(|m| m.slice(offset, len)),
        }
    }
}

impl<T: OffsetType> MaskedArray for ListArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArrowType, IntegerArray};

    fn item() -> Field {
        Field::new("item", ArrowType::Int32, true, None)
    }

    #[test]
    fn lists_from_lengths() {
        let values = Array::from_int32(IntegerArray::from_slice(&[1, 2, 3]));
        let l = ListArray::<u32>::from_lengths(item(), values, &[Some(2), None, Some(1), Some(0)]).unwrap();
        assert_eq!(l.len(), 4);
        assert_eq!(l.value(0), Scalar::List(vec![Scalar::Int(1), Scalar::Int(2)]));
        assert_eq!(l.value(1), Scalar::Null);
        assert_eq!(l.value(3), Scalar::List(vec![]));
        assert_eq!(l.slice(2, 1).value(0), Scalar::List(vec![Scalar::Int(3)]));
    }

    #[test]
    fn offsets_past_child_rejected() {
        let values = Array::from_int32(IntegerArray::from_slice(&[1]));
        let err = ListArray::<u64>::try_new(item(), Buffer::from_vec(vec![0, 2]), values, None).unwrap_err();
        assert!(matches!(err, BridgeError::ImportError(_)));
    }
}
