//! # **SuperArray** - *Chunked column of arrays sharing one Field*
//!
//! Contains SuperArray, a logical column split into multiple immutable `Array` chunks.
//!
//! ## Overview
//! - Equivalent to Apache Arrow's `ChunkedArray`.
//! - The `Field` is stored once, behind an `Arc`, and every chunk must have its type.
//! - Chunk lengths may vary.
//! - Crosses the boundary as an `ArrowArrayStream` whose schema is the field and whose
//!   batches are the chunks.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::{Array, Field, FieldArray, Scalar};

/// # SuperArray
///
/// Ordered chunks of one logical column.
///
/// ## Example
/// ```rust
/// use colbridge::{Array, ArrowType, Field, IntegerArray, SuperArray};
///
/// let field = Field::new("x", ArrowType::Int32, false, None);
/// let sa = SuperArray::try_new(
///     field,
///     vec![
///         Array::from_int32(IntegerArray::from_slice(&[1, 2])),
///         Array::from_int32(IntegerArray::from_slice(&[3])),
///     ],
/// )
/// .unwrap();
/// assert_eq!(sa.len(), 3);
/// assert_eq!(sa.n_chunks(), 2);
/// ```
#[derive(PartialEq, Clone, Debug)]
pub struct SuperArray {
    /// Field shared by every chunk.
    pub field: Arc<Field>,
    /// The underlying array chunks.
    pub chunks: Vec<Array>,
}

impl SuperArray {
    /// Builds a chunked array.
    ///
    /// # Errors
    /// `SchemaError` when a chunk's type differs from the field's.
    pub fn try_new(field: impl Into<Arc<Field>>, chunks: Vec<Array>) -> Result<Self> {
        let field = field.into();
        for (i, c) in chunks.iter().enumerate() {
            let actual = c.arrow_type();
            if actual != field.dtype {
                return Err(BridgeError::schema(format!(
                    "chunk {i} of '{}' is {actual}, field declares {}",
                    field.name, field.dtype
                )));
            }
        }
        Ok(Self { field, chunks })
    }

    /// Builds a chunked array from columns, taking the field from the first.
    ///
    /// # Errors
    /// `SchemaError` when the input is empty or the fields differ.
    pub fn from_field_array_chunks(chunks: Vec<FieldArray>) -> Result<Self> {
        let Some(first) = chunks.first() else {
            return Err(BridgeError::schema("cannot infer a field from zero chunks"));
        };
        let field = first.field.clone();
        for c in &chunks[1..] {
            if c.field != field {
                return Err(BridgeError::schema(format!(
                    "chunk field {} differs from {}",
                    c.field, field
                )));
            }
        }
        Self::try_new(field, chunks.into_iter().map(|c| c.array).collect())
    }

    /// Appends a chunk, checking its type.
    pub fn push(&mut self, chunk: Array) -> Result<()> {
        let actual = chunk.arrow_type();
        if actual != self.field.dtype {
            return Err(BridgeError::schema(format!(
                "chunk of '{}' is {actual}, field declares {}",
                self.field.name, self.field.dtype
            )));
        }
        self.chunks.push(chunk);
        Ok(())
    }

    #[inline]
    pub fn arrow_type(&self) -> ArrowType {
        self.field.dtype.clone()
    }

    #[inline]
    pub fn n_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Total length across chunks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Array::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        self.chunks.iter().map(Array::null_count).sum()
    }

    #[inline]
    pub fn chunk(&self, idx: usize) -> Option<&Array> {
        self.chunks.get(idx)
    }

    /// Chunks as `FieldArray`s sharing the field.
    pub fn field_arrays(&self) -> Vec<FieldArray> {
        self.chunks
            .iter()
            .map(|c| FieldArray::new(self.field.clone(), c.clone()))
            .collect()
    }

    /// All values across chunks, decoded.
    pub fn to_list(&self) -> Vec<Scalar> {
        self.chunks.iter().flat_map(Array::to_list).collect()
    }
}

impl Display for SuperArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SuperArray {} [{} rows in {} chunks]", self.field, self.len(), self.n_chunks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FloatArray, IntegerArray};

    #[test]
    fn chunk_type_is_checked() {
        let field = Field::new("x", ArrowType::Int32, true, None);
        let mut sa = SuperArray::try_new(field, vec![]).unwrap();
        assert!(sa.push(Array::from_float64(FloatArray::from_slice(&[1.0]))).is_err());
        sa.push(Array::from_int32(IntegerArray::from_options(&[None, Some(1)]))).unwrap();
        assert_eq!(sa.null_count(), 1);
        assert_eq!(sa.to_list(), vec![Scalar::Null, Scalar::Int(1)]);
    }
}
