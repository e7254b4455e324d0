//! # **Array Module** - *Main High-Level Array Type*
//!
//! `Array` is the unified container for every array type that crosses the interchange
//! boundary.
//!
//! ## Features:
//! - one variant per physical layout family: null, numeric, boolean, text, dictionary,
//!   temporal, struct and the two list widths
//! - the logical `ArrowType` of any array, derived from its variant and parameters
//! - zero-copy slicing and value-level inspection through `Scalar`
//! - cheap clones: every variant holds `Arc`s, so cloning never copies buffers.

use std::sync::Arc;

#[cfg(feature = "datetime")]
use crate::{DatetimeArray, IntervalArray, TemporalArray};
use crate::ffi::arrow_dtype::ArrowType;
use crate::{
    Bitmask, BooleanArray, CategoricalArray, FloatArray, IntegerArray, ListArray, MaskedArray,
    NumericArray, Scalar, StringArray, StructArray, TextArray,
};

/// # Array
///
/// Standard `Array` type. Wrap in a `FieldArray` to attach a name, nullability and
/// metadata, which is what the schema encoder needs.
///
/// ## Overview
/// - Functions typically match on the outer enum for broad category handling
///   *(numeric, text, temporal, nested)*, and on the inner enums for exact types.
/// - Nested variants (`CategoricalArray`, `StructArray`, lists) hold further `Array`s,
///   so any supported Arrow type tree has a representation.
///
/// ## Examples
/// ```rust
/// use colbridge::{Array, ArrowType, IntegerArray, Scalar, StringArray};
///
/// let ints = Array::from_int32(IntegerArray::from_slice(&[1, 2, 3]));
/// assert_eq!(ints.arrow_type(), ArrowType::Int32);
/// assert_eq!(ints.slice(1, 2).to_list(), vec![Scalar::Int(2), Scalar::Int(3)]);
///
/// let strs = Array::from_string64(StringArray::from_strs(&["a", "b"]));
/// assert_eq!(strs.arrow_type(), ArrowType::LargeString);
/// ```
#[derive(PartialEq, Clone, Debug)]
pub enum Array {
    /// All-null array of the given length, with no buffers.
    Null(usize),
    NumericArray(NumericArray),
    BooleanArray(Arc<BooleanArray>),
    TextArray(TextArray),
    CategoricalArray(Arc<CategoricalArray>),
    #[cfg(feature = "datetime")]
    TemporalArray(TemporalArray),
    StructArray(Arc<StructArray>),
    ListArray(Arc<ListArray<u32>>),
    LargeListArray(Arc<ListArray<u64>>),
}

impl Default for Array {
    fn default() -> Self {
        Array::Null(0)
    }
}

impl Array {
    pub fn from_int8(arr: IntegerArray<i8>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_int16(arr: IntegerArray<i16>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_int32(arr: IntegerArray<i32>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_int64(arr: IntegerArray<i64>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_uint8(arr: IntegerArray<u8>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_uint16(arr: IntegerArray<u16>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_uint32(arr: IntegerArray<u32>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_uint64(arr: IntegerArray<u64>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_float32(arr: FloatArray<f32>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_float64(arr: FloatArray<f64>) -> Self {
        Array::NumericArray(arr.into())
    }
    pub fn from_bool(arr: BooleanArray) -> Self {
        Array::BooleanArray(Arc::new(arr))
    }
    pub fn from_string32(arr: StringArray<u32>) -> Self {
        Array::TextArray(arr.into())
    }
    pub fn from_string64(arr: StringArray<u64>) -> Self {
        Array::TextArray(arr.into())
    }
    pub fn from_categorical(arr: CategoricalArray) -> Self {
        Array::CategoricalArray(Arc::new(arr))
    }
    pub fn from_struct(arr: StructArray) -> Self {
        Array::StructArray(Arc::new(arr))
    }
    pub fn from_list(arr: ListArray<u32>) -> Self {
        Array::ListArray(Arc::new(arr))
    }
    pub fn from_large_list(arr: ListArray<u64>) -> Self {
        Array::LargeListArray(Arc::new(arr))
    }

    #[cfg(feature = "datetime")]
    pub fn from_date32(arr: DatetimeArray<i32>) -> Self {
        Array::TemporalArray(TemporalArray::Date32(Arc::new(arr)))
    }
    #[cfg(feature = "datetime")]
    pub fn from_date64(arr: DatetimeArray<i64>) -> Self {
        Array::TemporalArray(TemporalArray::Date64(Arc::new(arr)))
    }
    #[cfg(feature = "datetime")]
    pub fn from_time32(arr: DatetimeArray<i32>) -> Self {
        Array::TemporalArray(TemporalArray::Time32(Arc::new(arr)))
    }
    #[cfg(feature = "datetime")]
    pub fn from_time64(arr: DatetimeArray<i64>) -> Self {
        Array::TemporalArray(TemporalArray::Time64(Arc::new(arr)))
    }
    #[cfg(feature = "datetime")]
    pub fn from_timestamp(arr: DatetimeArray<i64>) -> Self {
        Array::TemporalArray(TemporalArray::Timestamp(Arc::new(arr)))
    }
    #[cfg(feature = "datetime")]
    pub fn from_duration(arr: DatetimeArray<i64>) -> Self {
        Array::TemporalArray(TemporalArray::Duration(Arc::new(arr)))
    }
    #[cfg(feature = "datetime")]
    pub fn from_interval(arr: IntervalArray) -> Self {
        Array::TemporalArray(TemporalArray::Interval(Arc::new(arr)))
    }

    /// Number of logical elements.
    pub fn len(&self) -> usize {
        match self {
            Array::Null(n) => *n,
            Array::NumericArray(a) => a.len(),
            Array::BooleanArray(a) => a.len(),
            Array::TextArray(a) => a.len(),
            Array::CategoricalArray(a) => a.len(),
            #[cfg(feature = "datetime")]
            Array::TemporalArray(a) => a.len(),
            Array::StructArray(a) => a.len(),
            Array::ListArray(a) => a.len(),
            Array::LargeListArray(a) => a.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validity bitmap, if any. `Null` arrays have none.
    pub fn null_mask(&self) -> Option<&Bitmask> {
        match self {
            Array::Null(_) => None,
            Array::NumericArray(a) => a.null_mask(),
            Array::BooleanArray(a) => a.null_mask.as_ref(),
            Array::TextArray(a) => a.null_mask(),
            Array::CategoricalArray(a) => a.null_mask(),
            #[cfg(feature = "datetime")]
            Array::TemporalArray(a) => a.null_mask(),
            Array::StructArray(a) => a.null_mask.as_ref(),
            Array::ListArray(a) => a.null_mask.as_ref(),
            Array::LargeListArray(a) => a.null_mask.as_ref(),
        }
    }

    /// Number of nulls. Every slot of a `Null` array is null.
    pub fn null_count(&self) -> usize {
        match self {
            Array::Null(n) => *n,
            other => other.null_mask().map_or(0, Bitmask::count_zeros),
        }
    }

    /// Logical type, derived from the variant and its parameters.
    pub fn arrow_type(&self) -> ArrowType {
        match self {
            Array::Null(_) => ArrowType::Null,
            Array::NumericArray(a) => a.arrow_type(),
            Array::BooleanArray(_) => ArrowType::Boolean,
            Array::TextArray(a) => a.arrow_type(),
            Array::CategoricalArray(a) => a.arrow_type(),
            #[cfg(feature = "datetime")]
            Array::TemporalArray(a) => a.arrow_type(),
            Array::StructArray(a) => a.arrow_type(),
            Array::ListArray(a) => ArrowType::List(a.field.clone()),
            Array::LargeListArray(a) => ArrowType::LargeList(a.field.clone()),
        }
    }

    /// Zero-copy window `[offset, offset + len)`.
    ///
    /// # Panics
    /// If the window is out of bounds.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len(),
            "Array::slice: {offset}+{len} out of bounds for length {}",
            self.len()
        );
        match self {
            Array::Null(_) => Array::Null(len),
            Array::NumericArray(a) => Array::NumericArray(a.slice(offset, len)),
            Array::BooleanArray(a) => Array::BooleanArray(Arc::new(a.slice(offset, len))),
            Array::TextArray(a) => Array::TextArray(a.slice(offset, len)),
            Array::CategoricalArray(a) => Array::CategoricalArray(Arc::new(a.slice(offset, len))),
            #[cfg(feature = "datetime")]
            Array::TemporalArray(a) => Array::TemporalArray(a.slice(offset, len)),
            Array::StructArray(a) => Array::StructArray(Arc::new(a.slice(offset, len))),
            Array::ListArray(a) => Array::ListArray(Arc::new(a.slice(offset, len))),
            Array::LargeListArray(a) => Array::LargeListArray(Arc::new(a.slice(offset, len))),
        }
    }

    /// Value at `idx` as a `Scalar`.
    ///
    /// # Panics
    /// If `idx` is out of bounds.
    pub fn value(&self, idx: usize) -> Scalar {
        assert!(idx < self.len(), "Array::value: index {idx} out of bounds for length {}", self.len());
        match self {
            Array::Null(_) => Scalar::Null,
            Array::NumericArray(a) => a.value(idx),
            Array::BooleanArray(a) => a.get(idx).map_or(Scalar::Null, Scalar::Boolean),
            Array::TextArray(a) => a.value(idx),
            Array::CategoricalArray(a) => a.value(idx),
            #[cfg(feature = "datetime")]
            Array::TemporalArray(a) => a.value(idx),
            Array::StructArray(a) => a.value(idx),
            Array::ListArray(a) => a.value(idx),
            Array::LargeListArray(a) => a.value(idx),
        }
    }

    /// All values, decoded.
    pub fn to_list(&self) -> Vec<Scalar> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }

    /// Inner numeric array, if this is one.
    pub fn num(&self) -> Option<&NumericArray> {
        match self {
            Array::NumericArray(a) => Some(a),
            _ => None,
        }
    }

    /// Inner string array, if this is one.
    pub fn str(&self) -> Option<&TextArray> {
        match self {
            Array::TextArray(a) => Some(a),
            _ => None,
        }
    }
}

impl From<NumericArray> for Array {
    fn from(a: NumericArray) -> Self {
        Array::NumericArray(a)
    }
}

impl From<TextArray> for Array {
    fn from(a: TextArray) -> Self {
        Array::TextArray(a)
    }
}

#[cfg(feature = "datetime")]
impl From<TemporalArray> for Array {
    fn from(a: TemporalArray) -> Self {
        Array::TemporalArray(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;

    #[test]
    fn null_array_counts_every_slot() {
        let a = Array::Null(3);
        assert_eq!(a.null_count(), 3);
        assert_eq!(a.slice(1, 2).len(), 2);
        assert_eq!(a.to_list(), vec![Scalar::Null; 3]);
    }

    #[test]
    fn nested_types_derive_from_children() {
        let child = Field::new("item", ArrowType::Boolean, true, None);
        let l = ListArray::<u64>::from_lengths(
            child.clone(),
            Array::from_bool(BooleanArray::from_slice(&[true, false])),
            &[Some(2)],
        )
        .unwrap();
        let arr = Array::from_large_list(l);
        assert_eq!(arr.arrow_type(), ArrowType::large_list_of(child));
    }

    #[cfg(feature = "datetime")]
    #[test]
    fn temporal_type_carries_unit_and_zone() {
        use crate::TimeUnit;
        let ts = DatetimeArray::<i64>::from_slice(&[0], TimeUnit::Microseconds).with_timezone("UTC");
        assert_eq!(
            Array::from_timestamp(ts).arrow_type(),
            ArrowType::Timestamp(TimeUnit::Microseconds, Some("UTC".into()))
        );
    }
}
