//! # **NumericArray Module** - *Unified integer and floating-point arrays*
//!
//! NumericArray unifies all integer and floating-point arrays into a single enum,
//! so the exporter, importer and dictionary keys dispatch on one type.
//!
//! ## Features
//! - direct variant access, one per fixed-width primitive
//! - the logical type and raw value pointer for export
//! - dictionary key reads widened to `i64`, for categorical validation and decoding

use std::sync::Arc;

use crate::ffi::arrow_dtype::{ArrowType, IndexType};
use crate::{Bitmask, FloatArray, IntegerArray, MaskedArray, Scalar};

/// # NumericArray
///
/// Unified numerical array container.
///
/// ## Usage:
/// - Accessible from `Array` through the `NumericArray` arm.
/// - Inner arrays sit behind `Arc`, so clones are cheap and share buffers.
/// - Integer variants double as dictionary keys inside `CategoricalArray`.
#[derive(PartialEq, Clone, Debug)]
pub enum NumericArray {
    Int8(Arc<IntegerArray<i8>>),
    Int16(Arc<IntegerArray<i16>>),
    Int32(Arc<IntegerArray<i32>>),
    Int64(Arc<IntegerArray<i64>>),
    UInt8(Arc<IntegerArray<u8>>),
    UInt16(Arc<IntegerArray<u16>>),
    UInt32(Arc<IntegerArray<u32>>),
    UInt64(Arc<IntegerArray<u64>>),
    Float32(Arc<FloatArray<f32>>),
    Float64(Arc<FloatArray<f64>>),
}

/// Applies `$body` to the inner array of every variant, binding it as `$a`.
macro_rules! with_numeric {
    ($self:expr, $a:ident => $body:expr) => {
        match $self {
            NumericArray::Int8($a) => $body,
            NumericArray::Int16($a) => $body,
            NumericArray::Int32($a) => $body,
            NumericArray::Int64($a) => $body,
            NumericArray::UInt8($a) => $body,
            NumericArray::UInt16($a) => $body,
            NumericArray::UInt32($a) => $body,
            NumericArray::UInt64($a) => $body,
            NumericArray::Float32($a) => $body,
            NumericArray::Float64($a) => $body,
        }
    };
}

impl NumericArray {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        with_numeric!(self, a => a.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validity bitmap, if any.
    #[inline]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        with_numeric!(self, a => a.null_mask.as_ref())
    }

    /// Number of nulls.
    #[inline]
    pub fn null_count(&self) -> usize {
        with_numeric!(self, a => a.null_count())
    }

    /// Logical type of the values.
    pub fn arrow_type(&self) -> ArrowType {
        match self {
            NumericArray::Int8(_) => ArrowType::Int8,
            NumericArray::Int16(_) => ArrowType::Int16,
            NumericArray::Int32(_) => ArrowType::Int32,
            NumericArray::Int64(_) => ArrowType::Int64,
            NumericArray::UInt8(_) => ArrowType::UInt8,
            NumericArray::UInt16(_) => ArrowType::UInt16,
            NumericArray::UInt32(_) => ArrowType::UInt32,
            NumericArray::UInt64(_) => ArrowType::UInt64,
            NumericArray::Float32(_) => ArrowType::Float32,
            NumericArray::Float64(_) => ArrowType::Float64,
        }
    }

    /// Dictionary key width, or `None` for floating-point arrays.
    pub fn index_type(&self) -> Option<IndexType> {
        IndexType::from_key_type(&self.arrow_type())
    }

    /// Zero-copy window `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        match self {
            NumericArray::Int8(a) => NumericArray::Int8(Arc::new(a.slice(offset, len))),
            NumericArray::Int16(a) => NumericArray::Int16(Arc::new(a.slice(offset, len))),
            NumericArray::Int32(a) => NumericArray::Int32(Arc::new(a.slice(offset, len))),
            NumericArray::Int64(a) => NumericArray::Int64(Arc::new(a.slice(offset, len))),
            NumericArray::UInt8(a) => NumericArray::UInt8(Arc::new(a.slice(offset, len))),
            NumericArray::UInt16(a) => NumericArray::UInt16(Arc::new(a.slice(offset, len))),
            NumericArray::UInt32(a) => NumericArray::UInt32(Arc::new(a.slice(offset, len))),
            NumericArray::UInt64(a) => NumericArray::UInt64(Arc::new(a.slice(offset, len))),
            NumericArray::Float32(a) => NumericArray::Float32(Arc::new(a.slice(offset, len))),
            NumericArray::Float64(a) => NumericArray::Float64(Arc::new(a.slice(offset, len))),
        }
    }

    /// Value at `idx` as a `Scalar`.
    pub fn value(&self, idx: usize) -> Scalar {
        match self {
            NumericArray::Int8(a) => a.get(idx).map_or(Scalar::Null, |v| Scalar::Int(v as i64)),
            NumericArray::Int16(a) => a.get(idx).map_or(Scalar::Null, |v| Scalar::Int(v as i64)),
            NumericArray::Int32(a) => a.get(idx).map_or(Scalar::Null, |v| Scalar::Int(v as i64)),
            NumericArray::Int64(a) => a.get(idx).map_or(Scalar::Null, Scalar::Int),
            NumericArray::UInt8(a) => a.get(idx).map_or(Scalar::Null, |v| Scalar::UInt(v as u64)),
            NumericArray::UInt16(a) => a.get(idx).map_or(Scalar::Null, |v| Scalar::UInt(v as u64)),
            NumericArray::UInt32(a) => a.get(idx).map_or(Scalar::Null, |v| Scalar::UInt(v as u64)),
            NumericArray::UInt64(a) => a.get(idx).map_or(Scalar::Null, Scalar::UInt),
            NumericArray::Float32(a) => a.get(idx).map_or(Scalar::Null, |v| Scalar::Float(v as f64)),
            NumericArray::Float64(a) => a.get(idx).map_or(Scalar::Null, Scalar::Float),
        }
    }

    /// Dictionary key at `idx` widened to `i128`, or `None` when null or not an integer array.
    ///
    /// `i128` holds every `u64` key, so out-of-range keys are never masked by wrapping.
    pub fn key_at(&self, idx: usize) -> Option<i128> {
        match self {
            NumericArray::Int8(a) => a.get(idx).map(i128::from),
            NumericArray::Int16(a) => a.get(idx).map(i128::from),
            NumericArray::Int32(a) => a.get(idx).map(i128::from),
            NumericArray::Int64(a) => a.get(idx).map(i128::from),
            NumericArray::UInt8(a) => a.get(idx).map(i128::from),
            NumericArray::UInt16(a) => a.get(idx).map(i128::from),
            NumericArray::UInt32(a) => a.get(idx).map(i128::from),
            NumericArray::UInt64(a) => a.get(idx).map(i128::from),
            NumericArray::Float32(_) | NumericArray::Float64(_) => None,
        }
    }

    /// Pointer to the first value, for an `ArrowArray` buffer slot.
    pub(crate) fn values_ptr(&self) -> *const u8 {
        with_numeric!(self, a => a.data.as_ptr() as *const u8)
    }
}

impl From<IntegerArray<i8>> for NumericArray {
    fn from(a: IntegerArray<i8>) -> Self {
        NumericArray::Int8(Arc::new(a))
    }
}
impl From<IntegerArray<i16>> for NumericArray {
    fn from(a: IntegerArray<i16>) -> Self {
        NumericArray::Int16(Arc::new(a))
    }
}
impl From<IntegerArray<i32>> for NumericArray {
    fn from(a: IntegerArray<i32>) -> Self {
        NumericArray::Int32(Arc::new(a))
    }
}
impl From<IntegerArray<i64>> for NumericArray {
    fn from(a: IntegerArray<i64>) -> Self {
        NumericArray::Int64(Arc::new(a))
    }
}
impl From<IntegerArray<u8>> for NumericArray {
    fn from(a: IntegerArray<u8>) -> Self {
        NumericArray::UInt8(Arc::new(a))
    }
}
impl From<IntegerArray<u16>> for NumericArray {
    fn from(a: IntegerArray<u16>) -> Self {
        NumericArray::UInt16(Arc::new(a))
    }
}
impl From<IntegerArray<u32>> for NumericArray {
    fn from(a: IntegerArray<u32>) -> Self {
        NumericArray::UInt32(Arc::new(a))
    }
}
impl From<IntegerArray<u64>> for NumericArray {
    fn from(a: IntegerArray<u64>) -> Self {
        NumericArray::UInt64(Arc::new(a))
    }
}
impl From<FloatArray<f32>> for NumericArray {
    fn from(a: FloatArray<f32>) -> Self {
        NumericArray::Float32(Arc::new(a))
    }
}
impl From<FloatArray<f64>> for NumericArray {
    fn from(a: FloatArray<f64>) -> Self {
        NumericArray::Float64(Arc::new(a))
    }
}
