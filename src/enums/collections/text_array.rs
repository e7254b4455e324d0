//! # **TextArray Module** - *UTF-8 strings in both offset widths*
//!
//! Groups the 32-bit (`u`) and 64-bit (`U`) offset string arrays under one enum.

use std::sync::Arc;

use crate::ffi::arrow_dtype::ArrowType;
use crate::{Bitmask, MaskedArray, Scalar, StringArray};

/// # TextArray
///
/// ## Usage
/// - `String32` for arrays whose total byte length fits in `i32` offsets.
/// - `String64` for the large variant.
#[derive(PartialEq, Clone, Debug)]
pub enum TextArray {
    String32(Arc<StringArray<u32>>),
    String64(Arc<StringArray<u64>>),
}

impl TextArray {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            TextArray::String32(a) => a.len(),
            TextArray::String64(a) => a.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        match self {
            TextArray::String32(a) => a.null_mask.as_ref(),
            TextArray::String64(a) => a.null_mask.as_ref(),
        }
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        match self {
            TextArray::String32(a) => a.null_count(),
            TextArray::String64(a) => a.null_count(),
        }
    }

    pub fn arrow_type(&self) -> ArrowType {
        match self {
            TextArray::String32(_) => ArrowType::String,
            TextArray::String64(_) => ArrowType::LargeString,
        }
    }

    /// String at `idx`, or `None` when null.
    pub fn str_value(&self, idx: usize) -> Option<&str> {
        match self {
            TextArray::String32(a) => a.value(idx),
            TextArray::String64(a) => a.value(idx),
        }
    }

    pub fn value(&self, idx: usize) -> Scalar {
        self.str_value(idx)
            .map_or(Scalar::Null, |s| Scalar::String(s.to_string()))
    }

    /// Zero-copy window `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        match self {
            TextArray::String32(a) => TextArray::String32(Arc::new(a.slice(offset, len))),
            TextArray::String64(a) => TextArray::String64(Arc::new(a.slice(offset, len))),
        }
    }
}

impl From<StringArray<u32>> for TextArray {
    fn from(a: StringArray<u32>) -> Self {
        TextArray::String32(Arc::new(a))
    }
}

impl From<StringArray<u64>> for TextArray {
    fn from(a: StringArray<u64>) -> Self {
        TextArray::String64(Arc::new(a))
    }
}
