//! Core `MaskedArray` trait, providing a common interface for all inner array types,
//! centred on the validity bitmap.

use crate::Bitmask;

/// MaskedArray is implemented by all inner, nullable arrays.
///
/// ### Purpose
/// - Keeps null handling consistent across `BooleanArray`, `CategoricalArray`,
///   `DatetimeArray`, `FloatArray`, `IntegerArray`, `ListArray`, `StringArray`
///   and `StructArray`.
/// - The exporter only needs `len` and `null_mask` to fill in the validity buffer
///   and `null_count` of an `ArrowArray`, whatever the layout behind them.
///
/// An absent mask means "no nulls". A present mask may still have zero nulls.
pub trait MaskedArray {
    /// Returns the number of logical elements in the array.
    fn len(&self) -> usize;

    /// Returns the validity bitmap, if any (`1 = valid`, `0 = null`).
    fn null_mask(&self) -> Option<&Bitmask>;

    /// Returns true if the array is empty.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of null entries.
    #[inline]
    fn null_count(&self) -> usize {
        self.null_mask().map_or(0, |m| m.count_zeros())
    }

    /// Whether the entry at `idx` is null.
    #[inline]
    fn is_null(&self, idx: usize) -> bool {
        self.null_mask().is_some_and(|m| !m.get(idx))
    }

    /// Whether a validity bitmap is attached.
    #[inline]
    fn is_nullable(&self) -> bool {
        self.null_mask().is_some()
    }
}
