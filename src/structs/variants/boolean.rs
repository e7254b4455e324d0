//! # **BooleanArray Module** - *Bit-packed boolean array*
//!
//! Values and validity are both `Bitmask`s. Exported as `[validity, values]` under
//! the format `b`, where the values bitmap may share the array's bit offset.

use crate::{Bitmask, MaskedArray};

/// Arrow-compatible bit-packed boolean array (LSB = first value).
///
/// ### Fields:
/// - `data`: bit-packed values.
/// - `null_mask`: optional bit-packed validity bitmap (1=valid, 0=null).
///
/// ## Example
/// ```rust
/// use colbridge::{BooleanArray, MaskedArray};
///
/// let arr = BooleanArray::from_options(&[Some(true), None, Some(false)]);
/// assert_eq!(arr.get(0), Some(true));
/// assert_eq!(arr.get(1), None);
/// assert_eq!(arr.null_count(), 1);
/// ```
#[derive(PartialEq, Clone, Debug, Default)]
pub struct BooleanArray {
    pub data: Bitmask,
    pub null_mask: Option<Bitmask>,
}

impl BooleanArray {
    /// Constructs a new array.
    ///
    /// # Panics
    /// If the mask length differs from the data length.
    pub fn new(data: Bitmask, null_mask: Option<Bitmask>) -> Self {
        if let Some(mask) = &null_mask {
            assert_eq!(mask.len(), data.len(), "null mask length must match data length");
        }
        Self { data, null_mask }
    }

    /// Dense array from booleans.
    pub fn from_slice(values: &[bool]) -> Self {
        Self::new(Bitmask::from_bools(values), None)
    }

    /// Array from optional booleans. `None` entries become nulls.
    pub fn from_options(values: &[Option<bool>]) -> Self {
        let data: Vec<bool> = values.iter().map(|v| v.unwrap_or(false)).collect();
        let valid: Vec<bool> = values.iter().map(Option::is_some).collect();
        Self::new(Bitmask::from_bools(&data), Some(Bitmask::from_bools(&valid)))
    }

    /// Value at `idx`, or `None` when null or out of bounds.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<bool> {
        if idx >= self.data.len() || self.is_null(idx) {
            None
        } else {
            Some(self.data.get(idx))
        }
    }

    /// Zero-copy window `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        Self {
            data: self.data.slice(offset, len),
            null_mask: self.null_mask.as_ref().map(|m| m.slice(offset, len)),
        }
    }
}

impl MaskedArray for BooleanArray {
    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_slice_reads_through_bit_offset() {
        let arr = BooleanArray::from_slice(&[true, false, false, true, true, false, true, false, true]);
        let s = arr.slice(3, 5);
        assert_eq!(
            (0..5).map(|i| s.get(i).unwrap()).collect::<Vec<_>>(),
            vec![true, true, false, true, false]
        );
    }
}
