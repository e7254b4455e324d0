//! # **IntegerArray Module** - *Inner typed integer array*
//!
//! Fixed-width signed/unsigned integers (`T: Integer`) over a `Buffer<T>`, plus an
//! optional bit-packed validity mask.
//!
//! Exported with two buffers, `[validity, values]`, under the format characters
//! `c C s S i I l L`. Also serves as the key storage of `CategoricalArray`.

use crate::traits::type_unions::Integer;
use crate::{Bitmask, Buffer, impl_primitive_array};

/// # IntegerArray
///
/// Arrow-compatible integer array with optional null mask.
///
/// ### Fields
/// - `data`: backing buffer of integer values.
/// - `null_mask`: optional bit-packed validity bitmap (`1 = valid`, `0 = null`).
///
/// ## Example
/// ```rust
/// use colbridge::{IntegerArray, MaskedArray};
///
/// let arr = IntegerArray::<i32>::from_options(&[Some(1), None, Some(3)]);
/// assert_eq!(arr.len(), 3);
/// assert_eq!(arr.null_count(), 1);
/// assert_eq!(arr.get(1), None);
/// assert_eq!(arr.slice(2, 1).get(0), Some(3));
/// ```
#[derive(PartialEq, Clone, Debug, Default)]
pub struct IntegerArray<T: Integer> {
    pub data: Buffer<T>,
    pub null_mask: Option<Bitmask>,
}

impl_primitive_array!(IntegerArray, Integer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MaskedArray;

    #[test]
    fn dense_has_no_mask() {
        let arr = IntegerArray::<u16>::from_slice(&[4, 5, 6]);
        assert!(!arr.is_nullable());
        assert_eq!(arr.values(), &[4, 5, 6]);
    }

    #[test]
    fn slice_carries_mask_window() {
        let arr = IntegerArray::<i64>::from_options(&[Some(1), None, Some(3), None, Some(5)]);
        let s = arr.slice(1, 3);
        assert_eq!(s.null_count(), 2);
        assert_eq!(s.get(1), Some(3));
        assert_eq!(s.get(3), None);
    }

    #[test]
    #[should_panic(expected = "null mask length")]
    fn mismatched_mask_panics() {
        let _ = IntegerArray::<i8>::new(vec![1, 2], Some(Bitmask::new_set_all(3, true)));
    }
}
