//! # **FloatArray Module** - *Inner typed floating-point array*
//!
//! `f32`/`f64` values over a `Buffer<T>` with an optional validity mask.
//! Exported as `[validity, values]` under the format characters `f` and `g`.

use crate::traits::type_unions::Float;
use crate::{Bitmask, Buffer, impl_primitive_array};

/// # FloatArray
///
/// Arrow-compatible floating-point array with optional null mask.
///
/// ## Example
/// ```rust
/// use colbridge::{FloatArray, MaskedArray};
///
/// let arr = FloatArray::<f64>::from_options(&[Some(1.5), None]);
/// assert_eq!(arr.get(0), Some(1.5));
/// assert!(arr.is_null(1));
/// ```
#[derive(PartialEq, Clone, Debug, Default)]
pub struct FloatArray<T: Float> {
    pub data: Buffer<T>,
    pub null_mask: Option<Bitmask>,
}

impl_primitive_array!(FloatArray, Float);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_a_value_not_a_null() {
        let arr = FloatArray::<f32>::from_slice(&[f32::NAN, 1.0]);
        assert!(arr.get(0).is_some_and(f32::is_nan));
    }
}
