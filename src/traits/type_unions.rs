use std::fmt::Debug;

use num_traits::{Float as NumFloat, PrimInt, ToPrimitive};

use crate::impl_usize_conversions;

/// Trait for fixed-width element types that may be viewed as raw bytes.
///
/// Implemented only for the numeric primitives, which have no padding and no invalid
/// bit patterns, so any suitably aligned byte region of the right length is a valid `[T]`.
/// `Buffer<T>` relies on this when wrapping foreign memory.
pub trait Primitive: Copy + Default + PartialEq + Debug + Send + Sync + 'static {}
impl Primitive for f32 {}
impl Primitive for f64 {}
impl Primitive for i8 {}
impl Primitive for i16 {}
impl Primitive for i32 {}
impl Primitive for i64 {}
impl Primitive for u8 {}
impl Primitive for u16 {}
impl Primitive for u32 {}
impl Primitive for u64 {}

/// Trait for types valid as integer elements in columnar arrays.
pub trait Integer: Primitive + PrimInt + ToPrimitive {
    /// Bit-preserving cast to `usize`. Callers check the sign first.
    fn as_usize(self) -> usize;

    /// Cast from `usize`, truncating. Callers check the range first.
    fn from_usize(v: usize) -> Self;
}

impl_usize_conversions!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Trait for types valid as float elements in columnar arrays.
///
/// Extends and constrains the *num-traits* `Float` implementation to fit the crate's type universe.
pub trait Float: Primitive + NumFloat {}
impl Float for f32 {}
impl Float for f64 {}

/// Offset width for variable-length layouts (strings and lists).
///
/// Offsets are held unsigned internally. On export they are reinterpreted in place as the
/// signed Arrow offset type, which is only valid while every offset is at most `MAX_OFFSET`.
pub trait OffsetType: Integer {
    /// `true` for the 64-bit "large" encodings (`U`, `+L`).
    const LARGE: bool;
    /// Largest offset representable by the signed Arrow offset type.
    const MAX_OFFSET: u64;
}

impl OffsetType for u32 {
    const LARGE: bool = false;
    const MAX_OFFSET: u64 = i32::MAX as u64;
}

impl OffsetType for u64 {
    const LARGE: bool = true;
    const MAX_OFFSET: u64 = i64::MAX as u64;
}
