//! # Scalar Module - *Single Value Container*
//!
//! Contains the Scalar type for holding a single decoded value.
//!
//! ## Purpose
//! - Gives every array a uniform `value(idx)` and `to_list()` view, which is how
//!   round trips are compared value by value regardless of the physical layout.
//! - Integer and float widths are widened, so an `Int8` 3 and an `Int64` 3 compare
//!   equal. Compare `ArrowType`s when the width matters.

/// # Scalar
///
/// Scalar literals (single values) covering all supported types.
///
/// ## Description
/// - `Temporal` carries the raw integer value in the array's own unit.
/// - `Interval` carries all three interval components, zero where the layout lacks one.
/// - Dictionary entries decode to the dictionary value they reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Temporal(i64),
    Interval { months: i32, days: i32, nanos: i64 },
    List(Vec<Scalar>),
    Struct(Vec<(String, Scalar)>),
}

impl Scalar {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// String contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::UInt(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map_or(Scalar::Null, Into::into)
    }
}
