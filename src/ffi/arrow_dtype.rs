//! # ArrowDType Module - *Logical type tagging for the interchange boundary*
//!
//! `ArrowType` is the logical type of every array that crosses the C Data Interface.
//!
//! ## Overview
//! - Covers null, boolean, the eight integer widths, floats, UTF-8 strings in both
//!   offset widths, string views, dictionary encoding, the temporal family including
//!   calendar intervals, structs and lists.
//! - Parametrised variants carry their parameters: time units, timezone, dictionary
//!   index and value types, child fields.
//! - Nested parameters sit behind `Arc`, so a type is cheap to clone and the same type
//!   is shared by reference across every chunk of a chunked array.
//!
//! ## Display
//! Human-readable names for error messages and logs. The wire encoding lives in
//! [`crate::ffi::format`].
//!
//! ## Notice
//! - This crate is not affiliated with the `Apache Arrow` project.
//! - The term `Apache Arrow` is a trademark of the *Apache Software Foundation*.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

#[cfg(feature = "datetime")]
use crate::enums::time_units::{IntervalUnit, TimeUnit};
use crate::Field;

/// # ArrowType
///
/// Logical type of an array, immutable once constructed.
///
/// ## Coverage
/// - **Core primitives**: null, boolean, signed/unsigned integers, floats.
/// - **Strings**: UTF-8 (`String`, 32-bit offsets) and `LargeString` (64-bit offsets).
///   `Utf8View` is read on import and materialises as `String`.
/// - **Dictionary**: any integer index width over any value type, with the ordered flag.
/// - **Temporal** (`datetime` feature): date, time, timestamp with optional timezone,
///   duration, interval.
/// - **Nested**: struct of named children, list and large list of a single child field.
#[derive(PartialEq, Clone, Debug)]
pub enum ArrowType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    LargeString,
    /// Inline-or-referenced string views (`vu`). Import only: the values are copied into
    /// a `String` array, see [`ArrowType::materialised`].
    Utf8View,
    #[cfg(feature = "datetime")]
    Date32,
    #[cfg(feature = "datetime")]
    Date64,
    /// 32-bit time of day, in seconds or milliseconds.
    #[cfg(feature = "datetime")]
    Time32(TimeUnit),
    /// 64-bit time of day, in microseconds or nanoseconds.
    #[cfg(feature = "datetime")]
    Time64(TimeUnit),
    /// 64-bit instant since the epoch, optionally zoned. The timezone travels in the
    /// format string (`tsu:Europe/Paris`).
    #[cfg(feature = "datetime")]
    Timestamp(TimeUnit, Option<Arc<str>>),
    #[cfg(feature = "datetime")]
    Duration(TimeUnit),
    #[cfg(feature = "datetime")]
    Interval(IntervalUnit),
    /// Dictionary-encoded values. On the wire the parent schema carries the index
    /// format and the `dictionary` schema carries `values`.
    Dictionary {
        index: IndexType,
        values: Arc<ArrowType>,
        ordered: bool,
    },
    Struct(Arc<[Field]>),
    List(Arc<Field>),
    LargeList(Arc<Field>),
}

/// # IndexType
///
/// Integer width of dictionary keys.
///
/// Maps directly to the index type of an Arrow dictionary, which is the format string of
/// the parent schema. Any signed or unsigned width is accepted.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum IndexType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl IndexType {
    /// The value type the keys are stored as.
    pub fn key_type(self) -> ArrowType {
        match self {
            IndexType::Int8 => ArrowType::Int8,
            IndexType::Int16 => ArrowType::Int16,
            IndexType::Int32 => ArrowType::Int32,
            IndexType::Int64 => ArrowType::Int64,
            IndexType::UInt8 => ArrowType::UInt8,
            IndexType::UInt16 => ArrowType::UInt16,
            IndexType::UInt32 => ArrowType::UInt32,
            IndexType::UInt64 => ArrowType::UInt64,
        }
    }

    /// Inverse of [`IndexType::key_type`]. `None` for non-integer types.
    pub fn from_key_type(t: &ArrowType) -> Option<Self> {
        Some(match t {
            ArrowType::Int8 => IndexType::Int8,
            ArrowType::Int16 => IndexType::Int16,
            ArrowType::Int32 => IndexType::Int32,
            ArrowType::Int64 => IndexType::Int64,
            ArrowType::UInt8 => IndexType::UInt8,
            ArrowType::UInt16 => IndexType::UInt16,
            ArrowType::UInt32 => IndexType::UInt32,
            ArrowType::UInt64 => IndexType::UInt64,
            _ => return None,
        })
    }
}

impl ArrowType {
    /// Dictionary type over `values`, unordered.
    pub fn dictionary(index: IndexType, values: ArrowType) -> Self {
        ArrowType::Dictionary {
            index,
            values: Arc::new(values),
            ordered: false,
        }
    }

    /// Struct type over the given child fields.
    pub fn struct_of(fields: impl Into<Vec<Field>>) -> Self {
        ArrowType::Struct(Arc::from(fields.into()))
    }

    /// List of `child`.
    pub fn list_of(child: Field) -> Self {
        ArrowType::List(Arc::new(child))
    }

    /// Large list of `child`.
    pub fn large_list_of(child: Field) -> Self {
        ArrowType::LargeList(Arc::new(child))
    }

    /// The type an imported array of this type actually holds.
    ///
    /// `Utf8View` becomes `String`, recursively through children and dictionary values.
    /// Every other type is returned unchanged.
    pub fn materialised(&self) -> ArrowType {
        match self {
            ArrowType::Utf8View => ArrowType::String,
            ArrowType::Dictionary { index, values, ordered } => ArrowType::Dictionary {
                index: *index,
                values: Arc::new(values.materialised()),
                ordered: *ordered,
            },
            ArrowType::Struct(fields) => {
                ArrowType::Struct(fields.iter().map(Field::materialised).collect::<Vec<_>>().into())
            }
            ArrowType::List(child) => ArrowType::List(Arc::new(child.materialised())),
            ArrowType::LargeList(child) => ArrowType::LargeList(Arc::new(child.materialised())),
            other => other.clone(),
        }
    }

    /// Whether the type has child fields on the wire.
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            ArrowType::Struct(_) | ArrowType::List(_) | ArrowType::LargeList(_)
        )
    }
}

impl Display for ArrowType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArrowType::Null => f.write_str("Null"),
            ArrowType::Boolean => f.write_str("Boolean"),
            ArrowType::Int8 => f.write_str("Int8"),
            ArrowType::Int16 => f.write_str("Int16"),
            ArrowType::Int32 => f.write_str("Int32"),
            ArrowType::Int64 => f.write_str("Int64"),
            ArrowType::UInt8 => f.write_str("UInt8"),
            ArrowType::UInt16 => f.write_str("UInt16"),
            ArrowType::UInt32 => f.write_str("UInt32"),
            ArrowType::UInt64 => f.write_str("UInt64"),
            ArrowType::Float32 => f.write_str("Float32"),
            ArrowType::Float64 => f.write_str("Float64"),
            ArrowType::String => f.write_str("String"),
            ArrowType::LargeString => f.write_str("LargeString"),
            ArrowType::Utf8View => f.write_str("Utf8View"),
            #[cfg(feature = "datetime")]
            ArrowType::Date32 => f.write_str("Date32"),
            #[cfg(feature = "datetime")]
            ArrowType::Date64 => f.write_str("Date64"),
            #[cfg(feature = "datetime")]
            ArrowType::Time32(u) => write!(f, "Time32({u})"),
            #[cfg(feature = "datetime")]
            ArrowType::Time64(u) => write!(f, "Time64({u})"),
            #[cfg(feature = "datetime")]
            ArrowType::Timestamp(u, None) => write!(f, "Timestamp({u})"),
            #[cfg(feature = "datetime")]
            ArrowType::Timestamp(u, Some(tz)) => write!(f, "Timestamp({u}, {tz})"),
            #[cfg(feature = "datetime")]
            ArrowType::Duration(u) => write!(f, "Duration({u})"),
            #[cfg(feature = "datetime")]
            ArrowType::Interval(u) => write!(f, "Interval({u})"),
            ArrowType::Dictionary {
                index,
                values,
                ordered,
            } => {
                write!(f, "Dictionary({index:?}, {values}")?;
                if *ordered {
                    f.write_str(", ordered")?;
                }
                f.write_str(")")
            }
            ArrowType::Struct(fields) => {
                f.write_str("Struct(")?;
                for (i, fld) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", fld.name, fld.dtype)?;
                }
                f.write_str(")")
            }
            ArrowType::List(child) => write!(f, "List({})", child.dtype),
            ArrowType::LargeList(child) => write!(f, "LargeList({})", child.dtype),
        }
    }
}
