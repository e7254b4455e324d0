//! # **TemporalArray Module** - *Date, time, timestamp and duration arrays*
//!
//! Each variant fixes the logical type of the `DatetimeArray` it wraps. The unit and
//! timezone come from the inner array. Calendar intervals have their own layout and
//! live in an `IntervalArray`.

use std::sync::Arc;

use crate::ffi::arrow_dtype::ArrowType;
use crate::{Bitmask, DatetimeArray, IntervalArray, MaskedArray, Scalar};

/// # TemporalArray
///
/// ## Variants
/// - `Date32`: days since the epoch (`tdD`).
/// - `Date64`: milliseconds since the epoch (`tdm`).
/// - `Time32` / `Time64`: time of day (`tts`, `ttm` / `ttu`, `ttn`).
/// - `Timestamp`: instant since the epoch, optionally zoned (`tss:`, `tsm:`, `tsu:`, `tsn:`).
/// - `Duration`: elapsed time (`tDs`, `tDm`, `tDu`, `tDn`).
/// - `Interval`: calendar interval (`tiM`, `tiD`, `tin`).
#[derive(PartialEq, Clone, Debug)]
pub enum TemporalArray {
    Date32(Arc<DatetimeArray<i32>>),
    Date64(Arc<DatetimeArray<i64>>),
    Time32(Arc<DatetimeArray<i32>>),
    Time64(Arc<DatetimeArray<i64>>),
    Timestamp(Arc<DatetimeArray<i64>>),
    Duration(Arc<DatetimeArray<i64>>),
    Interval(Arc<IntervalArray>),
}

impl TemporalArray {
    pub fn len(&self) -> usize {
        match self {
            TemporalArray::Date32(a) | TemporalArray::Time32(a) => a.len(),
            TemporalArray::Date64(a)
            | TemporalArray::Time64(a)
            | TemporalArray::Timestamp(a)
            | TemporalArray::Duration(a) => a.len(),
            TemporalArray::Interval(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_mask(&self) -> Option<&Bitmask> {
        match self {
            TemporalArray::Date32(a) | TemporalArray::Time32(a) => a.null_mask.as_ref(),
            TemporalArray::Date64(a)
            | TemporalArray::Time64(a)
            | TemporalArray::Timestamp(a)
            | TemporalArray::Duration(a) => a.null_mask.as_ref(),
            TemporalArray::Interval(a) => a.null_mask.as_ref(),
        }
    }

    pub fn null_count(&self) -> usize {
        self.null_mask().map_or(0, Bitmask::count_zeros)
    }

    /// Logical type, with the unit and timezone of the inner array.
    pub fn arrow_type(&self) -> ArrowType {
        match self {
            TemporalArray::Date32(_) => ArrowType::Date32,
            TemporalArray::Date64(_) => ArrowType::Date64,
            TemporalArray::Time32(a) => ArrowType::Time32(a.time_unit),
            TemporalArray::Time64(a) => ArrowType::Time64(a.time_unit),
            TemporalArray::Timestamp(a) => ArrowType::Timestamp(a.time_unit, a.timezone.clone()),
            TemporalArray::Duration(a) => ArrowType::Duration(a.time_unit),
            TemporalArray::Interval(a) => ArrowType::Interval(a.unit),
        }
    }

    pub fn value(&self, idx: usize) -> Scalar {
        let v = match self {
            TemporalArray::Date32(a) | TemporalArray::Time32(a) => a.get(idx).map(i64::from),
            TemporalArray::Date64(a)
            | TemporalArray::Time64(a)
            | TemporalArray::Timestamp(a)
            | TemporalArray::Duration(a) => a.get(idx),
            TemporalArray::Interval(a) => return a.value(idx),
        };
        v.map_or(Scalar::Null, Scalar::Temporal)
    }

    /// Zero-copy window `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        match self {
            TemporalArray::Date32(a) => TemporalArray::Date32(Arc::new(a.slice(offset, len))),
            TemporalArray::Date64(a) => TemporalArray::Date64(Arc::new(a.slice(offset, len))),
            TemporalArray::Time32(a) => TemporalArray::Time32(Arc::new(a.slice(offset, len))),
            TemporalArray::Time64(a) => TemporalArray::Time64(Arc::new(a.slice(offset, len))),
            TemporalArray::Timestamp(a) => TemporalArray::Timestamp(Arc::new(a.slice(offset, len))),
            TemporalArray::Duration(a) => TemporalArray::Duration(Arc::new(a.slice(offset, len))),
            TemporalArray::Interval(a) => TemporalArray::Interval(Arc::new(a.slice(offset, len))),
        }
    }

    /// Pointer to the first value, for an `ArrowArray` buffer slot.
    pub(crate) fn values_ptr(&self) -> *const u8 {
        match self {
            TemporalArray::Date32(a) | TemporalArray::Time32(a) => a.data.as_ptr() as *const u8,
            TemporalArray::Date64(a)
            | TemporalArray::Time64(a)
            | TemporalArray::Timestamp(a)
            | TemporalArray::Duration(a) => a.data.as_ptr() as *const u8,
            TemporalArray::Interval(a) => a.data.as_ptr() as *const u8,
        }
    }
}
