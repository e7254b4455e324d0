//! # DatetimeArray Module - *Inner typed temporal array*
//!
//! Temporal values stored as raw integer offsets from the UNIX epoch (or midnight, for
//! time-of-day), with a [`TimeUnit`], an optional timezone and an optional validity mask.
//!
//! ## Overview
//! - `DatetimeArray<i32>` backs `Date32` (days) and `Time32` (seconds or milliseconds).
//! - `DatetimeArray<i64>` backs `Date64`, `Time64`, `Timestamp` and `Duration`.
//! - Which logical type an array is lives on the `TemporalArray` variant that wraps it,
//!   so one storage type serves the whole family.
//! - The timezone is only read for timestamps and travels in the format string.

use std::sync::Arc;

use crate::enums::time_units::TimeUnit;
use crate::traits::type_unions::Integer;
use crate::{Bitmask, Buffer, MaskedArray};

/// # DatetimeArray
///
/// ### Fields
/// - `data`: raw temporal values.
/// - `null_mask`: optional validity bitmap.
/// - `time_unit`: resolution of `data`.
/// - `timezone`: optional IANA name or fixed offset, for timestamps.
///
/// ## Example
/// ```rust
/// use colbridge::{DatetimeArray, TimeUnit, MaskedArray};
///
/// let ts = DatetimeArray::<i64>::from_options(&[Some(1_700_000_000), None], TimeUnit::Seconds)
///     .with_timezone("UTC");
/// assert_eq!(ts.get(0), Some(1_700_000_000));
/// assert_eq!(ts.null_count(), 1);
/// assert_eq!(ts.timezone.as_deref(), Some("UTC"));
/// ```
#[derive(PartialEq, Clone, Debug, Default)]
pub struct DatetimeArray<T: Integer> {
    pub data: Buffer<T>,
    pub null_mask: Option<Bitmask>,
    pub time_unit: TimeUnit,
    pub timezone: Option<Arc<str>>,
}

impl<T: Integer> DatetimeArray<T> {
    /// Constructs an array over `data`.
    ///
    /// # Panics
    /// If the mask length differs from the data length.
    pub fn new(data: impl Into<Buffer<T>>, null_mask: Option<Bitmask>, time_unit: TimeUnit) -> Self {
        let data = data.into();
        if let Some(mask) = &null_mask {
            assert_eq!(mask.len(), data.len(), "null mask length must match data length");
        }
        Self {
            data,
            null_mask,
            time_unit,
            timezone: None,
        }
    }

    /// Dense array copied from a slice.
    pub fn from_slice(values: &[T], time_unit: TimeUnit) -> Self {
        Self::new(Buffer::from_slice(values), None, time_unit)
    }

    /// Array from optional values. `None` entries become nulls.
    pub fn from_options(values: &[Option<T>], time_unit: TimeUnit) -> Self {
        let data: Vec<T> = values.iter().map(|v| v.unwrap_or_default()).collect();
        let valid: Vec<bool> = values.iter().map(Option::is_some).collect();
        Self::new(data, Some(Bitmask::from_bools(&valid)), time_unit)
    }

    /// Attaches a timezone.
    pub fn with_timezone(mut self, tz: impl Into<Arc<str>>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    /// Value at `idx`, or `None` when null or out of bounds.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<T> {
        if idx >= self.data.len() || self.is_null(idx) {
            None
        } else {
            Some(self.data[idx])
        }
    }

    /// Zero-copy window `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        Self {
            data: self.data.slice(offset, len),
            null_mask: self.null_mask.as_ref().map(|m| m.slice(offset, len)),
            time_unit: self.time_unit,
            timezone: self.timezone.clone(),
        }
    }
}

impl<T: Integer> MaskedArray for DatetimeArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}
