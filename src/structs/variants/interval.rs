//! # IntervalArray Module - *Calendar intervals*
//!
//! Fixed-width calendar intervals in the three Arrow layouts. Values are stored as
//! native-endian 32-bit words, [`IntervalUnit::words`] per value, which is byte for byte
//! the C Data Interface layout, so the buffer exports and imports without a copy.

use crate::enums::error::{BridgeError, Result};
use crate::enums::time_units::IntervalUnit;
use crate::{Bitmask, Buffer, MaskedArray, Scalar, Vec64};

/// # IntervalArray
///
/// ### Fields
/// - `data`: `len * unit.words()` words.
/// - `null_mask`: optional validity bitmap.
/// - `unit`: value layout.
///
/// ## Example
/// ```rust
/// use colbridge::{IntervalArray, MaskedArray, Scalar};
///
/// let a = IntervalArray::from_month_day_nanos(&[Some((1, 2, 3_000)), None]);
/// assert_eq!(a.len(), 2);
/// assert_eq!(a.value(0), Scalar::Interval { months: 1, days: 2, nanos: 3_000 });
/// assert_eq!(a.value(1), Scalar::Null);
/// ```
#[derive(PartialEq, Clone, Debug)]
pub struct IntervalArray {
    pub data: Buffer<i32>,
    pub null_mask: Option<Bitmask>,
    pub unit: IntervalUnit,
}

impl IntervalArray {
    /// Assembles an array from its word buffer.
    ///
    /// # Errors
    /// `ImportError` when the buffer is not a whole number of values, or the mask length
    /// differs from the value count.
    pub fn try_new(data: Buffer<i32>, null_mask: Option<Bitmask>, unit: IntervalUnit) -> Result<Self> {
        let words = unit.words();
        if data.len() % words != 0 {
            return Err(BridgeError::import(format!(
                "{} words do not divide into {unit} values of {words} words",
                data.len()
            )));
        }
        if let Some(mask) = &null_mask {
            if mask.len() != data.len() / words {
                return Err(BridgeError::import(format!(
                    "interval validity has {} bits for {} values",
                    mask.len(),
                    data.len() / words
                )));
            }
        }
        Ok(Self { data, null_mask, unit })
    }

    /// `YearMonth` intervals from month counts.
    pub fn from_months(values: &[Option<i32>]) -> Self {
        Self::build(IntervalUnit::YearMonth, values, |m, out| out.push(m))
    }

    /// `DaysTime` intervals from `(days, milliseconds)`.
    pub fn from_days_ms(values: &[Option<(i32, i32)>]) -> Self {
        Self::build(IntervalUnit::DaysTime, values, |(d, ms), out| {
            out.push(d);
            out.push(ms);
        })
    }

    /// `MonthDaysNs` intervals from `(months, days, nanoseconds)`.
    pub fn from_month_day_nanos(values: &[Option<(i32, i32, i64)>]) -> Self {
        Self::build(IntervalUnit::MonthDaysNs, values, |(m, d, ns), out| {
            out.push(m);
            out.push(d);
            let b = ns.to_ne_bytes();
            out.push(i32::from_ne_bytes([b[0], b[1], b[2], b[3]]));
            out.push(i32::from_ne_bytes([b[4], b[5], b[6], b[7]]));
        })
    }

    fn build<V: Copy + Default>(unit: IntervalUnit, values: &[Option<V>], push: impl Fn(V, &mut Vec64<i32>)) -> Self {
        let mut data = Vec64::with_capacity(values.len() * unit.words());
        for v in values {
            push(v.unwrap_or_default(), &mut data);
        }
        let null_mask = values
            .iter()
            .any(Option::is_none)
            .then(|| Bitmask::from_bools(&values.iter().map(Option::is_some).collect::<Vec<_>>()));
        Self {
            data: Buffer::from_vec64(data),
            null_mask,
            unit,
        }
    }

    /// Value at `idx` as `Scalar::Interval`. `DaysTime` milliseconds are widened to
    /// nanoseconds. Nulls and out-of-bounds indices give `Scalar::Null`.
    pub fn value(&self, idx: usize) -> Scalar {
        if idx >= self.len() || self.is_null(idx) {
            return Scalar::Null;
        }
        let w = self.unit.words();
        let v = &self.data[idx * w..(idx + 1) * w];
        match self.unit {
            IntervalUnit::YearMonth => Scalar::Interval { months: v[0], days: 0, nanos: 0 },
            IntervalUnit::DaysTime => Scalar::Interval {
                months: 0,
                days: v[0],
                nanos: i64::from(v[1]) * 1_000_000,
            },
            IntervalUnit::MonthDaysNs => {
                let (lo, hi) = (v[2].to_ne_bytes(), v[3].to_ne_bytes());
                Scalar::Interval {
                    months: v[0],
                    days: v[1],
                    nanos: i64::from_ne_bytes([lo[0], lo[1], lo[2], lo[3], hi[0], hi[1], hi[2], hi[3]]),
                }
            }
        }
    }

    /// Zero-copy window `[offset, offset + len)` in values.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        let w = self.unit.words();
        Self {
            data: self.data.slice(offset * w, len * w),
            null_mask: self.null_mask.as_ref().map(|m| m.slice(offset, len)),
            unit: self.unit,
        }
    }
}

impl MaskedArray for IntervalArray {
    #[inline]
    fn len(&self) -> usize {
        self.data.len() / self.unit.words()
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}
