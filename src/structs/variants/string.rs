//! # **StringArray Module** - *Inner UTF-8 string array*
//!
//! Variable-length UTF-8 strings stored as an offsets buffer plus a contiguous byte
//! buffer, with an optional validity mask.
//!
//! ## Layout
//! - `offsets`: `len + 1` entries. Value `i` is `data[offsets[i]..offsets[i + 1]]`.
//! - `T = u32` exports as `u` (32-bit offsets), `T = u64` as `U` (64-bit offsets).
//! - Offsets are absolute into `data` and need not start at zero, so slicing only
//!   narrows the offsets window and never touches the bytes.
//!
//! ## Offset range
//! 32-bit offsets are unsigned in memory but signed on the wire. Construction from
//! strings rejects totals above `i32::MAX`, and the exporter re-checks arrays assembled
//! from raw parts, failing with `OverflowError` rather than truncating.

use crate::enums::error::{BridgeError, Result};
use crate::traits::type_unions::OffsetType;
use crate::{Bitmask, Buffer, MaskedArray, Vec64, vec64};

/// # StringArray
///
/// Arrow-compatible UTF-8 string array.
///
/// ### Fields
/// - `offsets`: value boundaries into `data` (`len + 1` entries).
/// - `data`: concatenated UTF-8 bytes.
/// - `null_mask`: optional validity bitmap.
///
/// ## Example
/// ```rust
/// use colbridge::{StringArray, MaskedArray};
///
/// let arr = StringArray::<u32>::from_options(&[Some("cat"), None, Some("dog")]);
/// assert_eq!(arr.value(0), Some("cat"));
/// assert_eq!(arr.value(1), None);
/// assert_eq!(arr.slice(2, 1).value(0), Some("dog"));
/// ```
#[derive(PartialEq, Clone, Debug)]
pub struct StringArray<T: OffsetType> {
    pub offsets: Buffer<T>,
    pub data: Buffer<u8>,
    pub null_mask: Option<Bitmask>,
}

impl<T: OffsetType> StringArray<T> {
    /// Builds a dense array from string slices.
    ///
    /// # Errors
    /// `OverflowError` when the total byte length exceeds the offset range of `T`.
    pub fn try_from_strs(values: &[&str]) -> Result<Self> {
        let opts: Vec<Option<&str>> = values.iter().map(|s| Some(*s)).collect();
        let mut arr = Self::try_from_options(&opts)?;
        arr.null_mask = None;
        Ok(arr)
    }

    /// Builds an array from optional strings. `None` entries become nulls.
    pub fn try_from_options(values: &[Option<&str>]) -> Result<Self> {
        let total: usize = values.iter().map(|v| v.map_or(0, str::len)).sum();
        if total as u64 > T::MAX_OFFSET {
            return Err(BridgeError::OverflowError {
                len: total as u64,
                max: T::MAX_OFFSET,
            });
        }
        let mut offsets = Vec64::with_capacity(values.len() + 1);
        let mut data = Vec64::with_capacity(total);
        offsets.push(T::zero());
        for v in values {
            if let Some(s) = v {
                data.extend_from_slice(s.as_bytes());
            }
            offsets.push(T::from_usize(data.len()));
        }
        let has_nulls = values.iter().any(Option::is_none);
        let null_mask = has_nulls.then(|| {
            let valid: Vec<bool> = values.iter().map(Option::is_some).collect();
            Bitmask::from_bools(&valid)
        });
        Ok(Self {
            offsets: Buffer::from_vec64(offsets),
            data: Buffer::from_vec64(data),
            null_mask,
        })
    }

    /// Infallible form of [`StringArray::try_from_strs`] for inputs known to fit.
    ///
    /// # Panics
    /// On offset overflow.
    pub fn from_strs(values: &[&str]) -> Self {
        match Self::try_from_strs(values) {
            Ok(arr) => arr,
            Err(e) => panic!("{e}"),
        }
    }

    /// Infallible form of [`StringArray::try_from_options`].
    ///
    /// # Panics
    /// On offset overflow.
    pub fn from_options(values: &[Option<&str>]) -> Self {
        match Self::try_from_options(values) {
            Ok(arr) => arr,
            Err(e) => panic!("{e}"),
        }
    }

    /// Assembles an array from raw buffers, validating them.
    ///
    /// # Errors
    /// `ImportError` when offsets decrease, run past `data`, or a non-null value is
    /// not valid UTF-8, or when the mask length is not `offsets.len() - 1`.
    pub fn from_parts(offsets: Buffer<T>, data: Buffer<u8>, null_mask: Option<Bitmask>) -> Result<Self> {
        let offsets = if offsets.is_empty() {
            Buffer::from_vec64(vec64![T::zero()])
        } else {
            offsets
        };
        let len = offsets.len() - 1;
        if let Some(mask) = &null_mask {
            if mask.len() != len {
                return Err(BridgeError::import(format!(
                    "string validity bitmap has {} bits for {len} values",
                    mask.len()
                )));
            }
        }
        for (i, w) in offsets.windows(2).enumerate() {
            let (start, end) = (w[0].as_usize(), w[1].as_usize());
            if start > end {
                return Err(BridgeError::import(format!(
                    "string offsets decrease at index {i}: {start} > {end}"
                )));
            }
            if end > data.len() {
                return Err(BridgeError::import(format!(
                    "string offset {end} at index {} exceeds data length {}",
                    i + 1,
                    data.len()
                )));
            }
            let is_null = null_mask.as_ref().is_some_and(|m| !m.get(i));
            if !is_null && std::str::from_utf8(&data[start..end]).is_err() {
                return Err(BridgeError::import(format!("string value {i} is not valid UTF-8")));
            }
        }
        if len == 0 && offsets[0].as_usize() > data.len() {
            return Err(BridgeError::import("string offset exceeds data length"));
        }
        Ok(Self {
            offsets,
            data,
            null_mask,
        })
    }

    /// String at `idx`, or `None` when null.
    ///
    /// # Panics
    /// If `idx >= len`.
    #[inline]
    pub fn value(&self, idx: usize) -> Option<&str> {
        if self.is_null(idx) {
            return None;
        }
        Some(self.str_at(idx))
    }

    /// Iterates values, yielding `None` for nulls.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..self.len()).map(move |i| self.value(i))
    }

    /// Offset of the first value's bytes, followed by the last offset.
    #[inline]
    pub fn offset_bounds(&self) -> (T, T) {
        (self.offsets[0], self.offsets[self.offsets.len() - 1])
    }

    /// Zero-copy window `[offset, offset + len)`.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        Self {
            offsets: self.offsets.slice(offset, len + 1),
            data: self.data.clone(),
            null_mask: self.null_mask.as_ref().map(|m| m.slice(offset, len)),
        }
    }

    #[inline]
    fn str_at(&self, idx: usize) -> &str {
        let start = self.offsets[idx].as_usize();
        let end = self.offsets[idx + 1].as_usize();
        // SAFETY: non-null values were validated as UTF-8 on construction.
        unsafe { std::str::from_utf8_unchecked(&self.data[start..end]) }
    }
}

impl<T: OffsetType> MaskedArray for StringArray<T> {
    #[inline]
    fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    fn null_mask(&self) -> Option<&Bitmask> {
        self.null_mask.as_ref()
    }
}

impl<T: OffsetType> Default for StringArray<T> {
    fn default() -> Self {
        Self {
            offsets: Buffer::from_vec64(vec64![T::zero()]),
            data: Buffer::default(),
            null_mask: None,
        }
    }
}
