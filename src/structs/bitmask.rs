//! # **Bitmask Module** - *Bit-packed validity and boolean storage*
//!
//! Arrow-compatible, packed validity/boolean bitmask.
//!
//! ## Purpose
//! - Validity (null) masks for all array types (1 = valid, 0 = null).
//! - Backing storage for `BooleanArray`.
//!
//! ## Behaviour
//! - LSB of byte 0 corresponds to the first logical element.
//! - Carries a bit offset, so a zero-copy slice, or a foreign bitmap under an
//!   `ArrowArray.offset`, need not start on a byte boundary.
//! - [`Bitmask::to_aligned`] produces a byte-aligned mask for export, re-packing only when
//!   the bit offset is not a multiple of 8.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::{Buffer, vec64};
use crate::enums::error::{BridgeError, Result};

/// # Bitmask
///
/// ### Description
/// - Used for `BooleanArray` data and as the validity/null mask for all datatypes.
/// - Arrow-compatible: LSB = first element, 1 = set/valid, 0 = cleared/null.
///
/// # Example
/// ```rust
/// use colbridge::Bitmask;
///
/// let m = Bitmask::from_bools(&[true, false, true, true]);
/// assert_eq!(m.count_zeros(), 1);
/// let tail = m.slice(1, 3);
/// assert!(!tail.get(0) && tail.get(1));
/// ```
#[derive(Clone)]
pub struct Bitmask {
    bits: Buffer<u8>,
    offset: usize,
    len: usize,
}

impl Bitmask {
    /// Wraps `len` bits starting at bit `offset` of `bits`.
    pub fn new(bits: Buffer<u8>, offset: usize, len: usize) -> Result<Self> {
        let needed = (offset + len).div_ceil(8);
        if bits.len() < needed {
            return Err(BridgeError::import(format!(
                "bitmap of {} bytes is too short for {len} bits at offset {offset}",
                bits.len()
            )));
        }
        Ok(Self { bits, offset, len })
    }

    /// All bits set to `set`.
    pub fn new_set_all(len: usize, set: bool) -> Self {
        let fill = if set { 0xFF } else { 0x00 };
        let mut bytes = vec64![fill; len.div_ceil(8)];
        mask_trailing(&mut bytes, len);
        Self {
            bits: Buffer::from_vec64(bytes),
            offset: 0,
            len,
        }
    }

    /// Packs a slice of booleans.
    pub fn from_bools(bits: &[bool]) -> Self {
        let mut bytes = vec64![0u8; bits.len().div_ceil(8)];
        for (i, &b) in bits.iter().enumerate() {
            if b {
                bytes[i >> 3] |= 1 << (i & 7);
            }
        }
        Self {
            bits: Buffer::from_vec64(bytes),
            offset: 0,
            len: bits.len(),
        }
    }

    /// Number of logical bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit offset into [`Bitmask::bytes`] of the first logical bit.
    #[inline]
    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    /// Underlying byte storage, starting at byte 0 of the first logical bit's byte.
    #[inline]
    pub fn bytes(&self) -> &Buffer<u8> {
        &self.bits
    }

    /// Bit at logical index `idx`.
    ///
    /// # Panics
    /// If `idx >= len`.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        assert!(idx < self.len, "Bitmask::get: index {idx} out of bounds for {}", self.len);
        let i = self.offset + idx;
        (self.bits[i >> 3] >> (i & 7)) & 1 == 1
    }

    /// Iterates the logical bits.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        if self.offset % 8 == 0 {
            let start = self.offset / 8;
            let full = self.len / 8;
            let bytes = &self.bits[start..start + full];
            let mut n: usize = bytes.iter().map(|b| b.count_ones() as usize).sum();
            let rem = self.len % 8;
            if rem != 0 {
                n += (self.bits[start + full] & ((1u8 << rem) - 1)).count_ones() as usize;
            }
            n
        } else {
            self.iter().filter(|b| *b).count()
        }
    }

    /// Number of cleared bits, i.e. the null count when used as a validity mask.
    #[inline]
    pub fn count_zeros(&self) -> usize {
        self.len - self.count_ones()
    }

    /// Zero-copy window `[offset, offset + len)`.
    ///
    /// # Panics
    /// If the window is out of bounds.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len,
            "Bitmask::slice: {offset}+{len} out of bounds for {}",
            self.len
        );
        let abs = self.offset + offset;
        let byte = abs / 8;
        let bytes_needed = (abs % 8 + len).div_ceil(8);
        Self {
            bits: self.bits.slice(byte, bytes_needed),
            offset: abs % 8,
            len,
        }
    }

    /// A mask starting at bit 0 of its first byte.
    ///
    /// Zero-copy when the offset is already byte aligned, otherwise the bits are re-packed.
    pub fn to_aligned(&self) -> Self {
        if self.offset % 8 == 0 {
            let start = self.offset / 8;
            return Self {
                bits: self.bits.slice(start, self.len.div_ceil(8)),
                offset: 0,
                len: self.len,
            };
        }
        let mut bytes = vec64![0u8; self.len.div_ceil(8)];
        for i in 0..self.len {
            if self.get(i) {
                bytes[i >> 3] |= 1 << (i & 7);
            }
        }
        Self {
            bits: Buffer::from_vec64(bytes),
            offset: 0,
            len: self.len,
        }
    }
}

/// Clears padding bits past `len` in the final byte.
fn mask_trailing(bytes: &mut [u8], len: usize) {
    let rem = len % 8;
    if rem != 0 {
        if let Some(last) = bytes.last_mut() {
            *last &= (1u8 << rem) - 1;
        }
    }
}

impl Default for Bitmask {
    fn default() -> Self {
        Self::new_set_all(0, true)
    }
}

/// Logical equality: same length and same bits, regardless of offset or padding.
impl PartialEq for Bitmask {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Debug for Bitmask {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Bitmask[")?;
        for b in self.iter() {
            f.write_str(if b { "1" } else { "0" })?;
        }
        write!(f, "]")
    }
}
