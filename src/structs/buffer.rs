//! # **Buffer** - *Typed window over shared storage*
//!
//! `Buffer<T>` backs every inner array type (`IntegerArray`, `FloatArray`, `StringArray`,
//! `DatetimeArray`, list offsets, bitmask bytes).
//!
//! ## Design
//! - Storage is always a [`SharedBuffer`]: locally built [`Vec64`]s are moved in without a
//!   copy, and foreign memory arriving over the C Data Interface is wrapped in place.
//! - A buffer is a window `(offset, len)` in elements over that storage, so slicing and
//!   cloning are O(1) and never copy payload.
//! - Buffers are immutable. Once a descriptor referencing one has been exported, nothing in
//!   this crate writes to it.
//!
//! ## Alignment rules
//! - Locally built buffers are `Vec64<T>`, always 64-byte aligned, so every buffer this
//!   crate exports from owned data starts on a 64-byte boundary.
//! - Foreign buffers are checked in [`Buffer::from_shared`]. A region that is not aligned
//!   for `T` is copied into an owned `Vec64<T>`, with a warning, rather than read unaligned.
//!
//! ## Typical use
//! ```rust
//! use colbridge::{Buffer, vec64};
//!
//! let b = Buffer::from(vec64![1u32, 2, 3]);
//! assert_eq!(b.as_slice(), &[1, 2, 3]);
//! assert_eq!(b.as_ptr() as usize % 64, 0);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use tracing::warn;

use crate::enums::error::{BridgeError, Result};
use crate::structs::shared_buffer::SharedBuffer;
use crate::traits::type_unions::Primitive;
use crate::Vec64;

/// # Buffer
///
/// Immutable, reference-counted, zero-copy typed data buffer.
///
/// ### Behaviour:
/// - Derefs to `&[T]`, so read paths treat it like a slice.
/// - `Clone` and `slice` bump an atomic refcount on the shared storage.
/// - The storage is freed when the last `Buffer` or exported descriptor referencing it goes.
pub struct Buffer<T> {
    owner: SharedBuffer,
    offset: usize, // element index (not bytes)
    len: usize,    // element count
    _marker: PhantomData<T>,
}

impl<T: Primitive> Buffer<T> {
    /// Construct from an owned Vec64<T>, without copying.
    #[inline]
    pub fn from_vec64(v: Vec64<T>) -> Self {
        let len = v.len();
        Self {
            owner: SharedBuffer::from_vec64(v),
            offset: 0,
            len,
            _marker: PhantomData,
        }
    }

    /// Construct from a standard vector, copying it into 64-byte aligned storage.
    #[inline]
    pub fn from_vec(v: Vec<T>) -> Self {
        Self::from_slice(&v)
    }

    /// Construct an owned buffer from a slice, copying the data into an aligned Vec64.
    #[inline]
    pub fn from_slice(slice: &[T]) -> Self {
        let mut v = Vec64::with_capacity(slice.len());
        v.extend_from_slice(slice);
        Self::from_vec64(v)
    }

    /// Construct a buffer as a view over a SharedBuffer (zero-copy, read-only).
    ///
    /// # Behaviour
    /// - A byte length that is not a whole number of `T` is an `ImportError`.
    /// - A region that is not aligned for `T` is copied into a fresh `Vec64<T>`.
    pub fn from_shared(owner: SharedBuffer) -> Result<Self> {
        let size_of_t = std::mem::size_of::<T>();
        let bytes = owner.as_slice();
        if bytes.len() % size_of_t != 0 {
            return Err(BridgeError::import(format!(
                "buffer of {} bytes is not a whole number of {size_of_t}-byte values",
                bytes.len()
            )));
        }
        let len = bytes.len() / size_of_t;
        if len > 0 && (bytes.as_ptr() as usize) % std::mem::align_of::<T>() != 0 {
            warn!(
                ptr = ?bytes.as_ptr(),
                align = std::mem::align_of::<T>(),
                "foreign buffer misaligned for its element type, copying"
            );
            let mut v = Vec64::<T>::with_capacity(len);
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), v.as_mut_ptr() as *mut u8, bytes.len());
                v.set_len(len);
            }
            return Ok(Self::from_vec64(v));
        }
        Ok(Self {
            owner,
            offset: 0,
            len,
            _marker: PhantomData,
        })
    }

    /// Returns the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: alignment and length were checked on construction, and the region
        // stays alive for as long as `owner` does.
        unsafe {
            std::slice::from_raw_parts((self.owner.as_ptr() as *const T).add(self.offset), self.len)
        }
    }

    /// Pointer to the first element, suitable for an `ArrowArray` buffer slot.
    ///
    /// Empty buffers return a dangling, well-aligned, non-null pointer.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        if self.len == 0 {
            return NonNull::<T>::dangling().as_ptr();
        }
        self.as_slice().as_ptr()
    }

    /// Zero-copy window `[offset, offset + len)`.
    ///
    /// # Panics
    /// If the window is out of bounds.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len),
            "Buffer::slice: {offset}+{len} out of bounds for length {}",
            self.len
        );
        Self {
            owner: self.owner.clone(),
            offset: self.offset + offset,
            len,
            _marker: PhantomData,
        }
    }
}

impl<T> Buffer<T> {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shared storage backing this window.
    #[inline]
    pub fn shared(&self) -> &SharedBuffer {
        &self.owner
    }
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            offset: self.offset,
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl<T: Primitive> Default for Buffer<T> {
    fn default() -> Self {
        Self::from_vec64(Vec64::new())
    }
}

impl<T: Primitive> Deref for Buffer<T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Primitive> AsRef<[T]> for Buffer<T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Primitive> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Primitive> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice().iter()).finish()
    }
}

impl<T: Primitive> From<Vec<T>> for Buffer<T> {
    #[inline]
    fn from(v: Vec<T>) -> Self {
        Self::from_vec(v)
    }
}

impl<T: Primitive> From<Vec64<T>> for Buffer<T> {
    #[inline]
    fn from(v: Vec64<T>) -> Self {
        Self::from_vec64(v)
    }
}

impl<T: Primitive> From<&[T]> for Buffer<T> {
    #[inline]
    fn from(s: &[T]) -> Self {
        Self::from_slice(s)
    }
}

impl<T: Primitive> FromIterator<T> for Buffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec64(iter.into_iter().collect())
    }
}
