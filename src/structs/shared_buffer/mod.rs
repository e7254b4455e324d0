//! # **SharedBuffer Internal Module** - Backs *Buffer* for zero-copy foreign buffer sharing
//!
//! Zero-copy, atomically reference-counted byte buffer.
//!
//! This is the unit of ownership at the interchange boundary. An exported descriptor keeps
//! clones of the `SharedBuffer`s it points into, and an imported descriptor is wrapped as the
//! owner of new `SharedBuffer`s, so a region is only freed once the last reference on either
//! side of the boundary is gone.

use core::ops::RangeBounds;
use core::{ptr, slice};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicPtr, AtomicUsize};

use crate::{Primitive, Vec64};
use crate::structs::shared_buffer::internal::owned::{OWNED_VT, Owned, OwnedHeader, VecOwner, drop_owned};
use crate::structs::shared_buffer::internal::vtable::{STATIC_VT, Vtable};

mod internal {
    pub(crate) mod owned;
    pub(crate) mod vtable;
}

/// # SharedBuffer
///
/// Zero-copy, reference-counted byte buffer.
///
/// ## Features
/// - O(1) pointer-based cloning and slicing
/// - Backed by a 64-byte aligned `Vec64<T>` of primitives, any `AsRef<[u8]>` owner, or
///   static data
/// - Thread-safe reference counting via a compact vtable. Counts are updated atomically,
///   since export, import and release may run on different threads.
///
/// ## Usage
/// ```rust
/// use colbridge::SharedBuffer;
/// let sb = SharedBuffer::from_vec(vec![1u8, 2, 3, 4, 5]);
/// let slice = sb.slice(0..2);        // Zero-copy slice
/// assert_eq!(&slice[..], &[1, 2]);
/// assert_eq!(sb.ref_count(), 2);
/// ```
#[repr(C)]
pub struct SharedBuffer {
    ptr: *const u8,
    len: usize,
    data: AtomicPtr<()>, // header or null
    vtable: &'static Vtable,
}

impl SharedBuffer {
    /// Constructs a new, empty `SharedBuffer`
    pub const fn new() -> Self {
        const EMPTY: &[u8] = &[];
        Self::from_static(EMPTY)
    }

    /// Constructs a `SharedBuffer` from a static slice
    pub const fn from_static(s: &'static [u8]) -> Self {
        Self {
            ptr: s.as_ptr(),
            len: s.len(),
            data: AtomicPtr::new(ptr::null_mut()),
            vtable: &STATIC_VT,
        }
    }

    /// Takes ownership of an aligned vector of fixed-width values without copying.
    pub fn from_vec64<T: Primitive>(v: Vec64<T>) -> Self {
        Self::from_owner(VecOwner(v))
    }

    /// Copies a standard vector into 64-byte aligned storage.
    pub fn from_vec<T: Primitive>(v: Vec<T>) -> Self {
        Self::from_vec64(Vec64::from_slice(&v))
    }

    /// Constructs a `SharedBuffer` from an arbitrary owner (e.g. `Arc<[u8]>`, a foreign array).
    ///
    /// The bytes returned by `owner.as_ref()` must not move when the owner is moved,
    /// which holds for heap-backed containers. The owner is dropped together with the
    /// last clone of the buffer.
    pub fn from_owner<T>(owner: T) -> Self
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        let raw: *mut Owned<T> = Box::into_raw(Box::new(Owned {
            header: OwnedHeader {
                ref_cnt: AtomicUsize::new(1),
                drop_owner: drop_owned::<T>,
            },
            owner,
        }));
        let buf = unsafe { (*raw).owner.as_ref() };
        Self {
            ptr: buf.as_ptr(),
            len: buf.len(),
            data: AtomicPtr::new(raw.cast()),
            vtable: &OWNED_VT,
        }
    }

    /// Returns the number of bytes in this buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if this buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start of the byte region.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Returns a read-only view of the data as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Returns a zero-copy slice of this buffer's data.
    ///
    /// Panics if range is out of bounds.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        use core::ops::Bound::*;
        let start = match range.start_bound() {
            Unbounded => 0,
            Included(&n) => n,
            Excluded(&n) => n + 1,
        };
        let end = match range.end_bound() {
            Unbounded => self.len,
            Included(&n) => n + 1,
            Excluded(&n) => n,
        };
        assert!(
            start <= end && end <= self.len,
            "SharedBuffer::slice: {start}..{end} out of bounds for length {}",
            self.len
        );
        let mut s = self.clone();
        s.ptr = unsafe { s.ptr.add(start) };
        s.len = end - start;
        s
    }

    /// Live references to the backing storage. Static buffers report `0`.
    #[inline]
    pub fn ref_count(&self) -> usize {
        (self.vtable.ref_count)(&self.data)
    }

    /// Returns `true` if this buffer is the unique owner of its underlying storage.
    ///
    /// Static buffers always report `true`: the memory is never deallocated, so no
    /// runtime references are tracked.
    #[inline]
    pub fn is_unique(&self) -> bool {
        let n = self.ref_count();
        n <= 1
    }
}

impl Clone for SharedBuffer {
    /// Clones this buffer. Always O(1), increases refcount if needed.
    fn clone(&self) -> Self {
        unsafe { (self.vtable.clone)(&self.data, self.ptr, self.len) }
    }
}

impl Drop for SharedBuffer {
    /// Drops this buffer, decrementing the reference count and releasing the owner if last.
    fn drop(&mut self) {
        unsafe { (self.vtable.drop)(&mut self.data, self.ptr, self.len) }
    }
}

impl Default for SharedBuffer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Compare for equality (byte-wise).
impl PartialEq for SharedBuffer {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
impl Eq for SharedBuffer {}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.len)
            .field("refs", &self.ref_count())
            .finish()
    }
}

impl Deref for SharedBuffer {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for SharedBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for SharedBuffer {
    #[inline]
    fn from(v: Vec<u8>) -> Self {
        Self::from_vec(v)
    }
}

impl From<Vec64<u8>> for SharedBuffer {
    #[inline]
    fn from(v: Vec64<u8>) -> Self {
        Self::from_vec64(v)
    }
}

impl From<&'static [u8]> for SharedBuffer {
    #[inline]
    fn from(s: &'static [u8]) -> Self {
        Self::from_static(s)
    }
}

// SAFETY: the backing storage is immutable and reference counts are atomic.
unsafe impl Send for SharedBuffer {}
unsafe impl Sync for SharedBuffer {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn roundtrip_vec() {
        let sb = SharedBuffer::from_vec(vec![1u8, 2, 3, 4, 5]);
        assert_eq!(sb.as_slice(), &[1, 2, 3, 4, 5]);
        let typed = SharedBuffer::from_vec(vec![1u32, 2]);
        assert_eq!(typed.len(), 8);
    }

    #[test]
    fn owned_storage_is_64_byte_aligned() {
        for n in 1..40usize {
            let sb = SharedBuffer::from_vec64((0..n as u64).collect::<Vec64<u64>>());
            assert_eq!(sb.as_ptr() as usize % 64, 0, "len {n}");
            let copied = SharedBuffer::from_vec(vec![0u16; n]);
            assert_eq!(copied.as_ptr() as usize % 64, 0, "len {n}");
        }
    }

    #[test]
    fn owned_unique_check() {
        let mmap = Arc::new([10u8, 11, 12, 13]) as Arc<[u8]>;
        let sb = SharedBuffer::from_owner(mmap);
        assert!(sb.is_unique());
        let sb2 = sb.slice(1..3);
        assert!(!sb.is_unique());
        assert_eq!(&sb2[..], &[11, 12]);
        drop(sb2);
        assert!(sb.is_unique());
    }

    #[test]
    fn owner_dropped_once_after_last_clone() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);
        struct Tracked(Vec<u8>);
        impl AsRef<[u8]> for Tracked {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let sb = SharedBuffer::from_owner(Tracked(vec![7; 16]));
        let clones: Vec<_> = (0..8).map(|_| sb.clone()).collect();
        let handles: Vec<_> = clones
            .into_iter()
            .map(|c| std::thread::spawn(move || c.slice(4..8).len()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 4);
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 0);
        drop(sb);
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn static_buffers_are_untracked() {
        let sb = SharedBuffer::from_static(b"abc");
        assert_eq!(sb.ref_count(), 0);
        assert!(sb.clone().is_unique());
        assert!(SharedBuffer::new().is_empty());
    }
}
