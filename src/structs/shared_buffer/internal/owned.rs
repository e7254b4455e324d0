//! # **Internal module**
//!
//! Reference-counted owner allocation behind `SharedBuffer`.
//!
//! The refcount header sits first in a `#[repr(C)]` block, followed by the owner value.
//! The header also records how to drop the concrete owner type, so a single vtable can
//! serve every owner type.

use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::{Primitive, Vec64};
use crate::structs::shared_buffer::SharedBuffer;
use crate::structs::shared_buffer::internal::vtable::Vtable;

/// Type-erased prefix shared by every `Owned<T>` allocation.
#[repr(C)]
pub(crate) struct OwnedHeader {
    pub(crate) ref_cnt: AtomicUsize,
    pub(crate) drop_owner: unsafe fn(*mut ()),
}

/// Reference-counted wrapper for arbitrary backing storage types.
#[repr(C)]
pub(crate) struct Owned<T: AsRef<[u8]> + Send + Sync + 'static> {
    pub(crate) header: OwnedHeader,
    pub(crate) owner: T,
}

/// Frees an `Owned<T>` allocation, running the owner's own `Drop`.
pub(crate) unsafe fn drop_owned<T: AsRef<[u8]> + Send + Sync + 'static>(raw: *mut ()) {
    drop(unsafe { Box::from_raw(raw as *mut Owned<T>) });
}

#[inline]
fn header<'a>(raw: *mut ()) -> &'a OwnedHeader {
    // SAFETY: header is the first field of a #[repr(C)] Owned<T>
    unsafe { &*(raw as *const OwnedHeader) }
}

/// Clones owned buffer by incrementing reference count.
unsafe fn owned_clone(h: &AtomicPtr<()>, p: *const u8, l: usize) -> SharedBuffer {
    let raw = h.load(Ordering::Acquire);
    debug_assert!(!raw.is_null());
    header(raw).ref_cnt.fetch_add(1, Ordering::Relaxed);
    SharedBuffer {
        ptr: p,
        len: l,
        data: AtomicPtr::new(raw),
        vtable: &OWNED_VT,
    }
}

/// Decrements reference count, dropping the owner on the last reference.
unsafe fn owned_drop(h: &mut AtomicPtr<()>, _p: *const u8, _l: usize) {
    let raw = h.load(Ordering::Acquire);
    if raw.is_null() {
        return;
    }
    let hdr = header(raw);
    if hdr.ref_cnt.fetch_sub(1, Ordering::AcqRel) == 1 {
        let drop_owner = hdr.drop_owner;
        unsafe { drop_owner(raw) };
    }
}

fn owned_ref_count(h: &AtomicPtr<()>) -> usize {
    let raw = h.load(Ordering::Acquire);
    if raw.is_null() {
        return 0;
    }
    header(raw).ref_cnt.load(Ordering::Acquire)
}

/// Vtable for reference-counted owned buffers (vectors, foreign arrays, custom containers).
pub(crate) static OWNED_VT: Vtable = Vtable {
    clone: owned_clone,
    drop: owned_drop,
    ref_count: owned_ref_count,
};

/// Byte view over an owned, 64-byte aligned `Vec64<T>` of fixed-width values.
pub(crate) struct VecOwner<T: Primitive>(pub(crate) Vec64<T>);

impl<T: Primitive> AsRef<[u8]> for VecOwner<T> {
    fn as_ref(&self) -> &[u8] {
        let len = self.0.len() * std::mem::size_of::<T>();
        // SAFETY: `Primitive` types have no padding and every byte is initialised
        unsafe { std::slice::from_raw_parts(self.0.as_ptr() as *const u8, len) }
    }
}
