//! Vtable implementations for SharedBuffer memory management backends.
//!
//! Defines static function tables for the two ownership models:
//! - `STATIC_VT`: Read-only static data (no reference counting)
//! - `OWNED_VT` (in `owned.rs`): atomically reference-counted owners

use std::ptr;
use std::sync::atomic::AtomicPtr;

use crate::structs::shared_buffer::SharedBuffer;

/// Function table for `SharedBuffer` backend-specific memory operations.
///
/// ### Fields
/// - `clone`: Increments reference count, returns new `SharedBuffer` sharing data
/// - `drop`: Decrements reference count, destroys storage on the last reference
/// - `ref_count`: Live references to the backing storage (`0` for static data)
pub(crate) struct Vtable {
    pub(crate) clone: unsafe fn(&AtomicPtr<()>, *const u8, usize) -> SharedBuffer,
    pub(crate) drop: unsafe fn(&mut AtomicPtr<()>, *const u8, usize),
    pub(crate) ref_count: fn(&AtomicPtr<()>) -> usize,
}

/// Vtable for static/const data requiring no reference counting.
pub(crate) static STATIC_VT: Vtable = Vtable {
    clone: |_, p, l| SharedBuffer {
        ptr: p,
        len: l,
        data: AtomicPtr::new(ptr::null_mut()),
        vtable: &STATIC_VT,
    },
    drop: |_, _, _| {},
    ref_count: |_| 0,
};
