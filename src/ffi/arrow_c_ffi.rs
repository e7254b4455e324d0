//! # **Arrow-C-FFI Module** - *The C Data and C Stream interface structs*
//!
//! `#[repr(C)]` definitions of the three descriptors of the *Apache Arrow* C Data
//! Interface and C Stream Interface, field for field as published:
//! <https://arrow.apache.org/docs/format/CDataInterface.html>
//! <https://arrow.apache.org/docs/format/CStreamInterface.html>
//!
//! ## Ownership rules
//! - A descriptor is live while `release` is `Some`. Calling `release` frees whatever
//!   the producer attached to it and sets `release` to `None`. Never call it twice.
//! - Moving a descriptor is a bitwise copy followed by marking the source released,
//!   see [`ArrowArray::take`]. The consumer then owns the only live copy.
//! - Child and dictionary descriptors are owned by their parent. Only the root is
//!   released by the consumer.
//!
//! ## Trademark Notice
//! *Apache Arrow* is a trademark of the Apache Software Foundation, used here under
//! fair-use to implement its published interoperability standard as per
//! <https://www.apache.org/foundation/marks/>.

use std::ffi::{c_char, c_int, c_void};
use std::ptr;

/// The dictionary's index order is meaningful.
pub const ARROW_FLAG_DICTIONARY_ORDERED: i64 = 1;
/// The field may contain nulls.
pub const ARROW_FLAG_NULLABLE: i64 = 2;
/// Map keys are sorted within each map value.
pub const ARROW_FLAG_MAP_KEYS_SORTED: i64 = 4;

/// ArrowSchema, as laid out by the Arrow C Data Interface.
#[repr(C)]
#[derive(Debug)]
pub struct ArrowSchema {
    pub format: *const c_char,
    pub name: *const c_char,
    pub metadata: *const c_char,
    pub flags: i64,
    pub n_children: i64,
    pub children: *mut *mut ArrowSchema,
    pub dictionary: *mut ArrowSchema,
    pub release: Option<unsafe extern "C" fn(*mut ArrowSchema)>,
    pub private_data: *mut c_void,
}

/// ArrowArray, as laid out by the Arrow C Data Interface.
///
/// 1. `ArrowArray::empty()` gives a released struct for a producer to fill in.
/// 2. The producer sets `buffers` to point at its own memory and attaches a release callback.
/// 3. On import, the struct is moved into a shared owner and buffers are read in place.
#[repr(C)]
#[derive(Debug)]
pub struct ArrowArray {
    pub length: i64,
    pub null_count: i64,
    pub offset: i64,
    pub n_buffers: i64,
    pub n_children: i64,
    pub buffers: *mut *const c_void,
    pub children: *mut *mut ArrowArray,
    pub dictionary: *mut ArrowArray,
    pub release: Option<unsafe extern "C" fn(*mut ArrowArray)>,
    pub private_data: *mut c_void,
}

/// ArrowArrayStream, as laid out by the Arrow C Stream Interface.
///
/// `get_next` returning `0` with a released `out` signals end of stream. A non-zero
/// return is an errno-compatible code, with details from `get_last_error`.
#[repr(C)]
#[derive(Debug)]
pub struct ArrowArrayStream {
    pub get_schema: Option<unsafe extern "C" fn(*mut ArrowArrayStream, *mut ArrowSchema) -> c_int>,
    pub get_next: Option<unsafe extern "C" fn(*mut ArrowArrayStream, *mut ArrowArray) -> c_int>,
    pub get_last_error: Option<unsafe extern "C" fn(*mut ArrowArrayStream) -> *const c_char>,
    pub release: Option<unsafe extern "C" fn(*mut ArrowArrayStream)>,
    pub private_data: *mut c_void,
}

impl ArrowSchema {
    /// A released schema, for receiving FFI data.
    pub const fn empty() -> Self {
        Self {
            format: ptr::null(),
            name: ptr::null(),
            metadata: ptr::null(),
            flags: 0,
            n_children: 0,
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Moves the descriptor out, leaving `self` released.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::empty())
    }

    /// Invokes the release callback if the schema is still live.
    pub fn release(&mut self) {
        if let Some(release) = self.release {
            unsafe { release(self) };
            debug_assert!(self.release.is_none(), "ArrowSchema release callback must mark it released");
        }
    }
}

impl ArrowArray {
    /// A released array, for receiving FFI data.
    pub const fn empty() -> Self {
        Self {
            length: 0,
            null_count: 0,
            offset: 0,
            n_buffers: 0,
            n_children: 0,
            buffers: ptr::null_mut(),
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Moves the descriptor out, leaving `self` released.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::empty())
    }

    /// Invokes the release callback if the array is still live.
    pub fn release(&mut self) {
        if let Some(release) = self.release {
            unsafe { release(self) };
            debug_assert!(self.release.is_none(), "ArrowArray release callback must mark it released");
        }
    }
}

impl ArrowArrayStream {
    /// A released stream, for receiving FFI data.
    pub const fn empty() -> Self {
        Self {
            get_schema: None,
            get_next: None,
            get_last_error: None,
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Moves the descriptor out, leaving `self` released.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::empty())
    }

    /// Invokes the release callback if the stream is still live.
    pub fn release(&mut self) {
        if let Some(release) = self.release {
            unsafe { release(self) };
            debug_assert!(self.release.is_none(), "ArrowArrayStream release callback must mark it released");
        }
    }
}

// Descriptors are plain data handed between threads. The producer's private data is
// only touched through the callbacks, which the protocol serialises per descriptor.
unsafe impl Send for ArrowSchema {}
unsafe impl Send for ArrowArray {}
unsafe impl Send for ArrowArrayStream {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RELEASES: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_release(a: *mut ArrowArray) {
        RELEASES.fetch_add(1, Ordering::SeqCst);
        unsafe { (*a).release = None };
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn layouts_match_the_c_headers() {
        assert_eq!(std::mem::size_of::<ArrowSchema>(), 72);
        assert_eq!(std::mem::size_of::<ArrowArray>(), 80);
        assert_eq!(std::mem::size_of::<ArrowArrayStream>(), 40);
    }

    #[test]
    fn take_leaves_source_released() {
        let mut a = ArrowArray::empty();
        a.release = Some(count_release);
        let mut moved = a.take();
        assert!(a.is_released());
        a.release();
        assert_eq!(RELEASES.load(Ordering::SeqCst), 0);
        moved.release();
        moved.release();
        assert_eq!(RELEASES.load(Ordering::SeqCst), 1);
    }
}
