//! # **Import Module** - *ArrowArray -> Array, reading foreign buffers in place*
//!
//! The consumer side of the C Data Interface. A moved-in `ArrowArray` is wrapped in one
//! shared [`ForeignArray`] owner straight away, before anything is validated. Every
//! imported buffer holds a clone of that owner, so:
//!
//! - the foreign release callback runs exactly once, when the last imported buffer is
//!   dropped;
//! - a failed import drops the owner on the error path, which releases the descriptor,
//!   so rejected arrays never leak.
//!
//! ## Validation
//! Before any buffer is read, each node is checked against its resolved type: buffer and
//! child counts, non-negative length and offset, a null count in `-1..=length`, and
//! that nulls come with a validity bitmap. Children must cover their parent's window.
//! Offsets are checked for monotonicity and against the data and child lengths.
//!
//! Every byte size is computed with checked arithmetic and must fit in `isize`, so an
//! absurd `length` or `offset` is an `ImportError`, never a wild read.
//!
//! A non-zero `offset` is honoured by slicing, so it stays zero-copy. Buffers that are not
//! aligned for their element type are copied, with a `warn!`.
//!
//! ## String views
//! `Utf8View` arrays (`vu`) have no zero-copy counterpart here. Their values are copied
//! into a `String` array, and the imported field reports `String`.
//!
//! ## Struct children
//! Every column of a struct or record batch is attempted, even after one fails. A single
//! failure is returned as is. Several are folded into one `ImportError` naming each
//! column.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema};
use crate::ffi::schema::{Schema, import_schema};
use crate::traits::type_unions::{OffsetType, Primitive};
use crate::{
    Array, ArrowType, Bitmask, BooleanArray, Buffer, CategoricalArray, Field, FieldArray, FloatArray,
    IntegerArray, ListArray, SharedBuffer, StringArray, StructArray, Table, Vec64, vec64,
};

/// A foreign `ArrowArray` root. Dropping it invokes the producer's release callback.
pub struct ForeignArray {
    array: ArrowArray,
}

impl Drop for ForeignArray {
    fn drop(&mut self) {
        trace!(len = self.array.length, "releasing imported ArrowArray");
        self.array.release();
    }
}

// The descriptor is only read after construction, and released once from `Drop`.
unsafe impl Send for ForeignArray {}
unsafe impl Sync for ForeignArray {}

/// One buffer of a foreign array, kept alive by the shared root.
struct ForeignBuffer {
    ptr: *const u8,
    len: usize,
    _owner: Arc<ForeignArray>,
}

impl AsRef<[u8]> for ForeignBuffer {
    fn as_ref(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

unsafe impl Send for ForeignBuffer {}
unsafe impl Sync for ForeignBuffer {}

/// Reads one descriptor node against its resolved type.
struct NodeReader<'a> {
    desc: &'a ArrowArray,
    dtype: &'a ArrowType,
    owner: &'a Arc<ForeignArray>,
    len: usize,
    offset: usize,
    /// `offset + len`, checked on construction.
    end: usize,
    /// `None` when the producer reported `-1`.
    null_count: Option<usize>,
}

impl<'a> NodeReader<'a> {
    fn new(desc: &'a ArrowArray, dtype: &'a ArrowType, owner: &'a Arc<ForeignArray>) -> Result<Self> {
        if desc.is_released() {
            return Err(BridgeError::import(format!("{dtype} descriptor has already been released")));
        }
        let len = usize::try_from(desc.length)
            .map_err(|_| BridgeError::import(format!("negative length {}", desc.length)))?;
        let offset = usize::try_from(desc.offset)
            .map_err(|_| BridgeError::import(format!("negative offset {}", desc.offset)))?;
        let end = offset.checked_add(len).filter(|&e| e <= isize::MAX as usize).ok_or_else(|| {
            BridgeError::import(format!("length {len} at offset {offset} overflows"))
        })?;
        let null_count = match desc.null_count {
            -1 => None,
            n if n >= 0 && n as u64 <= len as u64 => Some(n as usize),
            n => {
                return Err(BridgeError::import(format!(
                    "null_count {n} is outside -1..={len}"
                )));
            }
        };
        let (n_buffers, n_children) = expected_layout(dtype);
        if *dtype == ArrowType::Utf8View {
            // validity, views, the variadic data buffers, then their sizes
            if desc.n_buffers < n_buffers {
                return Err(BridgeError::import(format!(
                    "{dtype} requires at least {n_buffers} buffers, found {}",
                    desc.n_buffers
                )));
            }
        } else if desc.n_buffers != n_buffers {
            return Err(BridgeError::import(format!(
                "{dtype} requires {n_buffers} buffers, found {}",
                desc.n_buffers
            )));
        }
        if desc.n_children != n_children {
            return Err(BridgeError::schema(format!(
                "{dtype} requires {n_children} children, found {}",
                desc.n_children
            )));
        }
        if n_buffers > 0 && desc.buffers.is_null() {
            return Err(BridgeError::NullPointer("ArrowArray.buffers"));
        }
        if n_children > 0 && desc.children.is_null() {
            return Err(BridgeError::NullPointer("ArrowArray.children"));
        }
        Ok(Self {
            desc,
            dtype,
            owner,
            len,
            offset,
            end,
            null_count,
        })
    }

    /// The end of the window in elements, `offset + len`.
    fn end(&self) -> usize {
        self.end
    }

    /// Bytes spanned by `count` elements of `width` bytes.
    ///
    /// # Errors
    /// `ImportError` when the size overflows or exceeds `isize::MAX`.
    fn nbytes(&self, count: usize, width: usize) -> Result<usize> {
        count
            .checked_mul(width)
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| {
                BridgeError::import(format!(
                    "{} length {} at offset {} overflows a buffer of {width}-byte values",
                    self.dtype, self.len, self.offset
                ))
            })
    }

    /// `nbytes` of buffer `i`, owned by the foreign root. `None` for a null pointer.
    fn raw(&self, i: usize, nbytes: usize) -> Option<SharedBuffer> {
        let ptr = unsafe { *self.desc.buffers.add(i) } as *const u8;
        if ptr.is_null() {
            return None;
        }
        if nbytes == 0 {
            return Some(SharedBuffer::default());
        }
        Some(SharedBuffer::from_owner(ForeignBuffer {
            ptr,
            len: nbytes,
            _owner: Arc::clone(self.owner),
        }))
    }

    fn required(&self, i: usize, nbytes: usize, what: &str) -> Result<SharedBuffer> {
        match self.raw(i, nbytes) {
            Some(b) => Ok(b),
            None if nbytes == 0 => Ok(SharedBuffer::default()),
            None => Err(BridgeError::import(format!("{} {what} buffer is null", self.dtype))),
        }
    }

    fn validity(&self) -> Result<Option<Bitmask>> {
        let Some(bytes) = self.raw(0, self.end().div_ceil(8)) else {
            return match self.null_count {
                Some(n) if n > 0 => Err(BridgeError::import(format!(
                    "{} reports {n} nulls but has no validity bitmap",
                    self.dtype
                ))),
                _ => Ok(None),
            };
        };
        let mask = Bitmask::new(Buffer::from_shared(bytes)?, self.offset, self.len)?;
        if let Some(n) = self.null_count {
            let actual = mask.count_zeros();
            if actual != n {
                return Err(BridgeError::import(format!(
                    "null_count {n} disagrees with the validity bitmap ({actual} nulls)"
                )));
            }
        }
        Ok(Some(mask))
    }

    fn values<T: Primitive>(&self, i: usize) -> Result<Buffer<T>> {
        let bytes = self.required(i, self.nbytes(self.end(), size_of::<T>())?, "values")?;
        Ok(Buffer::<T>::from_shared(bytes)?.slice(self.offset, self.len))
    }

    fn bits(&self, i: usize) -> Result<Bitmask> {
        let bytes = self.required(i, self.end().div_ceil(8), "values")?;
        Bitmask::new(Buffer::from_shared(bytes)?, self.offset, self.len)
    }

    /// The `len + 1` offsets of the window, left absolute.
    fn offsets<T: OffsetType>(&self, i: usize) -> Result<Buffer<T>> {
        let count = self.end() + 1;
        let Some(bytes) = self.raw(i, self.nbytes(count, size_of::<T>())?) else {
            if self.len == 0 {
                return Ok(Buffer::from_vec64(vec64![T::zero()]));
            }
            return Err(BridgeError::import(format!("{} offsets buffer is null", self.dtype)));
        };
        let offsets = Buffer::<T>::from_shared(bytes)?.slice(self.offset, self.len + 1);
        if let Some(bad) = offsets.iter().find(|o| o.as_usize() as u64 > T::MAX_OFFSET) {
            return Err(BridgeError::import(format!(
                "offset {} is negative as a signed {}-bit offset",
                bad.as_usize(),
                size_of::<T>() * 8
            )));
        }
        Ok(offsets)
    }

    fn child(&self, i: usize) -> Result<&'a ArrowArray> {
        let ptr = unsafe { *self.desc.children.add(i) };
        if ptr.is_null() {
            return Err(BridgeError::NullPointer("ArrowArray child"));
        }
        Ok(unsafe { &*ptr })
    }

    fn read(&self) -> Result<Array> {
        macro_rules! int {
            ($ctor:ident, $t:ty) => {
                Array::$ctor(IntegerArray::<$t>::new(self.values::<$t>(1)?, self.validity()?))
            };
        }
        macro_rules! float {
            ($ctor:ident, $t:ty) => {
                Array::$ctor(FloatArray::<$t>::new(self.values::<$t>(1)?, self.validity()?))
            };
        }
        #[cfg(feature = "datetime")]
        macro_rules! temporal {
            ($ctor:ident, $t:ty, $unit:expr) => {
                Array::$ctor(crate::DatetimeArray::<$t>::new(self.values::<$t>(1)?, self.validity()?, $unit))
            };
        }

        let array = match self.dtype {
            ArrowType::Null => Array::Null(self.len),
            ArrowType::Boolean => Array::from_bool(BooleanArray::new(self.bits(1)?, self.validity()?)),
            ArrowType::Int8 => int!(from_int8, i8),
            ArrowType::Int16 => int!(from_int16, i16),
            ArrowType::Int32 => int!(from_int32, i32),
            ArrowType::Int64 => int!(from_int64, i64),
            ArrowType::UInt8 => int!(from_uint8, u8),
            ArrowType::UInt16 => int!(from_uint16, u16),
            ArrowType::UInt32 => int!(from_uint32, u32),
            ArrowType::UInt64 => int!(from_uint64, u64),
            ArrowType::Float32 => float!(from_float32, f32),
            ArrowType::Float64 => float!(from_float64, f64),
            ArrowType::String => Array::from_string32(self.string::<u32>()?),
            ArrowType::LargeString => Array::from_string64(self.string::<u64>()?),
            #[cfg(feature = "datetime")]
            ArrowType::Date32 => temporal!(from_date32, i32, crate::TimeUnit::Days),
            #[cfg(feature = "datetime")]
            ArrowType::Date64 => temporal!(from_date64, i64, crate::TimeUnit::Milliseconds),
            #[cfg(feature = "datetime")]
            ArrowType::Time32(unit) => temporal!(from_time32, i32, *unit),
            #[cfg(feature = "datetime")]
            ArrowType::Time64(unit) => temporal!(from_time64, i64, *unit),
            #[cfg(feature = "datetime")]
            ArrowType::Timestamp(unit, tz) => {
                let mut a = crate::DatetimeArray::<i64>::new(self.values::<i64>(1)?, self.validity()?, *unit);
                a.timezone = tz.clone();
                Array::from_timestamp(a)
            }
            #[cfg(feature = "datetime")]
            ArrowType::Duration(unit) => temporal!(from_duration, i64, *unit),
            #[cfg(feature = "datetime")]
            ArrowType::Interval(unit) => Array::from_interval(self.interval(*unit)?),
            ArrowType::Utf8View => Array::from_string32(self.string_view()?),
            ArrowType::Dictionary { index, values, ordered } => {
                let key_type = index.key_type();
                let keys = match (NodeReader { dtype: &key_type, ..*self }).read()? {
                    Array::NumericArray(k) => k,
                    other => {
                        return Err(BridgeError::schema(format!(
                            "dictionary keys decoded as {}",
                            other.arrow_type()
                        )));
                    }
                };
                if self.desc.dictionary.is_null() {
                    return Err(BridgeError::NullPointer("ArrowArray.dictionary"));
                }
                let dict = unsafe { &*self.desc.dictionary };
                let values = NodeReader::new(dict, values, self.owner)?.read()?;
                Array::from_categorical(CategoricalArray::try_new(keys, values, *ordered)?)
            }
            ArrowType::Struct(fields) => {
                let mut children = Vec::with_capacity(fields.len());
                let mut failures = Vec::new();
                for (i, field) in fields.iter().enumerate() {
                    match self.struct_child(i, field) {
                        Ok(child) => children.push(child),
                        Err(e) => failures.push((field.name.as_str(), e)),
                    }
                }
                if !failures.is_empty() {
                    return Err(fold_child_errors(failures));
                }
                Array::from_struct(StructArray::try_new_with_len(
                    materialised_fields(fields),
                    children,
                    self.validity()?,
                    self.len,
                )?)
            }
            ArrowType::List(field) => Array::from_list(self.list::<u32>(field)?),
            ArrowType::LargeList(field) => Array::from_large_list(self.list::<u64>(field)?),
        };
        Ok(array)
    }

    /// Child `i` of a struct, windowed to the parent.
    fn struct_child(&self, i: usize, field: &Field) -> Result<Array> {
        let child = NodeReader::new(self.child(i)?, &field.dtype, self.owner)?.read()?;
        if child.len() < self.end() {
            return Err(BridgeError::import(format!(
                "struct child '{}' has {} rows, parent window ends at {}",
                field.name,
                child.len(),
                self.end()
            )));
        }
        Ok(child.slice(self.offset, self.len))
    }

    #[cfg(feature = "datetime")]
    fn interval(&self, unit: crate::IntervalUnit) -> Result<crate::IntervalArray> {
        let words = unit.words();
        let bytes = self.required(1, self.nbytes(self.end(), words * size_of::<i32>())?, "values")?;
        let data = Buffer::<i32>::from_shared(bytes)?.slice(self.offset * words, self.len * words);
        crate::IntervalArray::try_new(data, self.validity()?, unit)
    }

    /// Copies a `Utf8View` array into 32-bit offsets and contiguous data.
    ///
    /// A view is 16 bytes: an `i32` length, then either up to 12 inline bytes, or a
    /// 4-byte prefix, an `i32` buffer index and an `i32` offset into that buffer.
    fn string_view(&self) -> Result<StringArray<u32>> {
        const VIEW: usize = 16;
        const INLINE: usize = 12;
        let validity = self.validity()?;
        if self.len == 0 {
            return StringArray::from_parts(Buffer::default(), Buffer::default(), validity);
        }
        let views = self.required(1, self.nbytes(self.end(), VIEW)?, "views")?;
        let n_variadic = (self.desc.n_buffers - 3) as usize;
        let sizes = self.required(2 + n_variadic, n_variadic * size_of::<i64>(), "variadic sizes")?;
        let sizes = Buffer::<i64>::from_shared(sizes)?;
        let mut variadic = Vec::with_capacity(n_variadic);
        for (k, &size) in sizes.iter().enumerate() {
            let size = usize::try_from(size)
                .map_err(|_| BridgeError::import(format!("variadic buffer {k} has negative size {size}")))?;
            variadic.push(self.required(2 + k, size, "variadic data")?);
        }

        let mut offsets = Vec64::<u32>::with_capacity(self.len + 1);
        let mut data = Vec64::<u8>::new();
        offsets.push(0);
        for i in 0..self.len {
            if validity.as_ref().is_some_and(|m| !m.get(i)) {
                offsets.push(data.len() as u32);
                continue;
            }
            let at = (self.offset + i) * VIEW;
            let view = &views[at..at + VIEW];
            let word = |k: usize| i32::from_ne_bytes([view[k], view[k + 1], view[k + 2], view[k + 3]]);
            let n = usize::try_from(word(0))
                .map_err(|_| BridgeError::import(format!("string view {i} has negative length {}", word(0))))?;
            if n <= INLINE {
                data.extend_from_slice(&view[4..4 + n]);
            } else {
                let (buf, start) = (word(8), word(12));
                let bytes = usize::try_from(buf).ok().and_then(|b| variadic.get(b)).ok_or_else(|| {
                    BridgeError::import(format!("string view {i} names buffer {buf} of {n_variadic}"))
                })?;
                let start = usize::try_from(start)
                    .map_err(|_| BridgeError::import(format!("string view {i} has negative offset {start}")))?;
                let src = start
                    .checked_add(n)
                    .and_then(|stop| bytes.get(start..stop))
                    .ok_or_else(|| {
                        BridgeError::import(format!(
                            "string view {i} reads {n} bytes at {start}, past its {}-byte buffer",
                            bytes.len()
                        ))
                    })?;
                data.extend_from_slice(src);
            }
            if data.len() as u64 > <u32 as OffsetType>::MAX_OFFSET {
                return Err(BridgeError::OverflowError {
                    len: data.len() as u64,
                    max: <u32 as OffsetType>::MAX_OFFSET,
                });
            }
            offsets.push(data.len() as u32);
        }
        StringArray::from_parts(Buffer::from_vec64(offsets), Buffer::from_vec64(data), validity)
    }

    fn string<T: OffsetType>(&self) -> Result<StringArray<T>> {
        let offsets = self.offsets::<T>(1)?;
        let data_len = offsets.last().map_or(0, |o| o.as_usize());
        let data = Buffer::from_shared(self.required(2, data_len, "data")?)?;
        StringArray::from_parts(offsets, data, self.validity()?)
    }

    fn list<T: OffsetType>(&self, field: &Arc<Field>) -> Result<ListArray<T>> {
        let offsets = self.offsets::<T>(1)?;
        let values = NodeReader::new(self.child(0)?, &field.dtype, self.owner)?.read()?;
        let field = match field.materialised() {
            m if m == **field => Arc::clone(field),
            m => Arc::new(m),
        };
        ListArray::try_new(field, offsets, values, self.validity()?)
    }
}

/// Struct fields as imported, sharing the original when nothing changes.
fn materialised_fields(fields: &Arc<[Field]>) -> Arc<[Field]> {
    if fields.iter().all(|f| f.dtype.materialised() == f.dtype) {
        Arc::clone(fields)
    } else {
        fields.iter().map(Field::materialised).collect::<Vec<_>>().into()
    }
}

fn fold_child_errors(mut failures: Vec<(&str, BridgeError)>) -> BridgeError {
    if failures.len() == 1 {
        return failures.remove(0).1;
    }
    let detail: Vec<String> = failures.iter().map(|(name, e)| format!("'{name}': {e}")).collect();
    BridgeError::import(format!("{} columns failed to import: {}", failures.len(), detail.join("; ")))
}

fn expected_layout(dtype: &ArrowType) -> (i64, i64) {
    match dtype {
        ArrowType::Null => (0, 0),
        ArrowType::String | ArrowType::LargeString | ArrowType::Utf8View => (3, 0),
        ArrowType::Struct(fields) => (1, fields.len() as i64),
        ArrowType::List(_) | ArrowType::LargeList(_) => (2, 1),
        _ => (2, 0),
    }
}

/// Imports one node under a resolved type.
///
/// # Safety
/// `desc` must be a valid descriptor tree owned by `owner`.
unsafe fn import_node(desc: &ArrowArray, dtype: &ArrowType, owner: &Arc<ForeignArray>) -> Result<Array> {
    NodeReader::new(desc, dtype, owner)?.read()
}

/// Takes ownership of `array` and imports it as `dtype`.
///
/// On failure the descriptor is released before the error is returned.
///
/// # Safety
/// `array` must be a valid `ArrowArray` per the C Data Interface, whose buffers stay
/// valid and unmodified until its release callback runs.
pub unsafe fn import_array_typed(array: ArrowArray, dtype: &ArrowType) -> Result<Array> {
    if array.is_released() {
        return Err(BridgeError::import("ArrowArray has already been released"));
    }
    let owner = Arc::new(ForeignArray { array });
    let out = unsafe { import_node(&owner.array, dtype, &owner) }?;
    debug!(
        dtype = %dtype,
        len = owner.array.length,
        null_count = owner.array.null_count,
        n_children = owner.array.n_children,
        "imported array"
    );
    Ok(out)
}

/// Takes ownership of `array` and imports it under `schema`, which is only borrowed.
///
/// # Errors
/// - `SchemaError` / `UnsupportedType` when the schema cannot be read.
/// - `ImportError` / `SchemaError` when the array does not match its type.
///
/// In every case the array has been released by the time an error is returned.
///
/// # Safety
/// As [`import_array_typed`].
pub unsafe fn import_array(array: ArrowArray, schema: &ArrowSchema) -> Result<Array> {
    let field = match import_schema(schema) {
        Ok(f) => f,
        Err(e) => {
            let mut array = array;
            array.release();
            return Err(e);
        }
    };
    unsafe { import_array_typed(array, &field.dtype) }
}

/// Takes ownership of an `(ArrowArray, ArrowSchema)` pair and imports it as a column.
/// Both descriptors are released on every path, the schema straight away.
///
/// # Safety
/// As [`import_array_typed`].
pub unsafe fn import_field_array(array: ArrowArray, schema: ArrowSchema) -> Result<FieldArray> {
    let mut schema = schema;
    let field = import_schema(&schema);
    schema.release();
    let field = match field {
        Ok(f) => f,
        Err(e) => {
            let mut array = array;
            array.release();
            return Err(e);
        }
    };
    let array = unsafe { import_array_typed(array, &field.dtype) }?;
    Ok(FieldArray::new(field.materialised(), array))
}

/// Imports a record batch: a `+s` root whose children are the columns. The root name
/// becomes the table name and the root metadata the table metadata.
///
/// # Errors
/// `SchemaError` when the root is not a struct, `ImportError` when it has null rows.
///
/// # Safety
/// As [`import_array_typed`].
pub unsafe fn import_table(array: ArrowArray, schema: ArrowSchema) -> Result<Table> {
    let FieldArray { field, array, .. } = unsafe { import_field_array(array, schema) }?;
    let (name, schema) = Schema::from_root_field((*field).clone())?;
    match array {
        Array::StructArray(s) => Table::from_struct_array(name, &s, schema.metadata),
        other => Err(BridgeError::schema(format!(
            "record batch must be a struct array, found {}",
            other.arrow_type()
        ))),
    }
}

/// Takes ownership of boxed descriptors, as produced by
/// [`crate::ffi::export::export_to_c`], and imports them as a column.
///
/// # Safety
/// Both pointers must come from `Box::into_raw` and not be used again afterwards.
pub unsafe fn import_from_c_owned(array: *mut ArrowArray, schema: *mut ArrowSchema) -> Result<FieldArray> {
    let array = (!array.is_null()).then(|| unsafe { Box::from_raw(array) });
    let schema = (!schema.is_null()).then(|| unsafe { Box::from_raw(schema) });
    match (array, schema) {
        (Some(a), Some(s)) => unsafe { import_field_array(*a, *s) },
        (Some(mut a), None) => {
            a.release();
            Err(BridgeError::NullPointer("ArrowSchema"))
        }
        (None, Some(mut s)) => {
            s.release();
            Err(BridgeError::NullPointer("ArrowArray"))
        }
        (None, None) => Err(BridgeError::NullPointer("ArrowArray")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::export::{export_array, export_field_array};
    use crate::ffi::schema::export_schema;
    use crate::{NumericArray, Scalar};
    use std::ffi::c_void;

    fn roundtrip(arr: Array) -> Array {
        let dtype = arr.arrow_type();
        let c = export_array(&arr).unwrap();
        unsafe { import_array_typed(c, &dtype) }.unwrap()
    }

    #[test]
    fn integers_read_in_place() {
        let arr = Array::from_int32(IntegerArray::from_options(&[Some(1), None, Some(3)]));
        let back = roundtrip(arr.clone());
        assert_eq!(back.to_list(), arr.to_list());
        assert_eq!(back.null_count(), 1);
    }

    #[test]
    fn offset_is_honoured() {
        let arr = Array::from_int64(IntegerArray::from_slice(&[10, 20, 30, 40]));
        let mut c = export_array(&arr).unwrap();
        c.offset = 1;
        c.length = 2;
        let back = unsafe { import_array_typed(c, &ArrowType::Int64) }.unwrap();
        assert_eq!(back.to_list(), vec![Scalar::Int(20), Scalar::Int(30)]);
    }

    #[test]
    fn unknown_null_count_is_computed() {
        let arr = Array::from_string32(StringArray::from_options(&[Some("a"), None, None]));
        let mut c = export_array(&arr).unwrap();
        c.null_count = -1;
        let back = unsafe { import_array_typed(c, &ArrowType::String) }.unwrap();
        assert_eq!(back.null_count(), 2);
    }

    #[test]
    fn buffer_count_mismatch_releases() {
        let arr = Array::from_string32(StringArray::from_strs(&["x"]));
        let c = export_array(&arr).unwrap();
        let err = unsafe { import_array_typed(c, &ArrowType::Int32) }.unwrap_err();
        assert!(err.to_string().contains("requires 2 buffers"));
        if let Array::TextArray(crate::TextArray::String32(s)) = &arr {
            assert_eq!(s.data.shared().ref_count(), 1);
        }
    }

    #[test]
    fn null_count_out_of_range() {
        let arr = Array::from_int8(IntegerArray::from_slice(&[1, 2]));
        let mut c = export_array(&arr).unwrap();
        c.null_count = 3;
        let err = unsafe { import_array_typed(c, &ArrowType::Int8) }.unwrap_err();
        assert!(err.to_string().contains("outside -1..=2"));
    }

    #[test]
    fn nulls_without_bitmap_rejected() {
        let arr = Array::from_uint16(IntegerArray::from_slice(&[1, 2]));
        let mut c = export_array(&arr).unwrap();
        c.null_count = 1;
        assert!(matches!(
            unsafe { import_array_typed(c, &ArrowType::UInt16) },
            Err(BridgeError::ImportError(_))
        ));
    }

    #[test]
    fn field_array_pair() {
        let fa = FieldArray::from_arr("b", Array::from_bool(BooleanArray::from_options(&[Some(true), None])));
        let (a, s) = export_field_array(&fa).unwrap();
        let back = unsafe { import_field_array(a, s) }.unwrap();
        assert_eq!(back.field, fa.field);
        assert_eq!(back.array.to_list(), fa.array.to_list());
    }

    #[test]
    fn schema_failure_still_releases_array() {
        let arr = Array::from_int32(IntegerArray::from_slice(&[1]));
        let c = export_array(&arr).unwrap();
        let released = ArrowSchema::empty();
        assert!(unsafe { import_array(c, &released) }.is_err());
        if let Array::NumericArray(NumericArray::Int32(i)) = &arr {
            assert_eq!(i.data.shared().ref_count(), 1);
        }
        let mut s = export_schema(&ArrowType::Int32, "x", true).unwrap();
        s.release();
    }

    #[test]
    fn sliced_struct_children() {
        let s = StructArray::try_new(
            vec![
                Field::new("a", ArrowType::Int32, false, None),
                Field::new("b", ArrowType::String, true, None),
            ],
            vec![
                Array::from_int32(IntegerArray::from_slice(&[1, 2, 3])),
                Array::from_string32(StringArray::from_options(&[Some("x"), None, Some("z")])),
            ],
            None,
        )
        .unwrap();
        let arr = Array::from_struct(s);
        let mut c = export_array(&arr).unwrap();
        c.offset = 1;
        c.length = 2;
        let back = unsafe { import_array_typed(c, &arr.arrow_type()) }.unwrap();
        assert_eq!(back.to_list(), arr.slice(1, 2).to_list());
        assert_eq!(back.null_count(), 0);
    }

    #[test]
    fn oversized_length_is_an_error() {
        let arr = Array::from_int64(IntegerArray::from_slice(&[1, 2, 3]));
        let mut c = export_array(&arr).unwrap();
        c.length = i64::MAX / 4;
        let err = unsafe { import_array_typed(c, &ArrowType::Int64) }.unwrap_err();
        assert!(matches!(err, BridgeError::ImportError(_)));
        assert!(err.to_string().contains("overflows"), "{err}");
        if let Array::NumericArray(NumericArray::Int64(i)) = &arr {
            assert_eq!(i.data.shared().ref_count(), 1);
        }
    }

    #[test]
    fn oversized_offset_is_an_error() {
        let arr = Array::from_int64(IntegerArray::from_slice(&[1, 2, 3]));
        let mut c = export_array(&arr).unwrap();
        c.offset = i64::MAX;
        c.length = i64::MAX;
        let err = unsafe { import_array_typed(c, &ArrowType::Int64) }.unwrap_err();
        assert!(err.to_string().contains("overflows"), "{err}");
    }

    #[test]
    fn every_failing_struct_column_is_reported() {
        let s = StructArray::try_new(
            vec![
                Field::new("a", ArrowType::Int32, false, None),
                Field::new("b", ArrowType::Int32, false, None),
                Field::new("c", ArrowType::Int32, false, None),
            ],
            vec![
                Array::from_int32(IntegerArray::from_slice(&[1])),
                Array::from_int32(IntegerArray::from_slice(&[2])),
                Array::from_int32(IntegerArray::from_slice(&[3])),
            ],
            None,
        )
        .unwrap();
        let c = export_array(&Array::from_struct(s)).unwrap();
        // a and c declared as strings, which need three buffers
        let declared = ArrowType::Struct(
            vec![
                Field::new("a", ArrowType::String, false, None),
                Field::new("b", ArrowType::Int32, false, None),
                Field::new("c", ArrowType::String, false, None),
            ]
            .into(),
        );
        let err = unsafe { import_array_typed(c, &declared) }.unwrap_err().to_string();
        assert!(err.contains("2 columns failed"), "{err}");
        assert!(err.contains("'a'") && err.contains("'c'"), "{err}");
        assert!(!err.contains("'b'"), "{err}");
    }

    #[test]
    fn single_failing_struct_column_keeps_its_error() {
        let s = StructArray::try_new(
            vec![Field::new("a", ArrowType::Int32, false, None)],
            vec![Array::from_int32(IntegerArray::from_slice(&[1]))],
            None,
        )
        .unwrap();
        let c = export_array(&Array::from_struct(s)).unwrap();
        let declared = ArrowType::Struct(vec![Field::new("a", ArrowType::String, false, None)].into());
        let err = unsafe { import_array_typed(c, &declared) }.unwrap_err();
        assert!(err.to_string().contains("requires 3 buffers"), "{err}");
    }

    /// Heap storage behind a hand-built `Utf8View` descriptor.
    struct ViewStorage {
        _validity: Vec<u8>,
        _views: Vec<[u8; 16]>,
        _data: Vec<u8>,
        _sizes: Vec<i64>,
        buffers: Vec<*const c_void>,
    }

    unsafe extern "C" fn release_views(array: *mut ArrowArray) {
        unsafe {
            drop(Box::from_raw((*array).private_data as *mut ViewStorage));
            (*array).release = None;
        }
    }

    fn inline_view(s: &str) -> [u8; 16] {
        let mut v = [0u8; 16];
        v[..4].copy_from_slice(&(s.len() as i32).to_ne_bytes());
        v[4..4 + s.len()].copy_from_slice(s.as_bytes());
        v
    }

    fn referenced_view(s: &str, buffer: i32, at: i32) -> [u8; 16] {
        let mut v = [0u8; 16];
        v[..4].copy_from_slice(&(s.len() as i32).to_ne_bytes());
        v[4..8].copy_from_slice(&s.as_bytes()[..4]);
        v[8..12].copy_from_slice(&buffer.to_ne_bytes());
        v[12..16].copy_from_slice(&at.to_ne_bytes());
        v
    }

    const LONG: &str = "longer than twelve bytes";

    /// `["short", null, LONG, "tiny"]`, with `LONG` two bytes into the only data buffer.
    fn view_array(views: Vec<[u8; 16]>) -> ArrowArray {
        let validity = vec![0b1101u8];
        let data = [b"xx".as_slice(), LONG.as_bytes()].concat();
        let sizes = vec![data.len() as i64];
        let buffers = vec![
            validity.as_ptr() as *const c_void,
            views.as_ptr() as *const c_void,
            data.as_ptr() as *const c_void,
            sizes.as_ptr() as *const c_void,
        ];
        let mut storage = Box::new(ViewStorage {
            _validity: validity,
            _views: views,
            _data: data,
            _sizes: sizes,
            buffers,
        });
        let mut c = ArrowArray::empty();
        c.length = 4;
        c.null_count = 1;
        c.n_buffers = 4;
        c.buffers = storage.buffers.as_mut_ptr();
        c.private_data = Box::into_raw(storage) as *mut c_void;
        c.release = Some(release_views);
        c
    }

    fn sample_views() -> Vec<[u8; 16]> {
        vec![inline_view("short"), [0u8; 16], referenced_view(LONG, 0, 2), inline_view("tiny")]
    }

    #[test]
    fn string_views_are_copied_into_strings() {
        let c = view_array(sample_views());
        let back = unsafe { import_array_typed(c, &ArrowType::Utf8View) }.unwrap();
        assert_eq!(back.arrow_type(), ArrowType::String);
        assert_eq!(
            back.to_list(),
            vec![
                Scalar::String("short".into()),
                Scalar::Null,
                Scalar::String(LONG.into()),
                Scalar::String("tiny".into()),
            ]
        );
    }

    #[test]
    fn string_view_offset_is_honoured() {
        let mut c = view_array(sample_views());
        c.offset = 2;
        c.length = 2;
        c.null_count = 0;
        let back = unsafe { import_array_typed(c, &ArrowType::Utf8View) }.unwrap();
        assert_eq!(back.to_list(), vec![Scalar::String(LONG.into()), Scalar::String("tiny".into())]);
    }

    #[test]
    fn string_view_past_its_buffer_is_rejected() {
        let mut views = sample_views();
        views[2] = referenced_view(LONG, 0, 3);
        let err = unsafe { import_array_typed(view_array(views), &ArrowType::Utf8View) }.unwrap_err();
        assert!(err.to_string().contains("past its"), "{err}");

        let mut views = sample_views();
        views[2] = referenced_view(LONG, 1, 2);
        let err = unsafe { import_array_typed(view_array(views), &ArrowType::Utf8View) }.unwrap_err();
        assert!(err.to_string().contains("names buffer 1"), "{err}");
    }

    #[test]
    fn string_view_fields_materialise() {
        let field = Field::new("s", ArrowType::Utf8View, true, None);
        let schema = export_schema(&field.dtype, &field.name, true).unwrap();
        let fa = unsafe { import_field_array(view_array(sample_views()), schema) }.unwrap();
        assert_eq!(fa.field.dtype, ArrowType::String);
        assert_eq!(fa.array.len(), 4);
    }

    #[cfg(feature = "datetime")]
    #[test]
    fn intervals_read_in_place() {
        use crate::IntervalArray;
        for arr in [
            IntervalArray::from_months(&[Some(14), None, Some(-3)]),
            IntervalArray::from_days_ms(&[Some((1, 500)), None, Some((-2, 0))]),
            IntervalArray::from_month_day_nanos(&[Some((1, 2, -3)), None, Some((0, 0, i64::MAX))]),
        ] {
            let arr = Array::from_interval(arr);
            let back = roundtrip(arr.clone());
            assert_eq!(back.arrow_type(), arr.arrow_type());
            assert_eq!(back.to_list(), arr.to_list());
            assert_eq!(back.null_count(), 1);

            let mut c = export_array(&arr).unwrap();
            c.offset = 1;
            c.length = 2;
            let window = unsafe { import_array_typed(c, &arr.arrow_type()) }.unwrap();
            assert_eq!(window.to_list(), arr.slice(1, 2).to_list());
        }
    }
}
