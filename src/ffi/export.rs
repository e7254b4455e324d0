//! # **Export Module** - *Array -> ArrowArray, without copying payloads*
//!
//! Fills `ArrowArray` descriptors whose buffer pointers reference the array's own
//! storage.
//!
//! ## Ownership
//! Each descriptor's private data holds a clone of the exported `Array`. That clone only
//! bumps the reference counts of the underlying `SharedBuffer`s, so the source array can
//! be dropped straight after export and the buffers stay alive until the consumer calls
//! `release`. Release then frees children and the dictionary recursively and drops the
//! clone, freeing each buffer once its count reaches zero.
//!
//! ## Buffer layouts
//! | Array            | Buffers                       | Children / dictionary |
//! |------------------|-------------------------------|-----------------------|
//! | Null             | none                          |                       |
//! | Numeric/temporal | validity, values              |                       |
//! | Boolean          | validity, value bits          |                       |
//! | String           | validity, offsets, data       |                       |
//! | Dictionary       | validity, keys                | dictionary = values   |
//! | Struct           | validity                      | one child per field   |
//! | List             | validity, offsets             | one child             |
//!
//! Validation runs over the whole tree before any descriptor is built, so building
//! itself cannot fail and never leaves a half-exported tree behind.

use std::ffi::c_void;
use std::ptr;

use tracing::{debug, trace};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema};
use crate::ffi::schema::export_field;
use crate::structs::field::nulls_allowed;
use crate::traits::type_unions::OffsetType;
use crate::{Array, Bitmask, Field, FieldArray, Table, TextArray};

/// Everything an exported `ArrowArray` points into.
struct ArrayPrivateData {
    _array: Array,
    _bitmaps: Vec<Bitmask>,
    buffers: Box<[*const c_void]>,
    children: Box<[*mut ArrowArray]>,
    dictionary: *mut ArrowArray,
}

/// Checks everything that could make an export fail, over the whole tree.
fn check_exportable(array: &Array) -> Result<()> {
    match array {
        Array::TextArray(TextArray::String32(a)) => check_offsets::<u32>(a.offset_bounds().1),
        Array::CategoricalArray(a) => check_exportable(&a.values),
        #[cfg(feature = "datetime")]
        Array::TemporalArray(a) => crate::ffi::format::encode_type(&a.arrow_type()).map(|_| ()),
        Array::StructArray(a) => {
            for (field, child) in a.fields.iter().zip(&a.children) {
                check_nullability(field, child)?;
                check_exportable(child)?;
            }
            Ok(())
        }
        Array::ListArray(a) => {
            check_offsets::<u32>(a.offsets.as_slice().last().copied().unwrap_or(0))?;
            check_nullability(&a.field, &a.values)?;
            check_exportable(&a.values)
        }
        Array::LargeListArray(a) => {
            check_nullability(&a.field, &a.values)?;
            check_exportable(&a.values)
        }
        _ => Ok(()),
    }
}

fn check_offsets<T: OffsetType>(last: T) -> Result<()> {
    let last = last.as_usize() as u64;
    if last > T::MAX_OFFSET {
        return Err(BridgeError::OverflowError {
            len: last,
            max: T::MAX_OFFSET,
        });
    }
    Ok(())
}

fn check_nullability(field: &Field, array: &Array) -> Result<()> {
    if nulls_allowed(field, array) {
        Ok(())
    } else {
        Err(BridgeError::schema(format!(
            "field '{}' is not nullable but holds {} nulls",
            field.name,
            array.null_count()
        )))
    }
}

/// Pointer to a bitmap whose first bit is the first logical element. Bitmaps sliced at
/// an odd bit position are re-packed and kept alive in `bitmaps`.
fn validity(mask: Option<&Bitmask>, bitmaps: &mut Vec<Bitmask>) -> *const c_void {
    match mask {
        Some(m) => {
            let aligned = m.to_aligned();
            let p = aligned.bytes().as_ptr() as *const c_void;
            bitmaps.push(aligned);
            p
        }
        None => ptr::null(),
    }
}

/// Builds the descriptor tree. Infallible once `check_exportable` has passed.
fn export_node(array: &Array) -> ArrowArray {
    let mut bitmaps: Vec<Bitmask> = Vec::new();
    let mut children: Vec<*mut ArrowArray> = Vec::new();
    let mut dictionary: *mut ArrowArray = ptr::null_mut();

    let buffers: Vec<*const c_void> = match array {
        Array::Null(_) => Vec::new(),
        Array::NumericArray(a) => vec![validity(a.null_mask(), &mut bitmaps), a.values_ptr().cast()],
        Array::BooleanArray(a) => {
            let v = validity(a.null_mask.as_ref(), &mut bitmaps);
            let bits = validity(Some(&a.data), &mut bitmaps);
            vec![v, bits]
        }
        Array::TextArray(TextArray::String32(a)) => vec![
            validity(a.null_mask.as_ref(), &mut bitmaps),
            a.offsets.as_ptr().cast(),
            a.data.as_ptr().cast(),
        ],
        Array::TextArray(TextArray::String64(a)) => vec![
            validity(a.null_mask.as_ref(), &mut bitmaps),
            a.offsets.as_ptr().cast(),
            a.data.as_ptr().cast(),
        ],
        Array::CategoricalArray(a) => {
            dictionary = Box::into_raw(Box::new(export_node(&a.values)));
            vec![validity(a.null_mask(), &mut bitmaps), a.keys.values_ptr().cast()]
        }
        #[cfg(feature = "datetime")]
        Array::TemporalArray(a) => vec![validity(a.null_mask(), &mut bitmaps), a.values_ptr().cast()],
        Array::StructArray(a) => {
            children.extend(a.children.iter().map(|c| Box::into_raw(Box::new(export_node(c)))));
            vec![validity(a.null_mask.as_ref(), &mut bitmaps)]
        }
        Array::ListArray(a) => {
            children.push(Box::into_raw(Box::new(export_node(&a.values))));
            vec![validity(a.null_mask.as_ref(), &mut bitmaps), a.offsets.as_ptr().cast()]
        }
        Array::LargeListArray(a) => {
            children.push(Box::into_raw(Box::new(export_node(&a.values))));
            vec![validity(a.null_mask.as_ref(), &mut bitmaps), a.offsets.as_ptr().cast()]
        }
    };

    let n_buffers = buffers.len() as i64;
    let n_children = children.len() as i64;
    let mut private = Box::new(ArrayPrivateData {
        _array: array.clone(),
        _bitmaps: bitmaps,
        buffers: buffers.into_boxed_slice(),
        children: children.into_boxed_slice(),
        dictionary,
    });
    ArrowArray {
        length: array.len() as i64,
        null_count: array.null_count() as i64,
        offset: 0,
        n_buffers,
        n_children,
        buffers: private.buffers.as_mut_ptr(),
        children: if n_children == 0 {
            ptr::null_mut()
        } else {
            private.children.as_mut_ptr()
        },
        dictionary,
        release: Some(release_array),
        private_data: Box::into_raw(private).cast(),
    }
}

unsafe extern "C" fn release_array(array: *mut ArrowArray) {
    if array.is_null() {
        return;
    }
    let array = unsafe { &mut *array };
    if array.release.is_none() || array.private_data.is_null() {
        return;
    }
    let private = unsafe { Box::from_raw(array.private_data as *mut ArrayPrivateData) };
    for &child in private.children.iter() {
        let mut child = unsafe { Box::from_raw(child) };
        child.release();
    }
    if !private.dictionary.is_null() {
        let mut dict = unsafe { Box::from_raw(private.dictionary) };
        dict.release();
    }
    drop(private);
    trace!(len = array.length, "released exported ArrowArray");
    array.private_data = ptr::null_mut();
    array.release = None;
}

/// Exports an array as an `ArrowArray`.
///
/// # Errors
/// - `OverflowError` when a 32-bit offset array's last offset exceeds `i32::MAX`.
/// - `SchemaError` when a non-nullable nested field holds nulls.
/// - `UnsupportedType` for a temporal array whose unit has no encoding.
pub fn export_array(array: &Array) -> Result<ArrowArray> {
    check_exportable(array)?;
    let out = export_node(array);
    debug!(
        dtype = %array.arrow_type(),
        len = out.length,
        null_count = out.null_count,
        n_children = out.n_children,
        "exporting array"
    );
    Ok(out)
}

/// Exports a column as an `(ArrowArray, ArrowSchema)` pair.
///
/// # Errors
/// `SchemaError` when the field's type differs from the array's, or a non-nullable
/// field holds nulls, plus anything [`export_array`] rejects.
pub fn export_field_array(fa: &FieldArray) -> Result<(ArrowArray, ArrowSchema)> {
    let actual = fa.array.arrow_type();
    if actual != fa.field.dtype {
        return Err(BridgeError::schema(format!(
            "field '{}' declares {} but the array is {actual}",
            fa.field.name, fa.field.dtype
        )));
    }
    check_nullability(&fa.field, &fa.array)?;
    export_pair(&fa.array, &fa.field)
}

/// Exports a table as one record batch: a non-nullable `+s` array whose children are
/// the columns, with the table name and metadata on the root schema.
pub fn export_table(table: &Table) -> Result<(ArrowArray, ArrowSchema)> {
    for c in &table.cols {
        let actual = c.array.arrow_type();
        if actual != c.field.dtype {
            return Err(BridgeError::schema(format!(
                "column '{}' declares {} but the array is {actual}",
                c.field.name, c.field.dtype
            )));
        }
    }
    let batch = Array::from_struct(table.to_struct_array()?);
    let root = table.schema().root_field(table.name.clone());
    export_pair(&batch, &root)
}

fn export_pair(array: &Array, field: &Field) -> Result<(ArrowArray, ArrowSchema)> {
    let schema = export_field(field)?;
    match export_array(array) {
        Ok(a) => Ok((a, schema)),
        Err(e) => {
            let mut schema = schema;
            schema.release();
            Err(e)
        }
    }
}

/// Exports a column to heap-allocated descriptors, for consumers that exchange raw
/// pointers. Free them with the release callbacks, then reclaim the boxes, or hand them
/// to [`crate::ffi::import::import_from_c_owned`].
pub fn export_to_c(fa: &FieldArray) -> Result<(*mut ArrowArray, *mut ArrowSchema)> {
    let (array, schema) = export_field_array(fa)?;
    Ok((Box::into_raw(Box::new(array)), Box::into_raw(Box::new(schema))))
}
