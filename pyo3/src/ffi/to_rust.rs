//! # Python to colbridge Conversion
//!
//! Converts Arrow-compatible Python objects through the Arrow PyCapsule Interface.
//!
//! ## Import Strategy
//! Each import tries the capsule protocol first (`__arrow_c_array__` /
//! `__arrow_c_stream__`), falling back to PyArrow's `_export_to_c` pointer handshake for
//! objects that predate it.
//!
//! Descriptors are moved out of capsules, leaving released ones behind, so the capsule
//! destructors have nothing left to free.

use std::ffi::{CStr, c_void};

use colbridge::ffi::arrow_c_ffi::{ArrowArray, ArrowArrayStream, ArrowSchema};
use colbridge::ffi::capsule::{
    ARROW_ARRAY, ARROW_ARRAY_STREAM, ARROW_SCHEMA, Capsule, import_array_capsules,
};
use colbridge::ffi::import::import_from_c_owned;
use colbridge::ffi::stream::{
    import_super_array_stream, import_super_table_stream, import_table_stream,
};
use colbridge::{Array, FieldArray, SuperArray, SuperTable, Table};
use pyo3::ffi::Py_uintptr_t;
use pyo3::prelude::*;
use tracing::debug;

use crate::error::PyBridgeError;

/// Reads the payload pointer of a `PyCapsule` created under `name`.
pub(crate) fn capsule_pointer(capsule: &Bound<'_, PyAny>, name: &CStr) -> PyResult<*mut c_void> {
    let ptr = unsafe { pyo3::ffi::PyCapsule_GetPointer(capsule.as_ptr(), name.as_ptr()) };
    if ptr.is_null() {
        return Err(PyErr::take(capsule.py()).unwrap_or_else(|| {
            PyBridgeError::Protocol(format!("'{}' capsule holds a null pointer", name.to_string_lossy()))
                .into()
        }));
    }
    Ok(ptr)
}

/// Moves the descriptor out of a capsule, leaving `empty()` in its place.
///
/// # Safety
/// The capsule payload must be a `T`, as its name promises.
unsafe fn take_from_capsule<T>(capsule: &Bound<'_, PyAny>, name: &CStr, empty: fn() -> T) -> PyResult<T> {
    let ptr = capsule_pointer(capsule, name)? as *mut T;
    Ok(unsafe { std::ptr::replace(ptr, empty()) })
}

fn call_arrow_c_array(obj: &Bound<'_, PyAny>) -> PyResult<(Capsule, Capsule)> {
    let pair = obj.call_method1("__arrow_c_array__", (obj.py().None(),))?;
    let (schema, array): (Bound<'_, PyAny>, Bound<'_, PyAny>) = pair.extract().map_err(|_| {
        PyBridgeError::Protocol("__arrow_c_array__ must return a (schema, array) tuple".into())
    })?;
    let schema = Capsule::from_schema(unsafe { take_from_capsule(&schema, ARROW_SCHEMA, ArrowSchema::empty) }?);
    // A failure here drops `schema`, which releases it.
    let array = Capsule::from_array(unsafe { take_from_capsule(&array, ARROW_ARRAY, ArrowArray::empty) }?);
    Ok((schema, array))
}

fn call_arrow_c_stream(obj: &Bound<'_, PyAny>) -> PyResult<ArrowArrayStream> {
    let capsule = obj.call_method1("__arrow_c_stream__", (obj.py().None(),))?;
    unsafe { take_from_capsule(&capsule, ARROW_ARRAY_STREAM, ArrowArrayStream::empty) }
}

/// Legacy import through `obj._export_to_c(array_ptr, schema_ptr)`.
fn export_to_c_legacy(obj: &Bound<'_, PyAny>) -> PyResult<FieldArray> {
    let array_ptr = Box::into_raw(Box::new(ArrowArray::empty()));
    let schema_ptr = Box::into_raw(Box::new(ArrowSchema::empty()));
    let called = obj.call_method1(
        "_export_to_c",
        (array_ptr as Py_uintptr_t, schema_ptr as Py_uintptr_t),
    );
    if let Err(e) = called {
        let (mut array, mut schema) = unsafe { (Box::from_raw(array_ptr), Box::from_raw(schema_ptr)) };
        array.release();
        schema.release();
        return Err(e);
    }
    Ok(unsafe { import_from_c_owned(array_ptr, schema_ptr) }.map_err(PyBridgeError::from)?)
}

fn struct_to_table(fa: FieldArray) -> PyResult<Table> {
    let Array::StructArray(s) = &fa.array else {
        return Err(PyBridgeError::Protocol(format!(
            "expected a struct array for a record batch, found {}",
            fa.field.dtype
        ))
        .into());
    };
    Ok(Table::from_struct_array(fa.field.name.clone(), s, fa.field.metadata.clone())
        .map_err(PyBridgeError::from)?)
}

// Public import functions

/// Converts a `pa.Array`, or any object with `__arrow_c_array__`, to a column.
pub fn array_to_rust(obj: &Bound<'_, PyAny>) -> PyResult<FieldArray> {
    if obj.hasattr("__arrow_c_array__")? {
        let (schema, array) = call_arrow_c_array(obj)?;
        let fa = import_array_capsules(schema, array).map_err(PyBridgeError::from)?;
        debug!(field = %fa.field.name, dtype = %fa.field.dtype, len = fa.len(), "imported array capsules");
        return Ok(fa);
    }
    export_to_c_legacy(obj)
}

/// Converts a `pa.RecordBatch`, or any object exporting a struct array or a stream, to a
/// table.
pub fn record_batch_to_rust(obj: &Bound<'_, PyAny>) -> PyResult<Table> {
    if obj.hasattr("__arrow_c_array__")? {
        let (schema, array) = call_arrow_c_array(obj)?;
        return struct_to_table(import_array_capsules(schema, array).map_err(PyBridgeError::from)?);
    }
    if obj.hasattr("__arrow_c_stream__")? {
        let mut tables = import_table_stream(call_arrow_c_stream(obj)?).map_err(PyBridgeError::from)?;
        return match tables.len() {
            0 => Ok(Table::default()),
            1 => Ok(tables.remove(0)),
            n => Err(PyBridgeError::Protocol(format!(
                "expected one record batch, the stream held {n}"
            ))
            .into()),
        };
    }
    struct_to_table(export_to_c_legacy(obj)?)
}

/// Converts a `pa.Table`, or any object with `__arrow_c_stream__`, to a batched table.
pub fn table_to_rust(obj: &Bound<'_, PyAny>) -> PyResult<SuperTable> {
    if obj.hasattr("__arrow_c_stream__")? {
        let table = import_super_table_stream(call_arrow_c_stream(obj)?).map_err(PyBridgeError::from)?;
        debug!(name = %table.name, batches = table.n_batches(), rows = table.n_rows, "imported table stream");
        return Ok(table);
    }
    let batches: Vec<Bound<'_, PyAny>> = obj.call_method0("to_batches")?.extract()?;
    let tables = batches
        .iter()
        .map(record_batch_to_rust)
        .collect::<PyResult<Vec<_>>>()?;
    if tables.is_empty() {
        return Ok(SuperTable::default());
    }
    Ok(SuperTable::from_batches(tables).map_err(PyBridgeError::from)?)
}

/// Converts a `pa.ChunkedArray`, or any array stream, to a chunked array.
pub fn chunked_array_to_rust(obj: &Bound<'_, PyAny>) -> PyResult<SuperArray> {
    if obj.hasattr("__arrow_c_stream__")? {
        return Ok(import_super_array_stream(call_arrow_c_stream(obj)?).map_err(PyBridgeError::from)?);
    }
    let chunks: Vec<Bound<'_, PyAny>> = obj.getattr("chunks")?.extract()?;
    let chunks = chunks
        .iter()
        .map(array_to_rust)
        .collect::<PyResult<Vec<_>>>()?;
    Ok(SuperArray::from_field_array_chunks(chunks).map_err(PyBridgeError::from)?)
}
