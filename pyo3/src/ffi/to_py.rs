//! # colbridge to Python Conversion
//!
//! Wraps exported descriptors in `PyCapsule`s, and hands columns and tables to PyArrow.

use std::ffi::CStr;
use std::sync::Mutex;

use colbridge::ffi::arrow_c_ffi::{ArrowArray, ArrowArrayStream, ArrowSchema};
use colbridge::ffi::capsule::{
    ARROW_ARRAY, ARROW_ARRAY_STREAM, ARROW_SCHEMA, ArrayHandle, ArrowCArray, ArrowCStream,
    Capsule, StreamHandle,
};
use colbridge::ffi::export::export_to_c;
use colbridge::{FieldArray, SuperArray, SuperTable, Table};
use pyo3::exceptions::PyRuntimeError;
use pyo3::ffi::{self as pyffi, Py_uintptr_t};
use pyo3::prelude::*;
use tracing::trace;

use crate::error::PyBridgeError;
use crate::ffi::to_rust::capsule_pointer;

// Capsule destructors

/// Releases a payload that no consumer moved out, then frees its box.
unsafe fn drop_payload<T>(capsule: *mut pyffi::PyObject, name: &CStr, release: fn(&mut T)) {
    let ptr = unsafe { pyffi::PyCapsule_GetPointer(capsule, name.as_ptr()) } as *mut T;
    if ptr.is_null() {
        // A destructor must not leave an exception set.
        unsafe { pyffi::PyErr_Clear() };
        return;
    }
    let mut payload = unsafe { Box::from_raw(ptr) };
    release(&mut payload);
    trace!(name = ?name, "capsule destructor ran");
}

unsafe extern "C" fn drop_schema_capsule(capsule: *mut pyffi::PyObject) {
    unsafe { drop_payload::<ArrowSchema>(capsule, ARROW_SCHEMA, ArrowSchema::release) }
}

unsafe extern "C" fn drop_array_capsule(capsule: *mut pyffi::PyObject) {
    unsafe { drop_payload::<ArrowArray>(capsule, ARROW_ARRAY, ArrowArray::release) }
}

unsafe extern "C" fn drop_stream_capsule(capsule: *mut pyffi::PyObject) {
    unsafe { drop_payload::<ArrowArrayStream>(capsule, ARROW_ARRAY_STREAM, ArrowArrayStream::release) }
}

/// Turns a [`Capsule`] into a Python `PyCapsule` under the same name.
///
/// Ownership of the descriptor passes to the Python object. Its destructor releases the
/// descriptor unless a consumer has moved it out.
pub fn capsule_to_py(py: Python<'_>, capsule: Capsule) -> PyResult<PyObject> {
    let (name, ptr) = capsule.into_raw().map_err(PyBridgeError::from)?;
    let destructor: pyffi::PyCapsule_Destructor = if name == ARROW_SCHEMA {
        drop_schema_capsule
    } else if name == ARROW_ARRAY {
        drop_array_capsule
    } else {
        drop_stream_capsule
    };
    let raw = unsafe { pyffi::PyCapsule_New(ptr, name.as_ptr(), Some(destructor)) };
    if raw.is_null() {
        // Take the payload back so it is released here.
        drop(unsafe { Capsule::from_raw(name, ptr) });
        return Err(PyErr::fetch(py));
    }
    Ok(unsafe { Bound::from_owned_ptr(py, raw) }.unbind())
}

/// A bitwise copy of a schema still owned by a Python capsule.
///
/// Dropping it, on return or while unwinding, empties the wrapper without calling
/// `release`.
struct BorrowedSchema(Capsule);

impl Drop for BorrowedSchema {
    fn drop(&mut self) {
        let _ = self.0.take_schema();
    }
}

/// Runs `f` with the requested schema capsule viewed as a [`Capsule`], without taking
/// ownership from Python.
pub(crate) fn with_requested<R>(
    requested: Option<&Bound<'_, PyAny>>,
    f: impl FnOnce(Option<&Capsule>) -> R,
) -> PyResult<R> {
    let Some(obj) = requested.filter(|o| !o.is_none()) else {
        return Ok(f(None));
    };
    let ptr = capsule_pointer(obj, ARROW_SCHEMA)? as *const ArrowSchema;
    let view = BorrowedSchema(Capsule::from_schema(unsafe { std::ptr::read(ptr) }));
    Ok(f(Some(&view.0)))
}

// PyCapsule protocol objects

/// Python-visible single-use object implementing `__arrow_c_array__`.
///
/// Any Arrow-compatible Python library can consume it directly, e.g. `pa.array(obj)`
/// or `pa.record_batch(obj)`.
#[pyclass(name = "ArrowArrayExport")]
pub struct PyArrayExport {
    handle: Mutex<ArrayHandle>,
}

impl PyArrayExport {
    pub fn new(source: impl ArrowCArray + Send + 'static) -> Self {
        Self {
            handle: Mutex::new(ArrayHandle::new(source)),
        }
    }
}

#[pymethods]
impl PyArrayExport {
    /// Returns `(schema_capsule, array_capsule)`. A second call raises `ValueError`.
    #[pyo3(signature = (requested_schema=None))]
    fn __arrow_c_array__(
        &self,
        py: Python<'_>,
        requested_schema: Option<Bound<'_, PyAny>>,
    ) -> PyResult<(PyObject, PyObject)> {
        let mut handle = self
            .handle
            .lock()
            .map_err(|_| PyRuntimeError::new_err("ArrowArrayExport lock poisoned"))?;
        let (schema, array) = with_requested(requested_schema.as_ref(), |req| {
            handle.arrow_c_array(req)
        })?
        .map_err(PyBridgeError::from)?;
        let schema = capsule_to_py(py, schema)?;
        Ok((schema, capsule_to_py(py, array)?))
    }

    fn is_consumed(&self) -> PyResult<bool> {
        let handle = self
            .handle
            .lock()
            .map_err(|_| PyRuntimeError::new_err("ArrowArrayExport lock poisoned"))?;
        Ok(handle.is_consumed())
    }
}

/// Python-visible single-use object implementing `__arrow_c_stream__`.
///
/// Consumable by e.g. `pa.table(obj)`, `pa.RecordBatchReader.from_stream(obj)` or
/// `pa.chunked_array(obj)`.
#[pyclass(name = "ArrowStreamExport")]
pub struct PyStreamExport {
    handle: Mutex<StreamHandle>,
}

impl PyStreamExport {
    pub fn new(source: impl ArrowCStream + Send + 'static) -> Self {
        Self {
            handle: Mutex::new(StreamHandle::new(source)),
        }
    }
}

#[pymethods]
impl PyStreamExport {
    /// Returns the `arrow_array_stream` capsule. A second call raises `ValueError`.
    #[pyo3(signature = (requested_schema=None))]
    fn __arrow_c_stream__(
        &self,
        py: Python<'_>,
        requested_schema: Option<Bound<'_, PyAny>>,
    ) -> PyResult<PyObject> {
        let mut handle = self
            .handle
            .lock()
            .map_err(|_| PyRuntimeError::new_err("ArrowStreamExport lock poisoned"))?;
        let capsule = with_requested(requested_schema.as_ref(), |req| handle.arrow_c_stream(req))?
            .map_err(PyBridgeError::from)?;
        capsule_to_py(py, capsule)
    }

    fn is_consumed(&self) -> PyResult<bool> {
        let handle = self
            .handle
            .lock()
            .map_err(|_| PyRuntimeError::new_err("ArrowStreamExport lock poisoned"))?;
        Ok(handle.is_consumed())
    }
}

// PyArrow constructors

/// Converts a column to a `pa.Array` through the legacy `_import_from_c` handshake.
pub fn array_to_py<'py>(fa: &FieldArray, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
    let pyarrow = py.import("pyarrow")?;
    let (array_ptr, schema_ptr) = export_to_c(fa).map_err(PyBridgeError::from)?;
    let result = pyarrow.getattr("Array").and_then(|cls| {
        cls.call_method1(
            "_import_from_c",
            (array_ptr as Py_uintptr_t, schema_ptr as Py_uintptr_t),
        )
    });
    // PyArrow moves the descriptors out on success. Whatever is left is still ours.
    let (mut array, mut schema) = unsafe { (Box::from_raw(array_ptr), Box::from_raw(schema_ptr)) };
    array.release();
    schema.release();
    result
}

/// Converts a table to a `pa.RecordBatch`.
pub fn table_to_py<'py>(table: &Table, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
    let pyarrow = py.import("pyarrow")?;
    let export = Bound::new(py, PyArrayExport::new(table.clone()))?;
    pyarrow.call_method1("record_batch", (export,))
}

/// Converts a batched table to a `pa.Table`.
pub fn super_table_to_py<'py>(table: &SuperTable, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
    let pyarrow = py.import("pyarrow")?;
    let export = Bound::new(py, PyStreamExport::new(table.clone()))?;
    pyarrow.call_method1("table", (export,))
}

/// Converts a chunked array to a `pa.ChunkedArray`.
pub fn super_array_to_py<'py>(array: &SuperArray, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
    let pyarrow = py.import("pyarrow")?;
    let export = Bound::new(py, PyStreamExport::new(array.clone()))?;
    pyarrow.call_method1("chunked_array", (export,))
}
