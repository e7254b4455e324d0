//! # Type Wrappers for colbridge-py
//!
//! Transparent wrappers that convert to and from Python objects when used as
//! `#[pyfunction]` arguments or return values.

use colbridge::{Array, Field, FieldArray, SuperArray, SuperTable, Table};
use pyo3::prelude::*;

use crate::ffi::{to_py, to_rust};

// PyArray

/// Transparent wrapper around a `FieldArray`, exchanged as a `pa.Array`.
///
/// The field travels with the data, so logical types such as `Timestamp` vs `Int64`
/// survive the crossing.
///
/// ```ignore
/// use colbridge_py::PyArray;
///
/// #[pyfunction]
/// fn passthrough(arr: PyArray) -> PyResult<PyArray> {
///     let column = arr.into_inner();
///     Ok(PyArray::from(column))
/// }
/// ```
#[repr(transparent)]
#[derive(Debug, Clone)]
pub struct PyArray(pub FieldArray);

impl PyArray {
    pub fn new(field_array: FieldArray) -> Self {
        Self(field_array)
    }

    pub fn inner(&self) -> &Array {
        &self.0.array
    }

    pub fn field_array(&self) -> &FieldArray {
        &self.0
    }

    pub fn field(&self) -> &Field {
        &self.0.field
    }

    pub fn into_inner(self) -> FieldArray {
        self.0
    }
}

impl From<FieldArray> for PyArray {
    fn from(field_array: FieldArray) -> Self {
        Self(field_array)
    }
}

impl From<Array> for PyArray {
    fn from(array: Array) -> Self {
        Self(FieldArray::from_arr("", array))
    }
}

impl From<PyArray> for FieldArray {
    fn from(value: PyArray) -> Self {
        value.0
    }
}

impl<'py> FromPyObject<'py> for PyArray {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        to_rust::array_to_rust(ob).map(PyArray)
    }
}

impl<'py> IntoPyObject<'py> for PyArray {
    type Target = PyAny;
    type Output = Bound<'py, Self::Target>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        to_py::array_to_py(&self.0, py)
    }
}

// PyRecordBatch

/// Transparent wrapper around a `Table`, exchanged as a `pa.RecordBatch`.
#[repr(transparent)]
#[derive(Debug, Clone)]
pub struct PyRecordBatch(pub Table);

impl PyRecordBatch {
    pub fn new(table: Table) -> Self {
        Self(table)
    }

    pub fn inner(&self) -> &Table {
        &self.0
    }

    pub fn into_inner(self) -> Table {
        self.0
    }
}

impl From<Table> for PyRecordBatch {
    fn from(table: Table) -> Self {
        Self(table)
    }
}

impl From<PyRecordBatch> for Table {
    fn from(value: PyRecordBatch) -> Self {
        value.0
    }
}

impl<'py> FromPyObject<'py> for PyRecordBatch {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        to_rust::record_batch_to_rust(ob).map(PyRecordBatch)
    }
}

impl<'py> IntoPyObject<'py> for PyRecordBatch {
    type Target = PyAny;
    type Output = Bound<'py, Self::Target>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        to_py::table_to_py(&self.0, py)
    }
}

// PyTable

/// Transparent wrapper around a `SuperTable`, exchanged as a `pa.Table`.
#[repr(transparent)]
#[derive(Debug, Clone)]
pub struct PyTable(pub SuperTable);

impl PyTable {
    pub fn new(table: SuperTable) -> Self {
        Self(table)
    }

    pub fn inner(&self) -> &SuperTable {
        &self.0
    }

    pub fn into_inner(self) -> SuperTable {
        self.0
    }
}

impl From<SuperTable> for PyTable {
    fn from(table: SuperTable) -> Self {
        Self(table)
    }
}

impl From<PyTable> for SuperTable {
    fn from(value: PyTable) -> Self {
        value.0
    }
}

impl<'py> FromPyObject<'py> for PyTable {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        to_rust::table_to_rust(ob).map(PyTable)
    }
}

impl<'py> IntoPyObject<'py> for PyTable {
    type Target = PyAny;
    type Output = Bound<'py, Self::Target>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        to_py::super_table_to_py(&self.0, py)
    }
}

// PyChunkedArray

/// Transparent wrapper around a `SuperArray`, exchanged as a `pa.ChunkedArray`.
#[repr(transparent)]
#[derive(Debug, Clone)]
pub struct PyChunkedArray(pub SuperArray);

impl PyChunkedArray {
    pub fn new(array: SuperArray) -> Self {
        Self(array)
    }

    pub fn inner(&self) -> &SuperArray {
        &self.0
    }

    pub fn into_inner(self) -> SuperArray {
        self.0
    }
}

impl From<SuperArray> for PyChunkedArray {
    fn from(array: SuperArray) -> Self {
        Self(array)
    }
}

impl From<PyChunkedArray> for SuperArray {
    fn from(value: PyChunkedArray) -> Self {
        value.0
    }
}

impl<'py> FromPyObject<'py> for PyChunkedArray {
    fn extract_bound(ob: &Bound<'py, PyAny>) -> PyResult<Self> {
        to_rust::chunked_array_to_rust(ob).map(PyChunkedArray)
    }
}

impl<'py> IntoPyObject<'py> for PyChunkedArray {
    type Target = PyAny;
    type Output = Bound<'py, Self::Target>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        to_py::super_array_to_py(&self.0, py)
    }
}
