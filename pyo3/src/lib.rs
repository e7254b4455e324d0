//! # colbridge-py - PyO3 Bindings for colbridge
//!
//! Python interchange for colbridge columns and tables over the Arrow PyCapsule
//! Interface.
//!
//! ## Features
//!
//! - **Zero-copy** buffers in both directions, via the Arrow C Data Interface.
//! - **Real capsules**: descriptors cross as `PyCapsule`s named `arrow_schema`,
//!   `arrow_array` and `arrow_array_stream`, whose destructors release anything left
//!   unconsumed.
//! - **Protocol objects**: [`PyArrayExport`] and [`PyStreamExport`] implement
//!   `__arrow_c_array__` and `__arrow_c_stream__`, single-use.
//! - **Transparent wrappers** ([`PyArray`], [`PyRecordBatch`], [`PyTable`],
//!   [`PyChunkedArray`]) for `#[pyfunction]` signatures.
//!
//! ## Type Mappings
//!
//! | colbridge | PyArrow | Wrapper |
//! |-----------|---------|---------|
//! | `FieldArray` | `pa.Array` | `PyArray` |
//! | `Table` | `pa.RecordBatch` | `PyRecordBatch` |
//! | `SuperTable` | `pa.Table` | `PyTable` |
//! | `SuperArray` | `pa.ChunkedArray` | `PyChunkedArray` |
//!
//! ## Example
//!
//! ```ignore
//! use colbridge_py::PyRecordBatch;
//! use pyo3::prelude::*;
//!
//! #[pyfunction]
//! fn process_batch(input: PyRecordBatch) -> PyResult<PyRecordBatch> {
//!     let table: colbridge::Table = input.into();
//!     Ok(PyRecordBatch::from(table))
//! }
//! ```
//!
//! In Python:
//! ```python
//! import pyarrow as pa
//! import colbridge_py
//!
//! batch = pa.RecordBatch.from_pydict({"a": [1, 2, 3]})
//! reader = pa.RecordBatchReader.from_stream(colbridge_py.export_batch_stream(batch))
//! ```

use colbridge::{Array, ArrowType, Field, FieldArray, FloatArray, IntegerArray, StringArray, Table};
use pyo3::prelude::*;

pub mod error;
pub mod ffi;
pub mod types;


pub use error::{PyBridgeError, PyBridgeResult};
pub use ffi::to_py::{PyArrayExport, PyStreamExport, capsule_to_py};
pub use types::{PyArray, PyChunkedArray, PyRecordBatch, PyTable};

/// Returns the array after a round trip through colbridge.
#[pyfunction]
fn echo_array(arr: PyArray) -> PyResult<PyArray> {
    Ok(arr)
}

/// Returns the record batch after a round trip through colbridge.
#[pyfunction]
fn echo_batch(batch: PyRecordBatch) -> PyResult<PyRecordBatch> {
    Ok(batch)
}

/// Returns the table after a round trip through colbridge.
#[pyfunction]
fn echo_table(table: PyTable) -> PyResult<PyTable> {
    Ok(table)
}

/// Returns the chunked array after a round trip through colbridge.
#[pyfunction]
fn echo_chunked(arr: PyChunkedArray) -> PyResult<PyChunkedArray> {
    Ok(arr)
}

#[pyfunction]
fn array_info(arr: PyArray) -> String {
    let fa = arr.field_array();
    format!(
        "colbridge FieldArray: name={}, type={}, len={}, null_count={}",
        fa.field.name,
        fa.field.dtype,
        fa.len(),
        fa.null_count
    )
}

#[pyfunction]
fn table_info(table: PyTable) -> String {
    let inner = table.inner();
    format!(
        "colbridge SuperTable: batches={}, rows={}, cols={}",
        inner.n_batches(),
        inner.n_rows,
        inner.n_cols()
    )
}

/// Wraps an array in a single-use `__arrow_c_array__` object.
#[pyfunction]
fn export_array(arr: PyArray) -> PyArrayExport {
    PyArrayExport::new(arr.into_inner())
}

/// Wraps a record batch in a single-use `__arrow_c_stream__` object of one batch.
#[pyfunction]
fn export_batch_stream(batch: PyRecordBatch) -> PyStreamExport {
    PyStreamExport::new(batch.into_inner())
}

/// Wraps a table in a single-use `__arrow_c_stream__` object, one struct per batch.
#[pyfunction]
fn export_table_stream(table: PyTable) -> PyStreamExport {
    PyStreamExport::new(table.into_inner())
}

/// Wraps a chunked array in a single-use `__arrow_c_stream__` object, one array per
/// chunk.
#[pyfunction]
fn export_chunked_stream(arr: PyChunkedArray) -> PyStreamExport {
    PyStreamExport::new(arr.into_inner())
}

/// Builds a batch entirely in Rust: `id` int64, `score` float64, `label` utf8.
#[pyfunction]
fn generate_sample_batch() -> PyResult<PyStreamExport> {
    let ids: Vec<i64> = (1..=5).collect();
    let scores: Vec<f64> = ids.iter().map(|i| *i as f64 * 1.1).collect();
    let labels: Vec<String> = ids.iter().map(|i| format!("item_{i}")).collect();
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

    let table = Table::try_new(
        "sample",
        vec![
            FieldArray::new(
                Field::new("id", ArrowType::Int64, false, None),
                Array::from_int64(IntegerArray::from_slice(&ids)),
            ),
            FieldArray::new(
                Field::new("score", ArrowType::Float64, false, None),
                Array::from_float64(FloatArray::from_slice(&scores)),
            ),
            FieldArray::new(
                Field::new("label", ArrowType::String, false, None),
                Array::from_string32(StringArray::from_strs(&labels)),
            ),
        ],
    )
    .map_err(PyBridgeError::from)?;
    Ok(PyStreamExport::new(table))
}

/// Builds a nullable int64 array in Rust: `[10, null, 30, null, 50]`.
#[pyfunction]
fn generate_nullable_array() -> PyArrayExport {
    let values = IntegerArray::from_options(&[Some(10i64), None, Some(30), None, Some(50)]);
    let field = Field::new("values", ArrowType::Int64, true, None);
    PyArrayExport::new(FieldArray::new(field, Array::from_int64(values)))
}

#[pymodule]
fn colbridge_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__doc__", "Arrow PyCapsule interchange for colbridge")?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    m.add_function(wrap_pyfunction!(echo_array, m)?)?;
    m.add_function(wrap_pyfunction!(echo_batch, m)?)?;
    m.add_function(wrap_pyfunction!(echo_table, m)?)?;
    m.add_function(wrap_pyfunction!(echo_chunked, m)?)?;
    m.add_function(wrap_pyfunction!(array_info, m)?)?;
    m.add_function(wrap_pyfunction!(table_info, m)?)?;

    m.add_function(wrap_pyfunction!(export_array, m)?)?;
    m.add_function(wrap_pyfunction!(export_batch_stream, m)?)?;
    m.add_function(wrap_pyfunction!(export_table_stream, m)?)?;
    m.add_function(wrap_pyfunction!(export_chunked_stream, m)?)?;

    m.add_class::<PyArrayExport>()?;
    m.add_class::<PyStreamExport>()?;

    m.add_function(wrap_pyfunction!(generate_sample_batch, m)?)?;
    m.add_function(wrap_pyfunction!(generate_nullable_array, m)?)?;
    Ok(())
}
