//! # FFI Module for colbridge-py
//!
//! Moves Arrow C descriptors between Rust and Python.
//!
//! ## Capsules
//!
//! Every descriptor crosses as a `PyCapsule` named `arrow_schema`, `arrow_array` or
//! `arrow_array_stream`. The capsule holds a heap-allocated descriptor:
//!
//! - A consumer moves the descriptor out and leaves a released one behind.
//! - The capsule destructor releases whatever is still live, so a capsule dropped
//!   unconsumed by Python frees its data exactly once.
//!
//! ## Container Type Mappings
//!
//! | colbridge | PyArrow | Wrapper | Protocol |
//! |-----------|---------|---------|----------|
//! | `FieldArray` | `pa.Array` | [`PyArray`] | `__arrow_c_array__`, legacy `_export_to_c` |
//! | `Table` | `pa.RecordBatch` | [`PyRecordBatch`] | `__arrow_c_array__` (struct) |
//! | `SuperTable` | `pa.Table` | [`PyTable`] | `__arrow_c_stream__` (one struct per batch) |
//! | `SuperArray` | `pa.ChunkedArray` | [`PyChunkedArray`] | `__arrow_c_stream__` (one array per chunk) |
//!
//! [`PyArray`]: crate::types::PyArray
//! [`PyRecordBatch`]: crate::types::PyRecordBatch
//! [`PyTable`]: crate::types::PyTable
//! [`PyChunkedArray`]: crate::types::PyChunkedArray
//!
//! ## Modules
//!
//! - [`to_py`] - export, and the capsule-producing Python classes
//! - [`to_rust`] - import

pub mod to_py;
pub mod to_rust;
