//! # Error Module for colbridge-py
//!
//! Maps bridge errors onto Python exceptions.

use colbridge::BridgeError;
use pyo3::exceptions::{PyOverflowError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use thiserror::Error;

/// Error type for colbridge-py operations.
#[derive(Error, Debug)]
pub enum PyBridgeError {
    /// Error from the bridge itself.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A Python object that does not honour the capsule protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<PyBridgeError> for PyErr {
    fn from(err: PyBridgeError) -> PyErr {
        match err {
            PyBridgeError::Protocol(msg) => PyTypeError::new_err(msg),
            PyBridgeError::Bridge(e) => match e {
                BridgeError::UnsupportedType { .. } | BridgeError::SchemaError(_) => {
                    PyTypeError::new_err(e.to_string())
                }
                BridgeError::CapsuleConsumed { .. } | BridgeError::CapsuleName { .. } => {
                    PyValueError::new_err(e.to_string())
                }
                BridgeError::OverflowError { .. } => PyOverflowError::new_err(e.to_string()),
                _ => PyRuntimeError::new_err(e.to_string()),
            },
        }
    }
}

/// Result type alias for colbridge-py operations.
pub type PyBridgeResult<T> = Result<T, PyBridgeError>;
