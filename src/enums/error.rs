//! # Error Module - Custom *Colbridge* Error Type
//!
//! Defines the unified error type for the interchange boundary.
//!
//! ## Features
//! - One variant per failure class at the boundary: unrecognised formats, schema/array
//!   structural mismatches, violated import invariants, re-extracted capsules, producer-side
//!   stream failures and 32-bit offset overflow.
//! - Every variant carries the offending format string or the invariant that was violated,
//!   so the message is useful on its own once it crosses into another runtime.
//! - `errno()` maps variants onto the status codes returned through `ArrowArrayStream`.

use thiserror::Error;

/// Invalid argument, per the C stream interface status codes.
pub const EINVAL: i32 = 22;
/// I/O error, used for producer-side stream failures.
pub const EIO: i32 = 5;

/// Catch all error type for `Colbridge`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Format string not recognised, or a type that has no valid encoding.
    #[error("unsupported Arrow format '{format}'")]
    UnsupportedType { format: String },

    /// Structural mismatch between a schema and an array descriptor, or a field contract
    /// such as nullability that the data does not honour.
    #[error("schema error: {0}")]
    SchemaError(String),

    /// Length, buffer-count or null-count invariant violated by a foreign array.
    #[error("import error: {0}")]
    ImportError(String),

    /// A single-use capability was invoked a second time.
    #[error("'{capability}' has already been consumed")]
    CapsuleConsumed { capability: &'static str },

    /// Capsule extracted under a capability name it was not created with.
    #[error("capsule name mismatch: expected '{expected}', found '{found}'")]
    CapsuleName {
        expected: &'static str,
        found: &'static str,
    },

    /// Producer-reported failure mid-stream, carrying the producer's message.
    #[error("stream error: {0}")]
    StreamError(String),

    /// Variable-length data too long for the offset width of a non-large type.
    #[error("offset overflow: {len} exceeds the maximum offset {max}, use the large variant")]
    OverflowError { len: u64, max: u64 },

    /// A required descriptor, buffer or callback pointer was null.
    #[error("null pointer: {0}")]
    NullPointer(&'static str),
}

impl BridgeError {
    /// Status code reported through the C stream callbacks.
    pub fn errno(&self) -> i32 {
        match self {
            BridgeError::StreamError(_) => EIO,
            _ => EINVAL,
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        BridgeError::SchemaError(msg.into())
    }

    pub(crate) fn import(msg: impl Into<String>) -> Self {
        BridgeError::ImportError(msg.into())
    }

    pub(crate) fn unsupported(format: impl Into<String>) -> Self {
        BridgeError::UnsupportedType {
            format: format.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let e = BridgeError::unsupported("+w:4");
        assert_eq!(e.to_string(), "unsupported Arrow format '+w:4'");

        let e = BridgeError::OverflowError {
            len: 1 << 31,
            max: i32::MAX as u64,
        };
        assert!(e.to_string().contains("2147483648"));
        assert!(e.to_string().contains("large variant"));
    }

    #[test]
    fn errno_mapping() {
        assert_eq!(BridgeError::StreamError("boom".into()).errno(), EIO);
        assert_eq!(BridgeError::import("bad").errno(), EINVAL);
        assert_eq!(
            BridgeError::CapsuleConsumed {
                capability: "arrow_array"
            }
            .errno(),
            EINVAL
        );
    }
}
