//! # **Capsule Module** - *Single-owner descriptor handles under well-known names*
//!
//! A [`Capsule`] owns exactly one `ArrowSchema`, `ArrowArray` or `ArrowArrayStream`,
//! labelled with the capability name a consumer recognises it by:
//!
//! | Name                 | Payload            |
//! |----------------------|--------------------|
//! | `arrow_schema`       | `ArrowSchema`      |
//! | `arrow_array`        | `ArrowArray`       |
//! | `arrow_array_stream` | `ArrowArrayStream` |
//!
//! Taking the payload moves it to the caller and leaves the capsule consumed, so a
//! second take fails with `CapsuleConsumed`. A capsule dropped while still holding its
//! payload releases it.
//!
//! The two protocol capabilities, `__arrow_c_array__` and `__arrow_c_stream__`, are the
//! [`ArrowCArray`] and [`ArrowCStream`] traits. [`ArrayHandle`] and [`StreamHandle`]
//! wrap an implementor as a single-use export object.

use std::ffi::{CStr, c_void};

use tracing::{debug, trace};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowArrayStream, ArrowSchema};
use crate::ffi::export::{export_field_array, export_table};
use crate::ffi::import::import_field_array;
use crate::ffi::schema::import_schema;
use crate::ffi::stream::{ArrowStreamReader, export_stream, export_table_stream};
use crate::{ArrowType, FieldArray, Table};
#[cfg(feature = "chunked")]
use crate::{
    SuperArray, SuperTable,
    ffi::stream::{export_super_array_stream, export_super_table_stream},
};

/// Capability name of a schema capsule.
pub const ARROW_SCHEMA: &CStr = c"arrow_schema";
/// Capability name of an array capsule.
pub const ARROW_ARRAY: &CStr = c"arrow_array";
/// Capability name of a stream capsule.
pub const ARROW_ARRAY_STREAM: &CStr = c"arrow_array_stream";

const ARRAY_CAPABILITY: &str = "__arrow_c_array__";
const STREAM_CAPABILITY: &str = "__arrow_c_stream__";

#[derive(Debug)]
enum Payload {
    Schema(Box<ArrowSchema>),
    Array(Box<ArrowArray>),
    Stream(Box<ArrowArrayStream>),
}

/// Owns one descriptor under its capability name.
#[derive(Debug)]
pub struct Capsule {
    name: &'static CStr,
    payload: Option<Payload>,
}

fn name_str(name: &'static CStr) -> &'static str {
    match name.to_bytes() {
        b"arrow_schema" => "arrow_schema",
        b"arrow_array" => "arrow_array",
        _ => "arrow_array_stream",
    }
}

impl Capsule {
    pub fn from_schema(schema: ArrowSchema) -> Self {
        Self {
            name: ARROW_SCHEMA,
            payload: Some(Payload::Schema(Box::new(schema))),
        }
    }

    pub fn from_array(array: ArrowArray) -> Self {
        Self {
            name: ARROW_ARRAY,
            payload: Some(Payload::Array(Box::new(array))),
        }
    }

    pub fn from_stream(stream: ArrowArrayStream) -> Self {
        Self {
            name: ARROW_ARRAY_STREAM,
            payload: Some(Payload::Stream(Box::new(stream))),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static CStr {
        self.name
    }

    /// `true` once the payload has been taken.
    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.payload.is_none()
    }

    fn expect(&self, expected: &'static CStr) -> Result<()> {
        if self.name != expected {
            return Err(BridgeError::CapsuleName {
                expected: name_str(expected),
                found: name_str(self.name),
            });
        }
        if self.payload.is_none() {
            return Err(BridgeError::CapsuleConsumed {
                capability: name_str(expected),
            });
        }
        Ok(())
    }

    /// Borrows the schema without consuming it, e.g. to read a requested schema.
    pub fn schema(&self) -> Result<&ArrowSchema> {
        self.expect(ARROW_SCHEMA)?;
        match &self.payload {
            Some(Payload::Schema(s)) => Ok(s),
            _ => Err(BridgeError::CapsuleConsumed { capability: "arrow_schema" }),
        }
    }

    /// Moves the schema out.
    ///
    /// # Errors
    /// `CapsuleName` for another kind of capsule, `CapsuleConsumed` when already taken.
    pub fn take_schema(&mut self) -> Result<ArrowSchema> {
        self.expect(ARROW_SCHEMA)?;
        match self.payload.take() {
            Some(Payload::Schema(s)) => Ok(*s),
            _ => Err(BridgeError::CapsuleConsumed { capability: "arrow_schema" }),
        }
    }

    /// Moves the array out. Errors as [`Capsule::take_schema`].
    pub fn take_array(&mut self) -> Result<ArrowArray> {
        self.expect(ARROW_ARRAY)?;
        match self.payload.take() {
            Some(Payload::Array(a)) => Ok(*a),
            _ => Err(BridgeError::CapsuleConsumed { capability: "arrow_array" }),
        }
    }

    /// Moves the stream out. Errors as [`Capsule::take_schema`].
    pub fn take_stream(&mut self) -> Result<ArrowArrayStream> {
        self.expect(ARROW_ARRAY_STREAM)?;
        match self.payload.take() {
            Some(Payload::Stream(s)) => Ok(*s),
            _ => Err(BridgeError::CapsuleConsumed {
                capability: "arrow_array_stream",
            }),
        }
    }

    /// Hands the boxed descriptor over as a raw pointer, with its name. The receiver
    /// owns it and must release it, or return it through [`Capsule::from_raw`].
    pub fn into_raw(mut self) -> Result<(&'static CStr, *mut c_void)> {
        let name = self.name;
        let ptr: *mut c_void = match self.payload.take() {
            Some(Payload::Schema(s)) => Box::into_raw(s).cast(),
            Some(Payload::Array(a)) => Box::into_raw(a).cast(),
            Some(Payload::Stream(s)) => Box::into_raw(s).cast(),
            None => {
                return Err(BridgeError::CapsuleConsumed {
                    capability: name_str(name),
                });
            }
        };
        Ok((name, ptr))
    }

    /// Re-wraps a pointer from [`Capsule::into_raw`].
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` with the same `name`, and not be used again.
    pub unsafe fn from_raw(name: &CStr, ptr: *mut c_void) -> Result<Self> {
        if ptr.is_null() {
            return Err(BridgeError::NullPointer("capsule payload"));
        }
        let capsule = match name.to_bytes() {
            b"arrow_schema" => Self::from_schema(*unsafe { Box::from_raw(ptr as *mut ArrowSchema) }),
            b"arrow_array" => Self::from_array(*unsafe { Box::from_raw(ptr as *mut ArrowArray) }),
            b"arrow_array_stream" => {
                Self::from_stream(*unsafe { Box::from_raw(ptr as *mut ArrowArrayStream) })
            }
            other => {
                return Err(BridgeError::schema(format!(
                    "unknown capsule name '{}'",
                    String::from_utf8_lossy(other)
                )));
            }
        };
        Ok(capsule)
    }
}

impl Drop for Capsule {
    fn drop(&mut self) {
        let Some(payload) = self.payload.take() else {
            return;
        };
        trace!(name = ?self.name, "releasing unconsumed capsule");
        match payload {
            Payload::Schema(mut s) => s.release(),
            Payload::Array(mut a) => a.release(),
            Payload::Stream(mut s) => s.release(),
        }
    }
}

/// The `__arrow_c_array__` capability: export as an `(arrow_schema, arrow_array)` pair.
///
/// `requested_schema` is honoured when it matches the exported type. Casting to a
/// different type is not supported and fails with `SchemaError`.
pub trait ArrowCArray {
    fn arrow_c_array(&self, requested_schema: Option<&Capsule>) -> Result<(Capsule, Capsule)>;
}

/// The `__arrow_c_stream__` capability: export as an `arrow_array_stream` capsule.
pub trait ArrowCStream {
    fn arrow_c_stream(&self, requested_schema: Option<&Capsule>) -> Result<Capsule>;
}

fn check_requested(requested: Option<&Capsule>, actual: &ArrowType) -> Result<()> {
    let Some(capsule) = requested else {
        return Ok(());
    };
    let requested = import_schema(capsule.schema()?)?;
    if &requested.dtype != actual {
        return Err(BridgeError::schema(format!(
            "requested schema {} differs from {actual}, casting is not supported",
            requested.dtype
        )));
    }
    Ok(())
}

fn pair((array, schema): (ArrowArray, ArrowSchema)) -> (Capsule, Capsule) {
    (Capsule::from_schema(schema), Capsule::from_array(array))
}

impl ArrowCArray for FieldArray {
    fn arrow_c_array(&self, requested_schema: Option<&Capsule>) -> Result<(Capsule, Capsule)> {
        check_requested(requested_schema, &self.field.dtype)?;
        export_field_array(self).map(pair)
    }
}

impl ArrowCArray for Table {
    fn arrow_c_array(&self, requested_schema: Option<&Capsule>) -> Result<(Capsule, Capsule)> {
        check_requested(requested_schema, &self.schema().struct_type())?;
        export_table(self).map(pair)
    }
}

impl ArrowCStream for FieldArray {
    fn arrow_c_stream(&self, requested_schema: Option<&Capsule>) -> Result<Capsule> {
        check_requested(requested_schema, &self.field.dtype)?;
        let stream = export_stream((*self.field).clone(), std::iter::once(Ok(self.array.clone())))?;
        Ok(Capsule::from_stream(stream))
    }
}

impl ArrowCStream for Table {
    fn arrow_c_stream(&self, requested_schema: Option<&Capsule>) -> Result<Capsule> {
        let schema = self.schema();
        check_requested(requested_schema, &schema.struct_type())?;
        export_table_stream(schema, vec![self.clone()]).map(Capsule::from_stream)
    }
}

#[cfg(feature = "chunked")]
impl ArrowCStream for SuperTable {
    fn arrow_c_stream(&self, requested_schema: Option<&Capsule>) -> Result<Capsule> {
        check_requested(requested_schema, &self.schema.struct_type())?;
        export_super_table_stream(self).map(Capsule::from_stream)
    }
}

#[cfg(feature = "chunked")]
impl ArrowCStream for SuperArray {
    fn arrow_c_stream(&self, requested_schema: Option<&Capsule>) -> Result<Capsule> {
        check_requested(requested_schema, &self.field.dtype)?;
        export_super_array_stream(self).map(Capsule::from_stream)
    }
}

/// Single-use `__arrow_c_array__` export object.
///
/// ```rust
/// use colbridge::{Array, FieldArray, IntegerArray, BridgeError};
/// use colbridge::ffi::capsule::ArrayHandle;
///
/// let fa = FieldArray::from_arr("x", Array::from_int8(IntegerArray::from_slice(&[1, 2])));
/// let mut handle = ArrayHandle::new(fa);
/// assert!(handle.arrow_c_array(None).is_ok());
/// assert!(matches!(handle.arrow_c_array(None), Err(BridgeError::CapsuleConsumed { .. })));
/// ```
pub struct ArrayHandle {
    source: Option<Box<dyn ArrowCArray + Send>>,
}

impl ArrayHandle {
    pub fn new(source: impl ArrowCArray + Send + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
        }
    }

    /// Exports on the first call. A failed export leaves the handle unconsumed.
    pub fn arrow_c_array(&mut self, requested_schema: Option<&Capsule>) -> Result<(Capsule, Capsule)> {
        let source = self.source.as_ref().ok_or(BridgeError::CapsuleConsumed {
            capability: ARRAY_CAPABILITY,
        })?;
        let out = source.arrow_c_array(requested_schema)?;
        self.source = None;
        debug!(capability = ARRAY_CAPABILITY, "capsules handed out");
        Ok(out)
    }

    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.source.is_none()
    }
}

/// Single-use `__arrow_c_stream__` export object.
pub struct StreamHandle {
    source: Option<Box<dyn ArrowCStream + Send>>,
}

impl StreamHandle {
    pub fn new(source: impl ArrowCStream + Send + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
        }
    }

    /// Exports on the first call. A failed export leaves the handle unconsumed.
    pub fn arrow_c_stream(&mut self, requested_schema: Option<&Capsule>) -> Result<Capsule> {
        let source = self.source.as_ref().ok_or(BridgeError::CapsuleConsumed {
            capability: STREAM_CAPABILITY,
        })?;
        let out = source.arrow_c_stream(requested_schema)?;
        self.source = None;
        debug!(capability = STREAM_CAPABILITY, "capsule handed out");
        Ok(out)
    }

    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.source.is_none()
    }
}

/// Consumes an `(arrow_schema, arrow_array)` capsule pair into a column.
pub fn import_array_capsules(mut schema: Capsule, mut array: Capsule) -> Result<FieldArray> {
    let s = schema.take_schema()?;
    let a = match array.take_array() {
        Ok(a) => a,
        Err(e) => {
            let mut s = s;
            s.release();
            return Err(e);
        }
    };
    unsafe { import_field_array(a, s) }
}

/// Consumes an `arrow_array_stream` capsule into a reader.
pub fn import_stream_capsule(mut stream: Capsule) -> Result<ArrowStreamReader> {
    ArrowStreamReader::try_new(stream.take_stream()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::schema::export_schema;
    use crate::{Array, Field, IntegerArray};

    fn column() -> FieldArray {
        FieldArray::from_arr("v", Array::from_int64(IntegerArray::from_slice(&[7, 8, 9])))
    }

    #[test]
    fn second_take_is_consumed() {
        let (mut schema, _array) = column().arrow_c_array(None).unwrap();
        let mut s = schema.take_schema().unwrap();
        assert_eq!(
            schema.take_schema().unwrap_err(),
            BridgeError::CapsuleConsumed { capability: "arrow_schema" }
        );
        s.release();
    }

    #[test]
    fn wrong_name_rejected() {
        let (mut schema, _array) = column().arrow_c_array(None).unwrap();
        assert_eq!(
            schema.take_array().unwrap_err(),
            BridgeError::CapsuleName {
                expected: "arrow_array",
                found: "arrow_schema"
            }
        );
        assert!(!schema.is_consumed());
    }

    #[test]
    fn raw_round_trip() {
        let (schema, array) = column().arrow_c_array(None).unwrap();
        let (name, ptr) = array.into_raw().unwrap();
        assert_eq!(name, ARROW_ARRAY);
        let array = unsafe { Capsule::from_raw(name, ptr) }.unwrap();
        let back = import_array_capsules(schema, array).unwrap();
        assert_eq!(back.array.to_list(), column().array.to_list());
    }

    #[test]
    fn requested_schema_must_match() {
        let requested = Capsule::from_schema(export_schema(&ArrowType::Int32, "v", false).unwrap());
        let err = column().arrow_c_array(Some(&requested)).unwrap_err();
        assert!(err.to_string().contains("casting is not supported"));
        assert!(!requested.is_consumed());

        let same = Capsule::from_schema(export_schema(&ArrowType::Int64, "v", false).unwrap());
        assert!(column().arrow_c_array(Some(&same)).is_ok());
    }

    #[test]
    fn stream_handle_single_use() {
        let mut handle = StreamHandle::new(column());
        let capsule = handle.arrow_c_stream(None).unwrap();
        assert!(handle.is_consumed());
        assert!(matches!(
            handle.arrow_c_stream(None),
            Err(BridgeError::CapsuleConsumed {
                capability: "__arrow_c_stream__"
            })
        ));
        let reader = import_stream_capsule(capsule).unwrap();
        assert_eq!(reader.field(), &Field::from_array("v", &column().array, None));
        let batches: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 1);
    }
}
