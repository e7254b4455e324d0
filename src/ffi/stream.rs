//! # **Stream Module** - *ArrowArrayStream producer and consumer*
//!
//! ## Producer
//! [`export_stream`] wraps any batch iterator in an `ArrowArrayStream`. The private data
//! is a small state machine:
//!
//! ```text
//! Ready { source, position } --next--> Ready         (a batch was exported)
//!                            --end---> Exhausted     (end of stream, not an error)
//!                            --error-> Failed(error) (terminal)
//! ```
//!
//! - `get_next` in `Exhausted` keeps signalling end of stream.
//! - `get_next` and `get_schema` in `Failed` re-report the same code and message.
//! - `get_schema` otherwise always exports the fixed stream schema.
//! - `release` is valid from any state and drops the source with any batches it retains.
//!
//! Every batch is checked against the stream field before export: its type must match
//! and a non-nullable field may not hold nulls.
//!
//! ## Consumer
//! [`ArrowStreamReader`] pulls from a foreign stream as an `Iterator`. The foreign
//! release callback runs exactly once: at end of stream, on the first error, on an
//! explicit [`ArrowStreamReader::close`], or when the reader is dropped early.

use std::ffi::{CString, c_char, c_int};
use std::ptr;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::enums::error::{BridgeError, EINVAL, Result};
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowArrayStream, ArrowSchema};
use crate::ffi::export::export_array;
use crate::ffi::import::import_array_typed;
use crate::ffi::schema::{Schema, export_field, import_schema};
use crate::structs::field::nulls_allowed;
use crate::{Array, Field, StructArray, Table};
#[cfg(feature = "chunked")]
use crate::{SuperArray, SuperTable};

/// A boxed batch source for a stream producer.
pub type BatchSource = Box<dyn Iterator<Item = Result<Array>> + Send>;

enum StreamState {
    Ready { source: BatchSource, position: usize },
    Exhausted,
    Failed(BridgeError),
}

struct StreamPrivateData {
    field: Field,
    state: StreamState,
    last_error: Option<CString>,
}

impl StreamPrivateData {
    /// Records `err` for `get_last_error` and returns its status code.
    fn report(&mut self, err: &BridgeError) -> c_int {
        // Interior NULs cannot cross as a C string.
        let msg = err.to_string().replace('\0', " ");
        self.last_error = CString::new(msg).ok();
        err.errno()
    }

    fn fail(&mut self, err: BridgeError) -> c_int {
        warn!(error = %err, "stream failed");
        let code = self.report(&err);
        self.state = StreamState::Failed(err);
        code
    }

    fn check_batch(&self, batch: &Array) -> Result<()> {
        let actual = batch.arrow_type();
        if actual != self.field.dtype {
            return Err(BridgeError::schema(format!(
                "stream '{}' declares {} but a batch is {actual}",
                self.field.name, self.field.dtype
            )));
        }
        if !nulls_allowed(&self.field, batch) {
            return Err(BridgeError::schema(format!(
                "stream '{}' is not nullable but a batch holds {} nulls",
                self.field.name,
                batch.null_count()
            )));
        }
        Ok(())
    }
}

unsafe fn state_of<'a>(stream: *mut ArrowArrayStream) -> Option<&'a mut StreamPrivateData> {
    if stream.is_null() {
        return None;
    }
    let data = unsafe { (*stream).private_data } as *mut StreamPrivateData;
    unsafe { data.as_mut() }
}

unsafe extern "C" fn get_schema(stream: *mut ArrowArrayStream, out: *mut ArrowSchema) -> c_int {
    let Some(private) = (unsafe { state_of(stream) }) else {
        return EINVAL;
    };
    if out.is_null() {
        return private.report(&BridgeError::NullPointer("get_schema output"));
    }
    if let StreamState::Failed(err) = &private.state {
        let err = err.clone();
        return private.report(&err);
    }
    match export_field(&private.field) {
        Ok(schema) => {
            unsafe { out.write(schema) };
            0
        }
        Err(e) => private.report(&e),
    }
}

unsafe extern "C" fn get_next(stream: *mut ArrowArrayStream, out: *mut ArrowArray) -> c_int {
    let Some(private) = (unsafe { state_of(stream) }) else {
        return EINVAL;
    };
    if out.is_null() {
        return private.report(&BridgeError::NullPointer("get_next output"));
    }
    let next = match &mut private.state {
        StreamState::Exhausted => None,
        StreamState::Failed(err) => {
            let err = err.clone();
            return private.report(&err);
        }
        StreamState::Ready { source, position } => {
            let item = source.next();
            let at = *position;
            *position += 1;
            match item {
                Some(b) => Some((at, b)),
                None => {
                    debug!(field = %private.field.name, batches = at, "stream exhausted");
                    private.state = StreamState::Exhausted;
                    None
                }
            }
        }
    };
    let Some((position, batch)) = next else {
        unsafe { out.write(ArrowArray::empty()) };
        return 0;
    };
    let exported = batch
        .map_err(|e| BridgeError::StreamError(format!("batch {position}: {e}")))
        .and_then(|b| private.check_batch(&b).map(|_| b))
        .and_then(|b| export_array(&b));
    match exported {
        Ok(array) => {
            debug!(position, len = array.length, null_count = array.null_count, "stream batch exported");
            unsafe { out.write(array) };
            0
        }
        Err(e) => private.fail(e),
    }
}

unsafe extern "C" fn get_last_error(stream: *mut ArrowArrayStream) -> *const c_char {
    match unsafe { state_of(stream) } {
        Some(private) => private.last_error.as_ref().map_or(ptr::null(), |e| e.as_ptr()),
        None => ptr::null(),
    }
}

unsafe extern "C" fn release_stream(stream: *mut ArrowArrayStream) {
    if stream.is_null() {
        return;
    }
    let stream = unsafe { &mut *stream };
    if !stream.private_data.is_null() {
        drop(unsafe { Box::from_raw(stream.private_data as *mut StreamPrivateData) });
        trace!("released exported ArrowArrayStream");
    }
    stream.private_data = ptr::null_mut();
    stream.release = None;
}

/// Exports a lazy batch sequence as an `ArrowArrayStream` with schema `field`.
///
/// Batches are pulled from `batches` one `get_next` at a time. An `Err` item moves the
/// stream to `Failed` and is reported as a `StreamError`.
///
/// # Errors
/// When `field` has no schema encoding.
pub fn export_stream<I>(field: Field, batches: I) -> Result<ArrowArrayStream>
where
    I: IntoIterator<Item = Result<Array>>,
    I::IntoIter: Send + 'static,
{
    let mut encoded = export_field(&field)?;
    encoded.release();
    debug!(field = %field.name, dtype = %field.dtype, "exporting stream");
    let private = Box::new(StreamPrivateData {
        field,
        state: StreamState::Ready {
            source: Box::new(batches.into_iter()),
            position: 0,
        },
        last_error: None,
    });
    Ok(ArrowArrayStream {
        get_schema: Some(get_schema),
        get_next: Some(get_next),
        get_last_error: Some(get_last_error),
        release: Some(release_stream),
        private_data: Box::into_raw(private).cast(),
    })
}

fn batch_array(fields: &Arc<[Field]>, table: &Table) -> Result<Array> {
    let children = table.cols.iter().map(|c| c.array.clone()).collect();
    let batch = StructArray::try_new_with_len(Arc::clone(fields), children, None, table.n_rows)?;
    Ok(Array::from_struct(batch))
}

fn table_stream(name: String, schema: Schema, tables: Vec<Arc<Table>>) -> Result<ArrowArrayStream> {
    let fields: Arc<[Field]> = Arc::from(schema.fields.clone());
    let root = schema.root_field(name);
    export_stream(root, tables.into_iter().map(move |t| batch_array(&fields, &t)))
}

/// Exports record batches as a stream of `+s` arrays under `schema`.
///
/// A batch whose columns do not match the schema fails the stream at that batch.
pub fn export_table_stream(schema: Schema, tables: Vec<Table>) -> Result<ArrowArrayStream> {
    table_stream(String::new(), schema, tables.into_iter().map(Arc::new).collect())
}

/// Exports each batch of a `SuperTable` in order. The root schema is named after it.
#[cfg(feature = "chunked")]
pub fn export_super_table_stream(table: &SuperTable) -> Result<ArrowArrayStream> {
    table_stream(table.name.clone(), table.schema.clone(), table.batches.clone())
}

/// Exports each chunk of a `SuperArray` as one stream batch, under the column field.
#[cfg(feature = "chunked")]
pub fn export_super_array_stream(array: &SuperArray) -> Result<ArrowArrayStream> {
    let chunks = array.chunks.clone();
    export_stream((*array.field).clone(), chunks.into_iter().map(Ok))
}

/// Consumer over a foreign `ArrowArrayStream`.
///
/// Yields each batch imported under the stream field. Stops after end of stream, or
/// after yielding the first error. The foreign stream is released exactly once.
///
/// ```rust
/// use colbridge::{Array, ArrowType, Field, IntegerArray};
/// use colbridge::ffi::stream::{ArrowStreamReader, export_stream};
///
/// let field = Field::new("n", ArrowType::Int32, false, None);
/// let chunks = vec![
///     Ok(Array::from_int32(IntegerArray::from_slice(&[1, 2]))),
///     Ok(Array::from_int32(IntegerArray::from_slice(&[3]))),
/// ];
/// let stream = export_stream(field, chunks).unwrap();
/// let reader = ArrowStreamReader::try_new(stream).unwrap();
/// let lens: Vec<usize> = reader.map(|b| b.unwrap().len()).collect();
/// assert_eq!(lens, vec![2, 1]);
/// ```
pub struct ArrowStreamReader {
    stream: Box<ArrowArrayStream>,
    field: Field,
    done: bool,
}

impl ArrowStreamReader {
    /// Takes ownership of `stream` and reads its schema.
    ///
    /// # Errors
    /// `StreamError` when the producer fails `get_schema`, or the error from decoding the
    /// schema. The stream is released before returning either.
    pub fn try_new(stream: ArrowArrayStream) -> Result<Self> {
        if stream.is_released() {
            return Err(BridgeError::StreamError("stream has already been released".into()));
        }
        let mut stream = Box::new(stream);
        let Some(get_schema) = stream.get_schema else {
            stream.release();
            return Err(BridgeError::NullPointer("ArrowArrayStream.get_schema"));
        };
        let mut schema = ArrowSchema::empty();
        let code = unsafe { get_schema(&mut *stream, &mut schema) };
        if code != 0 {
            let msg = last_error(&mut stream);
            stream.release();
            return Err(BridgeError::StreamError(format!("get_schema failed ({code}): {msg}")));
        }
        let field = import_schema(&schema);
        schema.release();
        match field {
            Ok(field) => {
                debug!(field = %field.name, dtype = %field.dtype, "reading stream");
                Ok(Self {
                    stream,
                    field,
                    done: false,
                })
            }
            Err(e) => {
                stream.release();
                Err(e)
            }
        }
    }

    /// The stream's fixed schema, as the producer declared it. Batches carry
    /// `field().materialised()`, which differs only for string views.
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Releases the foreign stream now. Later calls, and `Drop`, do nothing.
    pub fn close(&mut self) {
        if !self.done {
            self.done = true;
            self.stream.release();
            trace!(field = %self.field.name, "closed foreign stream");
        }
    }

    fn pull(&mut self) -> Result<Option<Array>> {
        let Some(get_next) = self.stream.get_next else {
            return Err(BridgeError::NullPointer("ArrowArrayStream.get_next"));
        };
        let mut out = ArrowArray::empty();
        let code = unsafe { get_next(&mut *self.stream, &mut out) };
        if code != 0 {
            let msg = last_error(&mut self.stream);
            return Err(BridgeError::StreamError(format!("get_next failed ({code}): {msg}")));
        }
        if out.is_released() {
            return Ok(None);
        }
        unsafe { import_array_typed(out, &self.field.dtype) }.map(Some)
    }
}

fn last_error(stream: &mut ArrowArrayStream) -> String {
    let Some(f) = stream.get_last_error else {
        return "no error message".into();
    };
    let p = unsafe { f(stream) };
    if p.is_null() {
        return "no error message".into();
    }
    unsafe { std::ffi::CStr::from_ptr(p) }.to_string_lossy().into_owned()
}

impl Iterator for ArrowStreamReader {
    type Item = Result<Array>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.pull() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl Drop for ArrowStreamReader {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_tables(stream: ArrowArrayStream) -> Result<(String, Schema, Vec<Table>)> {
    let reader = ArrowStreamReader::try_new(stream)?;
    let (name, schema) = Schema::from_root_field(reader.field().materialised())?;
    let mut tables = Vec::new();
    for batch in reader {
        match batch? {
            Array::StructArray(s) => {
                tables.push(Table::from_struct_array(name.clone(), &s, schema.metadata.clone())?)
            }
            other => {
                return Err(BridgeError::schema(format!(
                    "record batch must be a struct array, found {}",
                    other.arrow_type()
                )));
            }
        }
    }
    Ok((name, schema, tables))
}

/// Reads a record batch stream to the end, one `Table` per batch.
pub fn import_table_stream(stream: ArrowArrayStream) -> Result<Vec<Table>> {
    read_tables(stream).map(|(_, _, tables)| tables)
}

/// Reads a record batch stream to the end into one `SuperTable`.
#[cfg(feature = "chunked")]
pub fn import_super_table_stream(stream: ArrowArrayStream) -> Result<SuperTable> {
    let (name, schema, tables) = read_tables(stream)?;
    SuperTable::try_new(name, schema, tables)
}

/// Reads an array stream to the end, one chunk per batch.
#[cfg(feature = "chunked")]
pub fn import_super_array_stream(stream: ArrowArrayStream) -> Result<SuperArray> {
    let reader = ArrowStreamReader::try_new(stream)?;
    let field = Arc::new(reader.field().materialised());
    let chunks = reader.collect::<Result<Vec<_>>>()?;
    SuperArray::try_new(field, chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArrowType, IntegerArray, StringArray};

    fn ints(v: &[i32]) -> Array {
        Array::from_int32(IntegerArray::from_slice(v))
    }

    fn field() -> Field {
        Field::new("n", ArrowType::Int32, true, None)
    }

    #[test]
    fn exhausted_keeps_signalling_end() {
        let mut s = export_stream(field(), vec![Ok(ints(&[1]))]).unwrap();
        let next = s.get_next.unwrap();
        let mut out = ArrowArray::empty();
        assert_eq!(unsafe { next(&mut s, &mut out) }, 0);
        assert!(!out.is_released());
        out.release();
        for _ in 0..2 {
            assert_eq!(unsafe { next(&mut s, &mut out) }, 0);
            assert!(out.is_released());
        }
        let mut schema = ArrowSchema::empty();
        assert_eq!(unsafe { s.get_schema.unwrap()(&mut s, &mut schema) }, 0);
        schema.release();
        s.release();
        assert!(s.is_released());
    }

    #[test]
    fn failure_is_sticky() {
        let batches = vec![Ok(ints(&[1])), Err(BridgeError::import("disk gone")), Ok(ints(&[2]))];
        let mut s = export_stream(field(), batches).unwrap();
        let next = s.get_next.unwrap();
        let mut out = ArrowArray::empty();
        assert_eq!(unsafe { next(&mut s, &mut out) }, 0);
        out.release();
        let first = unsafe { next(&mut s, &mut out) };
        assert_eq!(first, crate::enums::error::EIO);
        let msg = unsafe { std::ffi::CStr::from_ptr(s.get_last_error.unwrap()(&mut s)) };
        assert!(msg.to_str().unwrap().contains("disk gone"));
        assert_eq!(unsafe { next(&mut s, &mut out) }, first);
        let mut schema = ArrowSchema::empty();
        assert_eq!(unsafe { s.get_schema.unwrap()(&mut s, &mut schema) }, first);
        s.release();
    }

    #[test]
    fn mistyped_batch_fails_stream() {
        let batches = vec![Ok(Array::from_string32(StringArray::from_strs(&["x"])))];
        let reader = ArrowStreamReader::try_new(export_stream(field(), batches).unwrap()).unwrap();
        let out: Vec<_> = reader.collect();
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Err(BridgeError::StreamError(m)) if m.contains("declares Int32")));
    }

    #[test]
    fn release_tolerates_missing_private_data() {
        let mut s = export_stream(field(), Vec::new()).unwrap();
        let private = s.private_data;
        s.private_data = ptr::null_mut();
        s.release();
        assert!(s.is_released());
        drop(unsafe { Box::from_raw(private as *mut StreamPrivateData) });
    }

    #[test]
    fn reader_closes_on_early_drop() {
        let mut reader = ArrowStreamReader::try_new(
            export_stream(field(), vec![Ok(ints(&[1])), Ok(ints(&[2]))]).unwrap(),
        )
        .unwrap();
        assert!(reader.next().is_some());
        reader.close();
        assert!(reader.stream.is_released());
        assert!(reader.next().is_none());
    }
}
