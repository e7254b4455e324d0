//! Exactly-once release, checked against instrumented buffer storage.
//!
//! Each `Ledger` buffer reports its own drop. After every export/import/drop sequence all
//! storage must be freed exactly once: nothing leaks and nothing is freed twice.

mod common;

use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use colbridge::ffi::arrow_c_ffi::ArrowArray;
use colbridge::ffi::capsule::{ArrowCArray, ArrowCStream};
use colbridge::ffi::export::{export_array, export_field_array, export_table};
use colbridge::ffi::import::{import_array_typed, import_field_array, import_table};
use colbridge::ffi::stream::{ArrowStreamReader, export_stream};
use colbridge::{Array, ArrowType, Field, FieldArray, IntegerArray, StructArray, Table};

use common::{Ledger, init_tracing};

fn tracked_column(ledger: &Ledger, name: &str, values: &[i64]) -> FieldArray {
    let ints = IntegerArray::new(ledger.i64_buffer(values), None);
    FieldArray::from_arr(name, Array::from_int64(ints))
}

// -------------------------------
// Arrays
// -------------------------------
#[test]
fn test_n_arrays_exported_and_imported_in_sequence() {
    init_tracing();
    let ledger = Ledger::new();
    const N: usize = 16;
    for i in 0..N {
        let fa = tracked_column(&ledger, "x", &[i as i64, 1, 2]);
        let (array, schema) = export_field_array(&fa).unwrap();
        drop(fa);
        assert_eq!(ledger.live(), 1, "export keeps the source alive");
        let back = unsafe { import_field_array(array, schema) }.unwrap();
        assert_eq!(back.array.value(0), colbridge::Scalar::Int(i as i64));
        assert_eq!(ledger.live(), 1);
        drop(back);
        assert_eq!(ledger.live(), 0, "dropping the import releases the export");
    }
    assert_eq!(ledger.allocated(), N);
    assert_eq!(ledger.freed(), N);
}

#[test]
fn test_import_slices_outlive_each_other() {
    let ledger = Ledger::new();
    let fa = tracked_column(&ledger, "x", &[1, 2, 3, 4]);
    let (array, schema) = export_field_array(&fa).unwrap();
    drop(fa);
    let back = unsafe { import_field_array(array, schema) }.unwrap();
    let head = back.array.slice(0, 2);
    let tail = back.array.slice(2, 2);
    drop(back);
    drop(head);
    assert_eq!(ledger.live(), 1);
    drop(tail);
    assert_eq!(ledger.freed(), 1);
}

#[test]
fn test_export_released_without_import() {
    let ledger = Ledger::new();
    let fa = tracked_column(&ledger, "x", &[5]);
    let (mut array, mut schema) = export_field_array(&fa).unwrap();
    drop(fa);
    array.release();
    schema.release();
    assert!(array.is_released() && schema.is_released());
    assert_eq!(ledger.freed(), 1);
}

#[test]
fn test_failed_import_still_releases() {
    let ledger = Ledger::new();
    let fa = tracked_column(&ledger, "x", &[5, 6]);
    let array = export_array(&fa.array).unwrap();
    drop(fa);
    let err = unsafe { import_array_typed(array, &ArrowType::LargeString) };
    assert!(err.is_err());
    assert_eq!(ledger.live(), 0);
}

#[test]
fn test_struct_children_released_with_parent() {
    let ledger = Ledger::new();
    let table = Table::try_new(
        "t",
        vec![
            tracked_column(&ledger, "a", &[1, 2, 3]),
            tracked_column(&ledger, "b", &[4, 5, 6]),
        ],
    )
    .unwrap();
    let (array, schema) = export_table(&table).unwrap();
    drop(table);
    assert_eq!(ledger.live(), 2);
    let back = unsafe { import_table(array, schema) }.unwrap();
    let only_b = back.col("b").unwrap().clone();
    drop(back);
    // both columns hang off one foreign root, released with the last of them
    assert_eq!(ledger.live(), 2);
    drop(only_b);
    assert_eq!(ledger.live(), 0);
}

#[test]
fn test_struct_array_export_counts() {
    let ledger = Ledger::new();
    let s = StructArray::try_new(
        vec![Field::new("v", ArrowType::Int64, false, None)],
        vec![Array::from_int64(IntegerArray::new(ledger.i64_buffer(&[1]), None))],
        None,
    )
    .unwrap();
    let mut c = export_array(&Array::from_struct(s)).unwrap();
    assert_eq!(ledger.live(), 1);
    c.release();
    assert_eq!(ledger.live(), 0);
}

// -------------------------------
// Foreign producer
// -------------------------------
static FOREIGN_RELEASES: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn count_release(array: *mut ArrowArray) {
    FOREIGN_RELEASES.fetch_add(1, Ordering::SeqCst);
    let array = unsafe { &mut *array };
    drop(unsafe { Box::from_raw(array.private_data as *mut ForeignData) });
    array.release = None;
}

struct ForeignData {
    values: Vec<i32>,
    buffers: [*const c_void; 2],
}

/// A hand-built `ArrowArray` of int32, as another runtime would produce it.
fn foreign_int32(values: &[i32]) -> ArrowArray {
    let mut data = Box::new(ForeignData {
        values: values.to_vec(),
        buffers: [std::ptr::null(); 2],
    });
    data.buffers[1] = data.values.as_ptr().cast();
    let buffers = data.buffers.as_mut_ptr();
    ArrowArray {
        length: values.len() as i64,
        null_count: 0,
        offset: 0,
        n_buffers: 2,
        n_children: 0,
        buffers,
        children: std::ptr::null_mut(),
        dictionary: std::ptr::null_mut(),
        release: Some(count_release),
        private_data: Box::into_raw(data).cast(),
    }
}

#[test]
fn test_foreign_release_runs_once() {
    let before = FOREIGN_RELEASES.load(Ordering::SeqCst);
    let arr = unsafe { import_array_typed(foreign_int32(&[1, 2, 3]), &ArrowType::Int32) }.unwrap();
    let copies: Vec<Array> = (0..4).map(|_| arr.clone()).collect();
    drop(arr);
    assert_eq!(FOREIGN_RELEASES.load(Ordering::SeqCst), before);
    drop(copies);
    assert_eq!(FOREIGN_RELEASES.load(Ordering::SeqCst), before + 1);

    let mut bad = foreign_int32(&[1]);
    bad.null_count = 7;
    assert!(unsafe { import_array_typed(bad, &ArrowType::Int32) }.is_err());
    assert_eq!(FOREIGN_RELEASES.load(Ordering::SeqCst), before + 2);
}

// -------------------------------
// Streams and capsules
// -------------------------------
#[test]
fn test_stream_batches_released() {
    let ledger = Ledger::new();
    let field = Field::new("x", ArrowType::Int64, false, None);
    let batches: Vec<_> = (0..3)
        .map(|i| Ok(Array::from_int64(IntegerArray::new(ledger.i64_buffer(&[i, i]), None))))
        .collect();
    let reader = ArrowStreamReader::try_new(export_stream(field, batches).unwrap()).unwrap();
    let mut got = Vec::new();
    for b in reader.take(2) {
        got.push(b.unwrap());
    }
    // the unread third batch goes with the stream
    assert_eq!(ledger.live(), 2);
    drop(got);
    assert_eq!(ledger.live(), 0);
}

#[test]
fn test_unconsumed_capsules_release() {
    let ledger = Ledger::new();
    let fa = tracked_column(&ledger, "x", &[1, 2]);
    let (schema, array) = fa.arrow_c_array(None).unwrap();
    let stream = fa.arrow_c_stream(None).unwrap();
    drop(fa);
    assert_eq!(ledger.live(), 1);
    drop((schema, array, stream));
    assert_eq!(ledger.live(), 0);
}
