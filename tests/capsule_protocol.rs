//! Capsule hand-off between a producer and a consumer that only see capsules.

mod common;

use colbridge::ffi::capsule::{
    ARROW_ARRAY_STREAM, ARROW_SCHEMA, ArrayHandle, ArrowCArray, ArrowCStream, Capsule,
    StreamHandle, import_array_capsules, import_stream_capsule,
};
use colbridge::ffi::schema::export_schema;
use colbridge::{
    Array, ArrowType, BooleanArray, BridgeError, Field, FieldArray, IntegerArray, StringArray, Table,
};
#[cfg(feature = "chunked")]
use colbridge::SuperTable;

use common::{Ledger, init_tracing};

fn table() -> Table {
    Table::try_new(
        "events",
        vec![
            FieldArray::from_arr("id", Array::from_int32(IntegerArray::from_slice(&[10, 20, 30]))),
            FieldArray::from_arr(
                "tag",
                Array::from_string32(StringArray::from_options(&[Some("x"), None, Some("z")])),
            ),
            FieldArray::from_arr("ok", Array::from_bool(BooleanArray::from_slice(&[true, false, true]))),
        ],
    )
    .unwrap()
}

// -------------------------------
// __arrow_c_array__
// -------------------------------
#[test]
fn test_column_hand_off() {
    init_tracing();
    let fa = FieldArray::from_arr("tag", table().cols[1].array.clone());
    let (schema, array) = fa.arrow_c_array(None).unwrap();
    assert_eq!(schema.name(), ARROW_SCHEMA);
    let back = import_array_capsules(schema, array).unwrap();
    assert_eq!(back.field, fa.field);
    assert_eq!(back.array.to_list(), fa.array.to_list());
}

#[test]
fn test_table_hand_off_as_struct() {
    let t = table();
    let (schema, array) = t.arrow_c_array(None).unwrap();
    let back = import_array_capsules(schema, array).unwrap();
    assert_eq!(back.field.name, "events");
    assert_eq!(back.field.dtype, t.schema().struct_type());
    assert_eq!(back.len(), 3);
    let Array::StructArray(s) = &back.array else {
        panic!("expected a struct, got {:?}", back.array);
    };
    let back = Table::from_struct_array(back.field.name.clone(), s, back.field.metadata.clone()).unwrap();
    assert_eq!(back.to_columns(), t.to_columns());
}

#[test]
fn test_requested_schema_for_table() {
    let t = table();
    let same = Capsule::from_schema(export_schema(&t.schema().struct_type(), "", false).unwrap());
    assert!(t.arrow_c_array(Some(&same)).is_ok());

    let other = Capsule::from_schema(export_schema(&ArrowType::Int32, "", false).unwrap());
    let err = t.arrow_c_array(Some(&other)).unwrap_err();
    assert!(matches!(err, BridgeError::SchemaError(_)));
    assert!(!other.is_consumed());
}

#[test]
fn test_array_handle_failure_leaves_it_usable() {
    let field = Field::new("strict", ArrowType::Int8, false, None);
    let nulls = Array::from_int8(IntegerArray::from_options(&[Some(1), None]));
    let mut handle = ArrayHandle::new(FieldArray::new(field, nulls));
    assert!(handle.arrow_c_array(None).is_err());
    assert!(!handle.is_consumed());
}

#[test]
fn test_array_handle_single_use() {
    let mut handle = ArrayHandle::new(table());
    let (schema, array) = handle.arrow_c_array(None).unwrap();
    assert!(handle.is_consumed());
    assert_eq!(
        handle.arrow_c_array(None).unwrap_err(),
        BridgeError::CapsuleConsumed {
            capability: "__arrow_c_array__"
        }
    );
    assert_eq!(import_array_capsules(schema, array).unwrap().len(), 3);
}

#[test]
fn test_swapped_capsules_rejected_and_released() {
    let ledger = Ledger::new();
    let fa = FieldArray::from_arr("v", Array::from_int64(IntegerArray::new(ledger.i64_buffer(&[1]), None)));
    let (schema, array) = fa.arrow_c_array(None).unwrap();
    drop(fa);
    let err = import_array_capsules(array, schema).unwrap_err();
    assert!(matches!(err, BridgeError::CapsuleName { .. }));
    assert_eq!(ledger.live(), 0);
}

// -------------------------------
// __arrow_c_stream__
// -------------------------------
#[test]
fn test_table_stream_capsule() {
    let t = table();
    let capsule = t.arrow_c_stream(None).unwrap();
    assert_eq!(capsule.name(), ARROW_ARRAY_STREAM);
    let reader = import_stream_capsule(capsule).unwrap();
    assert_eq!(reader.field().dtype, t.schema().struct_type());
    let batches = reader.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
}

#[cfg(feature = "chunked")]
#[test]
fn test_super_table_stream_capsule() {
    let st = SuperTable::from_batches(vec![table(), table().slice(1, 2)]).unwrap();
    let mut handle = StreamHandle::new(st);
    let capsule = handle.arrow_c_stream(None).unwrap();
    let lens: Vec<usize> = import_stream_capsule(capsule)
        .unwrap()
        .map(|b| b.unwrap().len())
        .collect();
    assert_eq!(lens, vec![3, 2]);
}

#[test]
fn test_stream_capsule_taken_once() {
    let mut capsule = table().arrow_c_stream(None).unwrap();
    let mut stream = capsule.take_stream().unwrap();
    assert!(capsule.is_consumed());
    assert!(matches!(
        capsule.take_stream(),
        Err(BridgeError::CapsuleConsumed { .. })
    ));
    assert!(matches!(
        import_stream_capsule(capsule),
        Err(BridgeError::CapsuleConsumed { .. })
    ));
    stream.release();
}

// -------------------------------
// Raw hand-off
// -------------------------------
#[test]
fn test_raw_stream_pointer_round_trip() {
    let capsule = table().arrow_c_stream(None).unwrap();
    let (name, ptr) = capsule.into_raw().unwrap();
    let capsule = unsafe { Capsule::from_raw(name, ptr) }.unwrap();
    let rows: usize = import_stream_capsule(capsule)
        .unwrap()
        .map(|b| b.unwrap().len())
        .sum();
    assert_eq!(rows, 3);
}

#[test]
fn test_raw_consumed_capsule_rejected() {
    let mut capsule = table().arrow_c_stream(None).unwrap();
    let mut stream = capsule.take_stream().unwrap();
    assert!(capsule.into_raw().is_err());
    stream.release();
    assert!(unsafe { Capsule::from_raw(ARROW_SCHEMA, std::ptr::null_mut()) }.is_err());
}
