//! Export-then-import round trips over the C Data Interface, for every supported type.

mod common;

use std::collections::BTreeMap;

use colbridge::ffi::export::{export_array, export_field_array, export_table, export_to_c};
use colbridge::ffi::import::{import_array, import_field_array, import_from_c_owned, import_table};
use colbridge::ffi::schema::export_field;
use colbridge::{
    Array, ArrowType, Bitmask, BooleanArray, BridgeError, Buffer, CategoricalArray, Field, FieldArray,
    FloatArray, IndexType, IntegerArray, ListArray, NumericArray, Scalar, StringArray, StructArray, Table,
};
#[cfg(feature = "datetime")]
use colbridge::{DatetimeArray, IntervalArray, IntervalUnit, TimeUnit};

use common::init_tracing;

fn roundtrip(fa: &FieldArray) -> FieldArray {
    let (array, schema) = export_field_array(fa).expect("export");
    unsafe { import_field_array(array, schema) }.expect("import")
}

/// Asserts type, values and null positions survive a round trip.
fn check(name: &str, array: Array) {
    init_tracing();
    let fa = FieldArray::from_arr(name, array);
    let back = roundtrip(&fa);
    assert_eq!(back.field, fa.field, "{name}: field");
    assert_eq!(back.arrow_type(), fa.arrow_type(), "{name}: type");
    assert_eq!(back.len(), fa.len(), "{name}: len");
    assert_eq!(back.array.null_count(), fa.array.null_count(), "{name}: null count");
    assert_eq!(back.array.to_list(), fa.array.to_list(), "{name}: values");
}

/// Runs `build` over an all-null, a no-null and a mixed value set.
fn three_ways<T: Copy>(name: &str, values: &[T], build: impl Fn(&[Option<T>]) -> Array) {
    let all_null: Vec<Option<T>> = values.iter().map(|_| None).collect();
    let no_null: Vec<Option<T>> = values.iter().copied().map(Some).collect();
    let mixed: Vec<Option<T>> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i % 3 != 1).then_some(*v))
        .collect();
    check(&format!("{name}/all_null"), build(&all_null));
    check(&format!("{name}/no_null"), build(&no_null));
    check(&format!("{name}/mixed"), build(&mixed));
}

// -------------------------------
// Primitives
// -------------------------------
#[test]
fn test_integers() {
    three_ways("i8", &[-1i8, 0, 7, i8::MIN, i8::MAX], |v| Array::from_int8(IntegerArray::from_options(v)));
    three_ways("i16", &[-300i16, 0, 300], |v| Array::from_int16(IntegerArray::from_options(v)));
    three_ways("i32", &[1i32, 2, 3, 4, 5, 6, 7, 8, 9, 10], |v| {
        Array::from_int32(IntegerArray::from_options(v))
    });
    three_ways("i64", &[i64::MIN, -1, 0, i64::MAX], |v| Array::from_int64(IntegerArray::from_options(v)));
    three_ways("u8", &[0u8, 255, 1], |v| Array::from_uint8(IntegerArray::from_options(v)));
    three_ways("u16", &[0u16, 65535], |v| Array::from_uint16(IntegerArray::from_options(v)));
    three_ways("u32", &[0u32, u32::MAX, 5], |v| Array::from_uint32(IntegerArray::from_options(v)));
    three_ways("u64", &[0u64, u64::MAX, 5], |v| Array::from_uint64(IntegerArray::from_options(v)));
}

#[test]
fn test_floats_and_booleans() {
    three_ways("f32", &[0.5f32, -1.25, f32::MAX], |v| Array::from_float32(FloatArray::from_options(v)));
    three_ways("f64", &[1e300f64, -0.0, 3.5], |v| Array::from_float64(FloatArray::from_options(v)));
    three_ways("bool", &[true, false, true, true, false, false, true, false, true], |v| {
        Array::from_bool(BooleanArray::from_options(v))
    });
}

#[test]
fn test_null_type() {
    check("null", Array::Null(4));
    check("null/empty", Array::Null(0));
}

// -------------------------------
// Strings
// -------------------------------
#[test]
fn test_strings() {
    let words = ["alpha", "", "gamma", "ünïcödé", "e"];
    three_ways("utf8", &words, |v| Array::from_string32(StringArray::from_options(v)));
    three_ways("large_utf8", &words, |v| Array::from_string64(StringArray::from_options(v)));
    check("utf8/empty", Array::from_string32(StringArray::from_strs(&[])));
}

#[test]
fn test_string_overflow_is_an_export_error() {
    init_tracing();
    // One 2 GiB value, held as null so construction skips UTF-8 validation of the payload.
    let data = Buffer::from_vec(vec![0u8; 1 << 31]);
    let offsets = Buffer::from_vec(vec![0u32, 1 << 31]);
    let arr = StringArray::from_parts(offsets, data, Some(Bitmask::from_bools(&[false]))).unwrap();
    let err = export_array(&Array::from_string32(arr)).unwrap_err();
    assert_eq!(
        err,
        BridgeError::OverflowError {
            len: 1 << 31,
            max: i32::MAX as u64
        }
    );
}

// -------------------------------
// Temporal
// -------------------------------
#[cfg(feature = "datetime")]
#[test]
fn test_dates_and_times() {
    three_ways("date32", &[0i32, 19_000, -1], |v| {
        Array::from_date32(DatetimeArray::from_options(v, TimeUnit::Days))
    });
    three_ways("date64", &[0i64, 1_600_000_000_000], |v| {
        Array::from_date64(DatetimeArray::from_options(v, TimeUnit::Milliseconds))
    });
    for unit in [TimeUnit::Seconds, TimeUnit::Milliseconds] {
        three_ways(&format!("time32/{unit}"), &[0i32, 3_600, 86_399], |v| {
            Array::from_time32(DatetimeArray::from_options(v, unit))
        });
    }
    for unit in [TimeUnit::Microseconds, TimeUnit::Nanoseconds] {
        three_ways(&format!("time64/{unit}"), &[0i64, 86_399_999_999], |v| {
            Array::from_time64(DatetimeArray::from_options(v, unit))
        });
    }
}

#[cfg(feature = "datetime")]
#[test]
fn test_timestamps_keep_unit_and_zone() {
    let units = [
        TimeUnit::Seconds,
        TimeUnit::Milliseconds,
        TimeUnit::Microseconds,
        TimeUnit::Nanoseconds,
    ];
    for unit in units {
        for tz in [None, Some("UTC"), Some("+05:30"), Some("America/New_York")] {
            three_ways(&format!("ts/{unit}/{tz:?}"), &[1_700_000_000i64, 0, -5], |v| {
                let a = DatetimeArray::from_options(v, unit);
                Array::from_timestamp(match tz {
                    Some(tz) => a.with_timezone(tz),
                    None => a,
                })
            });
        }
        three_ways(&format!("duration/{unit}"), &[1i64, 0, -60], |v| {
            Array::from_duration(DatetimeArray::from_options(v, unit))
        });
    }
}

#[cfg(feature = "datetime")]
#[test]
fn test_intervals_in_all_three_layouts() {
    three_ways("interval/YearMonth", &[14i32, 0, -3], |v| Array::from_interval(IntervalArray::from_months(v)));
    three_ways("interval/DaysTime", &[(1i32, 500i32), (0, 0), (-2, 86_399_999)], |v| {
        Array::from_interval(IntervalArray::from_days_ms(v))
    });
    three_ways("interval/MonthDaysNs", &[(1i32, 2i32, -3i64), (0, 0, i64::MAX)], |v| {
        Array::from_interval(IntervalArray::from_month_day_nanos(v))
    });
    let fa = FieldArray::from_arr("iv", Array::from_interval(IntervalArray::from_days_ms(&[Some((1, 2))])));
    assert_eq!(fa.field.dtype, ArrowType::Interval(IntervalUnit::DaysTime));
}

// -------------------------------
// Dictionary
// -------------------------------
#[test]
fn test_dictionary_decodes_to_same_sequence() {
    init_tracing();
    let input = ["cat", "dog", "cat", "bird", "dog"];
    let expected: Vec<Scalar> = input.iter().map(|s| Scalar::String(s.to_string())).collect();

    let first_seen = CategoricalArray::from_strs(&input.map(Some));
    let reversed = CategoricalArray::try_new(
        NumericArray::from(IntegerArray::<u8>::from_slice(&[2, 1, 2, 0, 1])),
        Array::from_string32(StringArray::from_strs(&["bird", "dog", "cat"])),
        false,
    )
    .unwrap();

    for cat in [first_seen, reversed] {
        let fa = FieldArray::from_arr("animal", Array::from_categorical(cat));
        let back = roundtrip(&fa);
        assert_eq!(back.array.to_list(), expected);
        assert_eq!(back.arrow_type(), fa.arrow_type());
    }
}

#[test]
fn test_dictionary_with_nulls_and_order_flag() {
    let cat = CategoricalArray::try_new(
        NumericArray::from(IntegerArray::<i64>::from_options(&[Some(1), None, Some(0)])),
        Array::from_int32(IntegerArray::from_slice(&[10, 20])),
        true,
    )
    .unwrap();
    let fa = FieldArray::from_arr("ranked", Array::from_categorical(cat));
    let back = roundtrip(&fa);
    assert_eq!(back.array.to_list(), vec![Scalar::Int(20), Scalar::Null, Scalar::Int(10)]);
    assert!(matches!(
        &back.field.dtype,
        ArrowType::Dictionary { index: IndexType::Int64, ordered: true, .. }
    ));
}

// -------------------------------
// Nested
// -------------------------------
fn person_struct() -> StructArray {
    StructArray::try_new(
        vec![
            Field::new("id", ArrowType::Int64, false, None),
            Field::new("name", ArrowType::String, true, None),
            Field::new("active", ArrowType::Boolean, true, None),
        ],
        vec![
            Array::from_int64(IntegerArray::from_slice(&[1, 2, 3, 4])),
            Array::from_string32(StringArray::from_options(&[Some("ann"), None, Some("cy"), Some("di")])),
            Array::from_bool(BooleanArray::from_options(&[Some(true), Some(false), None, Some(true)])),
        ],
        Some(Bitmask::from_bools(&[true, true, false, true])),
    )
    .unwrap()
}

#[test]
fn test_struct() {
    check("struct", Array::from_struct(person_struct()));
}

#[test]
fn test_lists() {
    let item = Field::new("item", ArrowType::Float64, true, None);
    let values = Array::from_float64(FloatArray::from_options(&[Some(1.0), None, Some(3.0), Some(4.0)]));
    let lengths = [Some(2), None, Some(0), Some(2)];
    let list = ListArray::<u32>::from_lengths(item.clone(), values.clone(), &lengths).unwrap();
    check("list", Array::from_list(list));
    let large = ListArray::<u64>::from_lengths(item, values, &lengths).unwrap();
    check("large_list", Array::from_large_list(large));
}

#[test]
fn test_list_of_structs() {
    let s = Array::from_struct(person_struct());
    let field = Field::new("item", s.arrow_type(), true, None);
    let list = ListArray::<u32>::from_lengths(field, s, &[Some(3), Some(1)]).unwrap();
    check("list<struct>", Array::from_list(list));
}

#[test]
fn test_field_metadata_survives() {
    let mut meta = BTreeMap::new();
    meta.insert("unit".to_string(), "kg".to_string());
    let fa = FieldArray::from_parts("mass", Array::from_float32(FloatArray::from_slice(&[1.5, 2.5])), meta);
    assert_eq!(roundtrip(&fa).field.metadata["unit"], "kg");
}

// -------------------------------
// Slices
// -------------------------------
#[test]
fn test_sliced_arrays() {
    let ints = Array::from_int32(IntegerArray::from_options(&[Some(1), None, Some(3), Some(4), None]));
    let bools = Array::from_bool(BooleanArray::from_options(&[
        Some(true),
        None,
        Some(false),
        Some(true),
        Some(true),
        None,
        Some(false),
        Some(true),
        Some(false),
        Some(true),
    ]));
    let strs = Array::from_string32(StringArray::from_options(&[Some("a"), Some("bb"), None, Some("dddd")]));
    let structs = Array::from_struct(person_struct());
    check("ints[1..4]", ints.slice(1, 3));
    check("bools[3..10]", bools.slice(3, 7));
    check("bools[8..10]", bools.slice(8, 2));
    check("strs[1..4]", strs.slice(1, 3));
    check("structs[1..3]", structs.slice(1, 2));
}

// -------------------------------
// Tables and raw pointers
// -------------------------------
#[test]
fn test_table_batch() {
    init_tracing();
    let mut meta = BTreeMap::new();
    meta.insert("source".to_string(), "sensors".to_string());
    let table = Table::try_new(
        "readings",
        vec![
            FieldArray::from_arr("id", Array::from_int64(IntegerArray::from_slice(&[1, 2, 3]))),
            FieldArray::from_arr(
                "label",
                Array::from_string32(StringArray::from_options(&[Some("x"), None, Some("z")])),
            ),
        ],
    )
    .unwrap()
    .with_metadata(meta);

    let (array, schema) = export_table(&table).unwrap();
    let back = unsafe { import_table(array, schema) }.unwrap();
    assert_eq!(back.name, "readings");
    assert_eq!(back.metadata, table.metadata);
    assert_eq!(back.n_rows, 3);
    assert_eq!(back.col_names(), vec!["id", "label"]);
    assert_eq!(back.to_columns(), table.to_columns());
}

#[test]
fn test_raw_pointer_handshake() {
    let fa = FieldArray::from_arr("n", Array::from_uint8(IntegerArray::from_slice(&[9, 8, 7])));
    let (array, schema) = export_to_c(&fa).unwrap();
    let back = unsafe { import_from_c_owned(array, schema) }.unwrap();
    assert_eq!(back.array.to_list(), fa.array.to_list());
}

#[test]
fn test_import_against_separate_schema() {
    let field = Field::new("x", ArrowType::Int16, true, None);
    let array = Array::from_int16(IntegerArray::from_options(&[Some(4), None]));
    let mut schema = export_field(&field).unwrap();
    let c = export_array(&array).unwrap();
    let back = unsafe { import_array(c, &schema) }.unwrap();
    schema.release();
    assert_eq!(back.to_list(), array.to_list());
}

#[test]
fn test_mismatched_schema_fails_and_releases() {
    let ints = IntegerArray::<i64>::from_slice(&[1, 2]);
    let shared = ints.data.shared().clone();
    let array = Array::from_int64(ints);
    let mut schema = export_field(&Field::new("s", ArrowType::String, true, None)).unwrap();
    let c = export_array(&array).unwrap();
    let err = unsafe { import_array(c, &schema) }.unwrap_err();
    schema.release();
    assert!(matches!(err, BridgeError::ImportError(_)));
    drop(array);
    assert_eq!(shared.ref_count(), 1);
}
