use std::hint::black_box;

use colbridge::ffi::export::export_field_array;
use colbridge::ffi::import::import_field_array;
use colbridge::ffi::stream::{ArrowStreamReader, export_table_stream};
use colbridge::{Array, FieldArray, IntegerArray, StringArray, Table};

use criterion::{Criterion, criterion_group, criterion_main};

fn ints(size: usize) -> FieldArray {
    let values: Vec<Option<i64>> = (0..size as i64).map(|i| (i % 7 != 0).then_some(i)).collect();
    FieldArray::from_arr("v", Array::from_int64(IntegerArray::from_options(&values)))
}

fn strings(size: usize) -> FieldArray {
    let owned: Vec<String> = (0..size).map(|i| format!("row-{i}")).collect();
    let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
    FieldArray::from_arr("s", Array::from_string32(StringArray::from_strs(&refs)))
}

fn add_benchmark(c: &mut Criterion) {
    (10..=20).step_by(5).for_each(|log2_size| {
        let size = 2usize.pow(log2_size);
        let ints = ints(size);
        let strings = strings(size);

        c.bench_function(&format!("export+import i64 2^{log2_size}"), |b| {
            b.iter(|| {
                let (array, schema) = export_field_array(black_box(&ints)).unwrap();
                black_box(unsafe { import_field_array(array, schema) }.unwrap());
            })
        });

        c.bench_function(&format!("export+import utf8 2^{log2_size}"), |b| {
            b.iter(|| {
                let (array, schema) = export_field_array(black_box(&strings)).unwrap();
                black_box(unsafe { import_field_array(array, schema) }.unwrap());
            })
        });

        // unaligned validity forces a bitmap re-pack on every export
        let sliced = ints.slice(3, size - 3);
        c.bench_function(&format!("export+import sliced i64 2^{log2_size}"), |b| {
            b.iter(|| {
                let (array, schema) = export_field_array(black_box(&sliced)).unwrap();
                black_box(unsafe { import_field_array(array, schema) }.unwrap());
            })
        });

        let batches: Vec<Table> = (0..16)
            .map(|_| Table::try_new("t", vec![ints.clone(), strings.clone()]).unwrap())
            .collect();
        c.bench_function(&format!("stream 16 batches 2^{log2_size}"), |b| {
            b.iter(|| {
                let stream = export_table_stream(batches[0].schema(), batches.clone()).unwrap();
                let reader = ArrowStreamReader::try_new(stream).unwrap();
                black_box(reader.map(|batch| batch.unwrap().len()).sum::<usize>());
            })
        });
    });
}

criterion_group!(benches, add_benchmark);
criterion_main!(benches);
