//! Benchmarks for RowStore structural edits.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::cell::RefCell;
use std::rc::Rc;
use tabula_core::schema::SchemaBuilder;
use tabula_core::{FieldId, SchemaId, TypeTag};
use tabula_storage::RowStore;

fn create_store(rows: usize) -> RowStore {
    let schema = SchemaBuilder::new("Quote")
        .unwrap()
        .add_field("id", TypeTag::Int)
        .unwrap()
        .add_field("price", TypeTag::Float)
        .unwrap()
        .add_field("symbol", TypeTag::String)
        .unwrap()
        .add_array_field("tags", TypeTag::String)
        .unwrap()
        .key("id")
        .unwrap()
        .auto_increment(true)
        .build(SchemaId(1));
    let mut store = RowStore::new("Quotes", Rc::new(RefCell::new(schema)));
    for i in 0..rows {
        let row = store.add_row(None).unwrap();
        store
            .cell_mut(FieldId(3), row)
            .unwrap()
            .set_string(format!("SYM{}", i))
            .unwrap();
    }
    store
}

/// Benchmark: appending rows with auto-increment keys.
fn add_row_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_store_add_row");
    for rows in [100usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| black_box(create_store(rows)));
        });
    }
    group.finish();
}

/// Benchmark: moving a scattered block of rows.
fn insert_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_store_insert");
    for rows in [1000usize, 10000] {
        let sources: Vec<usize> = (0..rows).step_by(7).collect();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter_batched(
                || create_store(rows),
                |mut store| {
                    store.insert(rows / 2, &sources).unwrap();
                    black_box(store)
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

/// Benchmark: removing rows in ascending input order.
fn remove_rows_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_store_remove_rows");
    let rows = 10000usize;
    for count in [100usize, 1000] {
        let indexes: Vec<usize> = (0..count).map(|i| i * (rows / count)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &indexes, |b, indexes| {
            b.iter_batched(
                || create_store(rows),
                |mut store| {
                    store.remove_rows(indexes).unwrap();
                    black_box(store)
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

/// Benchmark: key lookup by linear scan.
fn find_row_by_key_benchmark(c: &mut Criterion) {
    let store = create_store(10000);
    c.bench_function("row_store_find_row_by_key", |b| {
        b.iter(|| black_box(store.find_row_by_key(black_box("9999")).unwrap()));
    });
}

criterion_group!(
    benches,
    add_row_benchmark,
    insert_benchmark,
    remove_rows_benchmark,
    find_row_by_key_benchmark
);
criterion_main!(benches);
