//! Cursor and writer benchmarks for turrecord
//!
//! These measure the read paths that should stay cheap (field access, list
//! random access on fixed items, sequential walks over variable items) and
//! the cost of freezing and writing an editable tree.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use turrecord::{Cursor, Editable, EditableFactory, Schema, SchemaBuilder, SchemaProvider, SchemaRegistry};

struct Fixture {
    registry: Arc<SchemaRegistry>,
    order: Arc<Schema>,
    record: Editable,
    bytes: Vec<u8>,
}

fn fixture(lines: usize) -> Fixture {
    let registry = Arc::new(SchemaRegistry::new().unwrap());
    let get = |name: &str| registry.get_by_name(name).unwrap();
    let order = SchemaBuilder::class("Order")
        .field("Id", get("Int64"))
        .nullable_field("Customer", get("String"))
        .field("Quantities", get("ListOfInt32"))
        .field("Notes", get("ListOfString"))
        .nullable_field("Extra", get("Variable"))
        .build()
        .unwrap();
    let order = registry.add(order).unwrap();

    let factory = EditableFactory::new(registry.clone());
    let mut record = factory.create(order.clone(), false).unwrap();
    record.set_field("Id", 99i64).unwrap();
    record.set_field("Customer", "ACME Corporation").unwrap();
    for i in 0..lines {
        record.field_mut("Quantities").unwrap().push_value(i as i32).unwrap();
        record
            .field_mut("Notes")
            .unwrap()
            .push_value(format!("line {} note", i))
            .unwrap();
    }
    record.set_field("Extra", 12.5).unwrap();
    let bytes = record.to_bytes().unwrap();

    Fixture {
        registry,
        order,
        record,
        bytes,
    }
}

fn bench_field_access(c: &mut Criterion) {
    let f = fixture(100);
    let mut group = c.benchmark_group("field_access");

    group.bench_function("fixed_field", |b| {
        let cursor = Cursor::new(f.registry.clone(), f.order.clone(), &f.bytes).unwrap();
        b.iter(|| black_box(cursor.goto(0).unwrap().get().unwrap().into_owned()));
    });

    group.bench_function("variable_field_by_name", |b| {
        let cursor = Cursor::new(f.registry.clone(), f.order.clone(), &f.bytes).unwrap();
        b.iter(|| black_box(cursor.goto_name(black_box("Customer")).unwrap().serialized_size().unwrap()));
    });

    group.bench_function("variable_payload", |b| {
        let cursor = Cursor::new(f.registry.clone(), f.order.clone(), &f.bytes).unwrap();
        b.iter(|| black_box(cursor.navigate_to("Extra").unwrap().get().unwrap().into_owned()));
    });

    group.finish();
}

fn bench_list_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_access");

    for lines in [10, 100, 1000] {
        let f = fixture(lines);
        let cursor = Cursor::new(f.registry.clone(), f.order.clone(), &f.bytes).unwrap();
        let quantities = cursor.goto_name("Quantities").unwrap();
        let notes = cursor.goto_name("Notes").unwrap();

        group.bench_with_input(BenchmarkId::new("fixed_last", lines), &lines, |b, &n| {
            b.iter(|| black_box(quantities.goto(n - 1).unwrap().get().unwrap().into_owned()));
        });

        group.bench_with_input(BenchmarkId::new("variable_walk", lines), &lines, |b, _| {
            b.iter(|| {
                let mut total = 0usize;
                for note in notes.children() {
                    total += note.unwrap().serialized_size().unwrap();
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for lines in [10, 1000] {
        let f = fixture(lines);
        group.bench_with_input(BenchmarkId::new("freeze_and_write", lines), &f.record, |b, record| {
            b.iter(|| {
                let mut copy = record.clone_as_editable();
                copy.freeze().unwrap();
                black_box(copy.to_bytes().unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("copy_from_cursor", lines), &f.bytes, |b, bytes| {
            let factory = EditableFactory::new(f.registry.clone());
            b.iter(|| black_box(factory.from_bytes(f.order.clone(), bytes).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_field_access, bench_list_access, bench_write);
criterion_main!(benches);
