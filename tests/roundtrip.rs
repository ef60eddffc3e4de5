//! # Editable / Cursor Round Trip
//!
//! Trees built through the editable API, written, then read back through a
//! cursor must present the same logical value; copying the cursor back into
//! a tree must reproduce the same bytes.

use std::sync::Arc;

use proptest::prelude::*;
use turrecord::{
    Cursor, EditableFactory, FieldAccess, Schema, SchemaBuilder, SchemaProvider, SchemaRegistry,
    Value,
};

#[derive(Debug, Clone)]
struct Sample {
    id: i64,
    score: f64,
    name: Option<String>,
    tags: Vec<String>,
    extra: Option<i32>,
    blob: Vec<u8>,
}

fn sample() -> impl Strategy<Value = Sample> {
    (
        any::<i64>(),
        -1.0e6f64..1.0e6,
        proptest::option::of("[a-zA-Z0-9 ]{0,40}"),
        proptest::collection::vec("[a-z]{0,12}", 0..20),
        proptest::option::of(any::<i32>()),
        proptest::collection::vec(any::<u8>(), 0..300),
    )
        .prop_map(|(id, score, name, tags, extra, blob)| Sample {
            id,
            score,
            name,
            tags,
            extra,
            blob,
        })
}

fn setup() -> (Arc<SchemaRegistry>, Arc<Schema>, EditableFactory) {
    let registry = Arc::new(SchemaRegistry::new().unwrap());
    let get = |name: &str| registry.get_by_name(name).unwrap();
    let schema = SchemaBuilder::class("Sample")
        .field("Id", get("Int64"))
        .field("Score", get("Float64"))
        .nullable_field("Name", get("String"))
        .field("Tags", get("ListOfString"))
        .nullable_field("Extra", get("Variable"))
        .field("Blob", get("Binary"))
        .build()
        .unwrap();
    let schema = registry.add(schema).unwrap();
    let factory = EditableFactory::new(registry.clone());
    (registry, schema, factory)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn write_read_copy(sample in sample()) {
        let (registry, schema, factory) = setup();
        let mut record = factory.create(schema.clone(), false).unwrap();
        record.set_field("Id", sample.id).unwrap();
        record.set_field("Score", sample.score).unwrap();
        record.set_field("Name", sample.name.clone()).unwrap();
        for tag in &sample.tags {
            record.field_mut("Tags").unwrap().push_value(tag.as_str()).unwrap();
        }
        if let Some(extra) = sample.extra {
            record.set_field("Extra", extra).unwrap();
        }
        record.set_field("Blob", sample.blob.as_slice()).unwrap();
        record.freeze().unwrap();
        let bytes = record.to_bytes().unwrap();
        prop_assert_eq!(bytes.len(), record.serialized_size().unwrap());

        let cursor = Cursor::new(registry.clone(), schema.clone(), &bytes).unwrap();
        prop_assert_eq!(cursor.serialized_size().unwrap(), bytes.len());
        prop_assert_eq!(cursor.get_field("Id").unwrap(), Value::Int64(sample.id));
        prop_assert_eq!(cursor.get_field("Score").unwrap(), Value::Float64(sample.score));
        prop_assert_eq!(
            cursor.get_field("Name").unwrap(),
            sample.name.clone().map_or(Value::Null, |name| Value::string(name))
        );
        let tags = cursor.goto_name("Tags").unwrap();
        prop_assert_eq!(tags.count().unwrap(), sample.tags.len());
        for (i, tag) in sample.tags.iter().enumerate() {
            let item = tags.goto(i).unwrap();
            prop_assert_eq!(item.get().unwrap(), Value::from(tag.as_str()));
        }
        let extra = cursor.goto_name("Extra").unwrap();
        prop_assert_eq!(
            extra.get().unwrap(),
            sample.extra.map_or(Value::Null, Value::Int32)
        );
        prop_assert_eq!(
            cursor.get_field("Blob").unwrap(),
            Value::binary(sample.blob.clone())
        );

        let copy = factory.from_cursor(&cursor).unwrap();
        prop_assert_eq!(copy.to_bytes().unwrap(), bytes.clone());
        prop_assert_eq!(copy.to_json().unwrap(), cursor.to_json().unwrap());

        let from_json = factory
            .from_json(schema.clone(), &cursor.to_json_string().unwrap())
            .unwrap();
        prop_assert_eq!(from_json.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn null_bits_follow_presence(names in proptest::collection::vec(proptest::option::of("[a-z]{1,8}"), 1..12)) {
        let registry = Arc::new(SchemaRegistry::new().unwrap());
        let string = registry.get_by_name("String").unwrap();
        let mut builder = SchemaBuilder::class("Sparse");
        for i in 0..names.len() {
            builder = builder.nullable_field(format!("f{}", i), string.clone());
        }
        let schema = builder.build_arc().unwrap();
        let factory = EditableFactory::new(registry.clone());

        let mut record = factory.create(schema.clone(), false).unwrap();
        for (i, name) in names.iter().enumerate() {
            record.set_field(&format!("f{}", i), name.clone()).unwrap();
        }
        let bytes = record.to_bytes().unwrap();
        let cursor = Cursor::new(registry.clone(), schema, &bytes).unwrap();
        for (i, name) in names.iter().enumerate() {
            let field = cursor.goto(i).unwrap();
            prop_assert_eq!(field.is_null(), name.is_none());
        }
    }
}

#[test]
fn large_list_switches_header_width() {
    let (registry, _schema, factory) = setup();
    let list_schema = registry.get_by_name("ListOfString").unwrap();
    let mut list = factory.create(list_schema.clone(), false).unwrap();
    let item = "x".repeat(100);
    for _ in 0..200 {
        list.push_value(item.as_str()).unwrap();
    }
    let bytes = list.to_bytes().unwrap();
    // 200 items of 1 + 100 bytes push the header to 4-byte varints
    assert_eq!(bytes.len(), 8 + 200 * 101);
    assert_eq!(bytes[0] & 0b11, 0b11);

    let cursor = Cursor::new(registry.clone(), list_schema, &bytes).unwrap();
    assert_eq!(cursor.count().unwrap(), 200);
    assert_eq!(cursor.goto(199).unwrap().get().unwrap(), Value::from(item.as_str()));
    assert_eq!(cursor.children().count(), 200);
}

#[test]
fn fixed_items_are_random_access() {
    let (registry, _schema, factory) = setup();
    let list_schema = registry.get_by_name("ListOfInt64").unwrap();
    let mut list = factory.create(list_schema.clone(), false).unwrap();
    for n in 0..1000i64 {
        list.push_value(n * 3).unwrap();
    }
    let bytes = list.to_bytes().unwrap();
    let cursor = Cursor::new(registry.clone(), list_schema, &bytes).unwrap();
    let last = cursor.goto(999).unwrap();
    assert_eq!(last.get().unwrap(), Value::Int64(2997));
    assert_eq!(last.offset(), bytes.len() - 8);
}

#[test]
fn layout_is_deterministic() {
    let registry = Arc::new(SchemaRegistry::new().unwrap());
    let build = || {
        SchemaBuilder::class("Twice")
            .nullable_field("a", registry.get_by_name("String").unwrap())
            .field("b", registry.get_by_name("Int32").unwrap())
            .nullable_field("c", registry.get_by_name("Guid").unwrap())
            .build()
            .unwrap()
    };
    let (first, second) = (build(), build());
    for (x, y) in first.fields().iter().zip(second.fields()) {
        assert_eq!((x.index(), x.offset()), (y.index(), y.offset()));
    }
    assert_eq!(first.fixed_size(), second.fixed_size());
    assert_eq!(first.null_bitmap_offset(), second.null_bitmap_offset());
}
