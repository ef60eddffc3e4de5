use std::sync::Arc;

use super::*;
use crate::error::FormatError;

fn prim(name: &str, data_type: DataType) -> Arc<Schema> {
    Arc::new(Schema::primitive(name, data_type).unwrap())
}

fn structural_reason(report: &eyre::Report) -> String {
    match FormatError::of(report) {
        Some(FormatError::Structural { reason, .. }) => reason.clone(),
        other => panic!("expected structural error, got {:?}", other),
    }
}

#[test]
fn primitive_layout_uses_intrinsic_size() {
    assert_eq!(prim("Int32", DataType::Int32).fixed_size(), 4);
    assert_eq!(prim("Decimal", DataType::Decimal).fixed_size(), 16);
    assert_eq!(prim("Void", DataType::Void).fixed_size(), 0);

    let text = prim("String", DataType::String);
    assert_eq!(text.fixed_size(), 0);
    assert!(text.is_variable_size());
    assert_eq!(text.null_bitmap_offset(), -1);
    assert_eq!(text.variable_size_offset(), -1);
}

#[test]
fn class_example_layout() {
    let schema = SchemaBuilder::class("Example")
        .field("a", prim("Int32", DataType::Int32))
        .nullable_field("b", prim("String", DataType::String))
        .build()
        .unwrap();

    let a = schema.field_by_name("a").unwrap();
    let b = schema.field_by_name("b").unwrap();
    assert_eq!((a.index(), a.offset()), (0, 0));
    assert_eq!((b.index(), b.offset()), (1, -1));
    assert_eq!(b.variable_slot(), Some(0));
    assert_eq!(schema.null_bitmap_offset(), 4);
    assert_eq!(schema.variable_size_offset(), 5);
    assert_eq!(schema.fixed_size(), 5);
    assert_eq!(schema.variable_field_count(), 1);
}

#[test]
fn class_partitions_fixed_before_variable() {
    let schema = SchemaBuilder::class("Mixed")
        .field("s", prim("String", DataType::String))
        .field("x", prim("Int64", DataType::Int64))
        .nullable_field("t", prim("String", DataType::String))
        .field("y", prim("Boolean", DataType::Boolean))
        .build()
        .unwrap();

    let order: Vec<_> = schema.fields().iter().map(|f| f.name()).collect();
    assert_eq!(order, vec!["x", "y", "s", "t"]);
    let offsets: Vec<_> = schema.fields().iter().map(|f| f.offset()).collect();
    assert_eq!(offsets, vec![0, 8, -1, -2]);
    assert_eq!(schema.null_bitmap_offset(), 9);
    assert_eq!(schema.variable_size_offset(), 10);
    assert_eq!(schema.fixed_size(), 10);
}

#[test]
fn all_fixed_class_has_no_variable_region() {
    let schema = SchemaBuilder::class("Point")
        .field("X", prim("Float64", DataType::Float64))
        .field("Y", prim("Float64", DataType::Float64))
        .build()
        .unwrap();
    assert_eq!(schema.fixed_size(), 16);
    assert_eq!(schema.null_bitmap_offset(), -1);
    assert_eq!(schema.variable_size_offset(), -1);
    assert!(!schema.is_variable_size());
}

#[test]
fn layout_is_idempotent() {
    let mut schema = SchemaBuilder::class("Twice")
        .field("s", prim("String", DataType::String))
        .nullable_field("n", prim("Int32", DataType::Int32))
        .field("g", prim("Guid", DataType::Guid))
        .build()
        .unwrap();

    let snapshot = |s: &Schema| {
        (
            s.fixed_size(),
            s.null_bitmap_offset(),
            s.variable_size_offset(),
            s.fields()
                .iter()
                .map(|f| (f.name().to_string(), f.index(), f.offset()))
                .collect::<Vec<_>>(),
        )
    };
    let first = snapshot(&schema);
    schema.update_layout().unwrap();
    assert_eq!(first, snapshot(&schema));
}

#[test]
fn primitive_with_fields_is_structural_error() {
    let err = Schema::new(
        "Broken",
        DataType::Int32,
        vec![Field::new("x", prim("Int32", DataType::Int32), false)],
    )
    .unwrap_err();
    assert!(structural_reason(&err).contains("cannot have fields"));
}

#[test]
fn list_requires_exactly_one_item() {
    let int32 = prim("Int32", DataType::Int32);
    let err = Schema::new(
        "TwoItems",
        DataType::List,
        vec![
            Field::item(int32.clone(), false),
            Field::item(int32.clone(), false),
        ],
    )
    .unwrap_err();
    assert!(structural_reason(&err).contains("exactly one"));

    let err = Schema::new("NoItems", DataType::List, Vec::new()).unwrap_err();
    assert!(structural_reason(&err).contains("found 0"));
}

#[test]
fn list_layout_is_variable() {
    let list = SchemaBuilder::list("Ints", prim("Int32", DataType::Int32), false)
        .build()
        .unwrap();
    assert!(list.is_variable_size());
    assert_eq!(list.item_field().unwrap().offset(), -1);
    assert_eq!(list.item_field().unwrap().name(), field::LIST_ITEM_FIELD);
}

#[test]
fn multi_choice_requires_int32_items() {
    let err = SchemaBuilder::multi_choice("Tags", ChoiceSet::default(), prim("S", DataType::String))
        .build()
        .unwrap_err();
    assert!(structural_reason(&err).contains("Int32"));
}

#[test]
fn duplicate_field_names_rejected() {
    let err = SchemaBuilder::class("Dup")
        .field("a", prim("Int32", DataType::Int32))
        .field("a", prim("Int64", DataType::Int64))
        .build()
        .unwrap_err();
    assert!(structural_reason(&err).contains("duplicate"));
}

#[test]
fn stale_layout_detected_until_update() {
    let mut schema = SchemaBuilder::class("Evolving")
        .field("a", prim("Int32", DataType::Int32))
        .build()
        .unwrap();
    schema.add_field(Field::new("b", prim("String", DataType::String), true));
    assert!(!schema.is_layout_current());

    let err = schema.ensure_layout().unwrap_err();
    assert!(matches!(FormatError::of(&err), Some(FormatError::StaleLayout(_))));

    let stale = Arc::new(schema.clone());
    let err = SchemaBuilder::class("Outer")
        .field("inner", stale)
        .build()
        .unwrap_err();
    assert!(matches!(FormatError::of(&err), Some(FormatError::StaleLayout(_))));

    schema.update_layout().unwrap();
    assert!(schema.is_layout_current());
    assert_eq!(schema.variable_size_offset(), 5);

    schema.remove_field("b").unwrap();
    assert!(!schema.is_layout_current());
}

#[test]
fn registered_schemas_compare_by_id() {
    let a = Schema::primitive("A", DataType::Int32).unwrap().with_id(5000);
    let b = Schema::primitive("B", DataType::String).unwrap().with_id(5000);
    let c = Schema::primitive("A", DataType::Int32).unwrap().with_id(5001);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn unregistered_schemas_need_name_and_structure() {
    let a = SchemaBuilder::class("P")
        .field("x", prim("Int32", DataType::Int32))
        .build()
        .unwrap();
    let same = SchemaBuilder::class("P")
        .field("x", prim("Int32", DataType::Int32))
        .build()
        .unwrap();
    let different_shape = SchemaBuilder::class("P")
        .nullable_field("x", prim("Int32", DataType::Int32))
        .build()
        .unwrap();
    let different_name = SchemaBuilder::class("Q")
        .field("x", prim("Int32", DataType::Int32))
        .build()
        .unwrap();

    assert_eq!(a, same);
    assert_ne!(a, different_shape);
    assert_ne!(a, different_name);
    assert!(same_schema(&Arc::new(a.clone()), &Arc::new(same)));
}

#[test]
fn choice_schema_carries_declaration() {
    let set = ChoiceSet::new(vec![ChoiceOption::new(1, "Low"), ChoiceOption::new(2, "High")]);
    let schema = SchemaBuilder::choice("Priority", set).build().unwrap();
    assert_eq!(schema.fixed_size(), 4);
    assert_eq!(schema.choice_set().unwrap().option_by_name("high").unwrap().value, 2);
}
