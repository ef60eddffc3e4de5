use std::sync::Arc;

use super::*;
use crate::editable::EditableKind;
use crate::error::FormatError;
use crate::registry::SchemaRegistry;
use crate::schema::SchemaBuilder;
use crate::types::Value;

fn setup() -> (Arc<SchemaRegistry>, EditableFactory) {
    let registry = Arc::new(SchemaRegistry::new().unwrap());
    let factory = EditableFactory::new(registry.clone());
    (registry, factory)
}

fn person(registry: &SchemaRegistry) -> Arc<Schema> {
    let schema = SchemaBuilder::class("Person")
        .field("Age", registry.get_by_name("Int32").unwrap())
        .nullable_field("Name", registry.get_by_name("String").unwrap())
        .field("Tags", registry.get_by_name("ListOfString").unwrap())
        .nullable_field("Extra", registry.get_by_name("Variable").unwrap())
        .build()
        .unwrap();
    registry.add(schema).unwrap()
}

fn format_error(report: &eyre::Report) -> &FormatError {
    FormatError::of(report).unwrap_or_else(|| panic!("not a format error: {:?}", report))
}

#[test]
fn create_fills_defaults() {
    let (registry, factory) = setup();
    let record = factory.create(person(&registry), false).unwrap();

    assert_eq!(record.name(), "Person");
    assert_eq!(record.field("Age").unwrap().get().unwrap(), Value::Int32(0));
    assert!(record.field("Name").unwrap().is_null());
    assert!(record.field("Tags").unwrap().is_empty());
    assert!(record.field("Extra").unwrap().is_null());
}

#[test]
fn create_nullable_starts_null() {
    let (_registry, factory) = setup();
    let money = factory.create_by_name("Money", true).unwrap();
    assert!(money.is_null());
    assert_eq!(money.kind(), EditableKind::Object);

    let err = factory.create_by_name("Nope", false).unwrap_err();
    assert!(matches!(format_error(&err), FormatError::SchemaNotFound(_)));
}

#[test]
fn cursor_copy_round_trips() {
    let (registry, factory) = setup();
    let schema = person(&registry);
    let mut record = factory.create(schema.clone(), false).unwrap();
    record.set_field("Age", 30).unwrap();
    record.set_field("Name", "Kim").unwrap();
    let tags = record.field_mut("Tags").unwrap();
    tags.push_value("a").unwrap();
    tags.push_value("bc").unwrap();
    record.set_field("Extra", 2.5).unwrap();
    let bytes = record.to_bytes().unwrap();

    let copy = factory.from_bytes(schema, &bytes).unwrap();
    assert!(!copy.is_frozen());
    let extra = copy.field("Extra").unwrap();
    assert_eq!(extra.data_schema().unwrap().name(), "Float64");
    assert!(extra.data().is_some());
    assert_eq!(copy.to_bytes().unwrap(), bytes);
    assert_eq!(copy.to_json().unwrap(), record.to_json().unwrap());
}

#[test]
fn serialized_payload_is_materialized_on_demand() {
    let (registry, factory) = setup();
    let variable_schema = registry.get_by_name("Variable").unwrap();
    let bytes = [2, 0, 0, 0, 0b10, 22, 14, 7, 0, 0, 0];
    let cursor = Cursor::new(registry.clone(), variable_schema.clone(), &bytes).unwrap();
    let payload = cursor.clone().unwrap_variable().unwrap();

    let mut variable = factory.create(variable_schema, false).unwrap();
    variable.set_data_cursor(&payload).unwrap();
    assert!(variable.data_cursor().is_some());
    assert_eq!(variable.to_bytes().unwrap(), bytes.to_vec());

    variable.data_mut().unwrap().set(8).unwrap();
    assert!(variable.data_cursor().is_none());
    assert_eq!(variable.get().unwrap(), Value::Int32(8));
}

#[test]
fn json_builds_class() {
    let (registry, factory) = setup();
    let schema = person(&registry);
    let text = r#"{
        "@schema": "Person",
        "Age": 41,
        "Name": "Lee",
        "Tags": ["x", "y"],
        "Extra": {"@schema": "Variable", "@dataSchema": "Int64", "@data": 9007199254740993}
    }"#;
    let record = factory.from_json(schema.clone(), text).unwrap();

    assert_eq!(record.field("Age").unwrap().get().unwrap(), Value::Int32(41));
    assert_eq!(record.field("Tags").unwrap().len(), 2);
    assert_eq!(
        record.field("Extra").unwrap().get().unwrap(),
        Value::Int64(9_007_199_254_740_993)
    );

    let reparsed = factory
        .from_json(schema, &record.to_json_string().unwrap())
        .unwrap();
    assert_eq!(reparsed.to_bytes().unwrap(), record.to_bytes().unwrap());
}

#[test]
fn json_skips_unknown_members() {
    let (registry, factory) = setup();
    let schema = person(&registry);
    let text = r#"{"Age": 3, "Legacy": {"deep": [1, {"x": null}]}, "Name": null}"#;
    let record = factory.from_json(schema, text).unwrap();
    assert_eq!(record.field("Age").unwrap().get().unwrap(), Value::Int32(3));
    assert!(record.field("Name").unwrap().is_null());
}

#[test]
fn json_variable_payload() {
    let (registry, factory) = setup();
    let variable = registry.get_by_name("Variable").unwrap();
    let record = factory
        .from_json(
            variable,
            r#"{"@schema":"Variable","@dataSchema":"Int32","@data":7}"#,
        )
        .unwrap();
    assert_eq!(
        record.to_bytes().unwrap(),
        vec![2, 0, 0, 0, 0b10, 22, 14, 7, 0, 0, 0]
    );
}

#[test]
fn json_data_before_data_schema_fails() {
    let (registry, factory) = setup();
    let variable = registry.get_by_name("Variable").unwrap();
    let err = factory
        .from_json(variable, r#"{"@data":7,"@dataSchema":"Int32"}"#)
        .unwrap_err();
    assert!(matches!(format_error(&err), FormatError::Json(_)));
}

#[test]
fn json_schema_mismatch_fails() {
    let (registry, factory) = setup();
    let schema = person(&registry);
    let err = factory
        .from_json(schema, r#"{"@schema":"Animal","Age":1}"#)
        .unwrap_err();
    assert!(matches!(format_error(&err), FormatError::Json(message) if message.contains("Animal")));
}

#[test]
fn json_null_for_required_field_fails() {
    let (registry, factory) = setup();
    let schema = person(&registry);
    let err = factory.from_json(schema.clone(), r#"{"Age":null}"#).unwrap_err();
    assert!(matches!(format_error(&err), FormatError::NotNullable(name) if name == "Age"));

    let root = factory.from_json(schema, "null").unwrap();
    assert!(root.is_null());
}

#[test]
fn json_nesting_is_bounded() {
    let (registry, factory) = setup();
    let variable = registry.get_by_name("Variable").unwrap();
    let levels = 40;
    let mut text = String::new();
    for _ in 0..levels {
        text.push_str(r#"{"@dataSchema":"ListOfVariable","@data":["#);
    }
    text.push_str("{}");
    for _ in 0..levels {
        text.push_str("]}");
    }
    let err = factory.from_json(variable, &text).unwrap_err();
    assert!(matches!(format_error(&err), FormatError::NestingTooDeep(_)));
}

#[test]
fn json_trailing_tokens_fail() {
    let (registry, factory) = setup();
    let int32 = registry.get_by_name("Int32").unwrap();
    assert!(factory.from_json(int32.clone(), "5").is_ok());
    let err = factory.from_json(int32, "5 6").unwrap_err();
    assert!(matches!(format_error(&err), FormatError::Json(_)));
}
