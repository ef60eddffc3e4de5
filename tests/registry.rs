//! # Registry Integration
//!
//! Built-in catalog, mutable registry and caching provider working together,
//! including concurrent registration and change notification.

use std::sync::Arc;
use std::thread;

use turrecord::config::FIRST_DYNAMIC_SCHEMA_ID;
use turrecord::registry::builtin;
use turrecord::{
    CachingSchemaProvider, Cursor, EditableFactory, FormatError, SchemaBuilder, SchemaKey,
    SchemaProvider, SchemaRegistry,
};

fn shape(registry: &SchemaRegistry, name: &str) -> turrecord::Schema {
    SchemaBuilder::class(name)
        .field("Width", registry.get_by_name("Int32").unwrap())
        .field("Height", registry.get_by_name("Int32").unwrap())
        .build()
        .unwrap()
}

#[test]
fn builtins_have_fixed_ids() {
    let registry = SchemaRegistry::new().unwrap();
    for (id, name) in [
        (builtin::VOID, "Void"),
        (builtin::INT32, "Int32"),
        (builtin::STRING, "String"),
        (builtin::VARIABLE, "Variable"),
        (builtin::MONEY, "Money"),
        (builtin::LIST_OF_VARIABLE, "ListOfVariable"),
        (builtin::LIST_OF_GUID, "ListOfGuid"),
    ] {
        let schema = registry.get_by_id(id).unwrap();
        assert_eq!(schema.name(), name);
        assert!(schema.is_builtin());
    }
}

#[test]
fn concurrent_adds_get_unique_ids() {
    let registry = Arc::new(SchemaRegistry::new().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        let schema = shape(&registry, &format!("Shape{}_{}", t, i));
                        registry.add(schema).unwrap().id()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 200);
    assert!(ids.iter().all(|id| *id >= FIRST_DYNAMIC_SCHEMA_ID));
    assert_eq!(registry.dynamic_len(), 200);
}

#[test]
fn cache_follows_removals() {
    let registry = Arc::new(SchemaRegistry::new().unwrap());
    let upstream: Vec<Arc<dyn SchemaProvider>> = vec![registry.clone()];
    let cache = CachingSchemaProvider::attached(upstream, registry.as_ref());

    let added = registry.add(shape(&registry, "Box")).unwrap();
    assert_eq!(cache.get_by_name("Box").unwrap().id(), added.id());
    assert!(cache.cached_len() >= 1);

    registry.remove_by_name("Box").unwrap();
    let err = cache.get_by_name("Box").unwrap_err();
    assert!(matches!(
        FormatError::of(&err),
        Some(FormatError::SchemaNotFound(SchemaKey::Name(name))) if name == "Box"
    ));

    // the name can be reused with a new shape
    let again = registry.add(shape(&registry, "Box")).unwrap();
    assert_ne!(again.id(), added.id());
    assert_eq!(cache.get_by_id(again.id()).unwrap().name(), "Box");
}

#[test]
fn records_resolve_payloads_through_cache() {
    let registry = Arc::new(SchemaRegistry::new().unwrap());
    let upstream: Vec<Arc<dyn SchemaProvider>> = vec![registry.clone()];
    let cache: Arc<dyn SchemaProvider> =
        CachingSchemaProvider::attached(upstream, registry.as_ref());
    let shape = registry.add(shape(&registry, "Tile")).unwrap();

    let factory = EditableFactory::new(cache.clone());
    let mut variable = factory.create_by_name("Variable", false).unwrap();
    variable.set_data_schema(shape).unwrap();
    variable.data_mut().unwrap().set_field("Width", 3).unwrap();
    let bytes = variable.to_bytes().unwrap();

    let cursor = Cursor::new(cache, variable.schema().clone(), &bytes).unwrap();
    assert_eq!(cursor.data_schema().unwrap().name(), "Tile");
    let payload = cursor.unwrap_variable().unwrap();
    assert_eq!(
        payload.navigate_to("Width").unwrap().get().unwrap(),
        turrecord::Value::Int32(3)
    );
}

#[test]
fn duplicate_and_missing_are_distinct_errors() {
    let registry = SchemaRegistry::new().unwrap();
    registry.add(shape(&registry, "Once")).unwrap();
    let err = registry.add(shape(&registry, "Once")).unwrap_err();
    assert!(matches!(
        FormatError::of(&err),
        Some(FormatError::DuplicateSchema(_))
    ));

    let err = registry.get_by_id(4242).unwrap_err();
    assert!(matches!(
        FormatError::of(&err),
        Some(FormatError::SchemaNotFound(SchemaKey::Id(4242)))
    ));
}
