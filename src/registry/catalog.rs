//! # Built-in Schema Catalog
//!
//! The read-only set of schemas every record may reference without
//! registration. Ids are stable and part of the wire format: a Variable field
//! stores the id of its payload schema.
//!
//! | Ids | Schemas |
//! |-----|---------|
//! | 0-11 | primitives: Void, Boolean, Int32, Int64, Float64, Decimal, DateTime, TimeSpan, Guid, String, Binary, ItemPath |
//! | 12-13 | Choice, MultiChoice with an empty option set |
//! | 100 | Variable `{DataSchemaId: Int32, Data: Binary?}` |
//! | 101-104 | Money, GeoPosition, Measurement, DateTimeOffset |
//! | 200-204 | ListOfVariable, ListOfInt32, ListOfInt64, ListOfString, ListOfGuid |

use std::sync::Arc;

use eyre::Result;
use hashbrown::HashMap;

use super::SchemaProvider;
use crate::schema::{ChoiceSet, Schema, SchemaBuilder, SchemaId};
use crate::types::DataType;

/// Ids of the built-in schemas.
pub mod builtin {
    use crate::schema::SchemaId;

    pub const VOID: SchemaId = 0;
    pub const BOOLEAN: SchemaId = 1;
    pub const INT32: SchemaId = 2;
    pub const INT64: SchemaId = 3;
    pub const FLOAT64: SchemaId = 4;
    pub const DECIMAL: SchemaId = 5;
    pub const DATE_TIME: SchemaId = 6;
    pub const TIME_SPAN: SchemaId = 7;
    pub const GUID: SchemaId = 8;
    pub const STRING: SchemaId = 9;
    pub const BINARY: SchemaId = 10;
    pub const ITEM_PATH: SchemaId = 11;
    pub const CHOICE: SchemaId = 12;
    pub const MULTI_CHOICE: SchemaId = 13;

    pub const VARIABLE: SchemaId = 100;
    pub const MONEY: SchemaId = 101;
    pub const GEO_POSITION: SchemaId = 102;
    pub const MEASUREMENT: SchemaId = 103;
    pub const DATE_TIME_OFFSET: SchemaId = 104;

    pub const LIST_OF_VARIABLE: SchemaId = 200;
    pub const LIST_OF_INT32: SchemaId = 201;
    pub const LIST_OF_INT64: SchemaId = 202;
    pub const LIST_OF_STRING: SchemaId = 203;
    pub const LIST_OF_GUID: SchemaId = 204;

    /// Field names of the Variable class.
    pub const VARIABLE_DATA_SCHEMA_ID_FIELD: &str = "DataSchemaId";
    pub const VARIABLE_DATA_FIELD: &str = "Data";
}

#[derive(Debug)]
pub struct SchemaCatalog {
    by_id: HashMap<SchemaId, Arc<Schema>>,
    by_name: HashMap<String, Arc<Schema>>,
}

impl SchemaCatalog {
    /// An empty catalog, for tests and custom setups.
    pub fn empty() -> Self {
        Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// The standard built-in catalog.
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::empty();

        let primitives = [
            (builtin::VOID, "Void", DataType::Void),
            (builtin::BOOLEAN, "Boolean", DataType::Boolean),
            (builtin::INT32, "Int32", DataType::Int32),
            (builtin::INT64, "Int64", DataType::Int64),
            (builtin::FLOAT64, "Float64", DataType::Float64),
            (builtin::DECIMAL, "Decimal", DataType::Decimal),
            (builtin::DATE_TIME, "DateTime", DataType::DateTime),
            (builtin::TIME_SPAN, "TimeSpan", DataType::TimeSpan),
            (builtin::GUID, "Guid", DataType::Guid),
            (builtin::STRING, "String", DataType::String),
            (builtin::BINARY, "Binary", DataType::Binary),
            (builtin::ITEM_PATH, "ItemPath", DataType::ItemPath),
        ];
        for (id, name, data_type) in primitives {
            catalog.insert(Schema::primitive(name, data_type)?.with_id(id));
        }

        let int32 = catalog.expect_id(builtin::INT32)?;
        let int64 = catalog.expect_id(builtin::INT64)?;
        let float64 = catalog.expect_id(builtin::FLOAT64)?;
        let decimal = catalog.expect_id(builtin::DECIMAL)?;
        let date_time = catalog.expect_id(builtin::DATE_TIME)?;
        let guid = catalog.expect_id(builtin::GUID)?;
        let string = catalog.expect_id(builtin::STRING)?;
        let binary = catalog.expect_id(builtin::BINARY)?;

        catalog.insert(
            SchemaBuilder::choice("Choice", ChoiceSet::default())
                .id(builtin::CHOICE)
                .build()?,
        );
        catalog.insert(
            SchemaBuilder::multi_choice("MultiChoice", ChoiceSet::default(), int32.clone())
                .id(builtin::MULTI_CHOICE)
                .build()?,
        );

        catalog.insert(
            SchemaBuilder::class("Variable")
                .field(builtin::VARIABLE_DATA_SCHEMA_ID_FIELD, int32.clone())
                .nullable_field(builtin::VARIABLE_DATA_FIELD, binary)
                .id(builtin::VARIABLE)
                .build()?,
        );
        catalog.insert(
            SchemaBuilder::class("Money")
                .field("Amount", decimal)
                .field("Currency", string.clone())
                .id(builtin::MONEY)
                .build()?,
        );
        catalog.insert(
            SchemaBuilder::class("GeoPosition")
                .field("Latitude", float64.clone())
                .field("Longitude", float64.clone())
                .id(builtin::GEO_POSITION)
                .build()?,
        );
        catalog.insert(
            SchemaBuilder::class("Measurement")
                .field("Value", float64)
                .field("Unit", string.clone())
                .id(builtin::MEASUREMENT)
                .build()?,
        );
        catalog.insert(
            SchemaBuilder::class("DateTimeOffset")
                .field("DateTime", date_time)
                .field("OffsetMinutes", int32.clone())
                .id(builtin::DATE_TIME_OFFSET)
                .build()?,
        );

        let variable = catalog.expect_id(builtin::VARIABLE)?;
        let lists = [
            (builtin::LIST_OF_VARIABLE, "ListOfVariable", variable),
            (builtin::LIST_OF_INT32, "ListOfInt32", int32),
            (builtin::LIST_OF_INT64, "ListOfInt64", int64),
            (builtin::LIST_OF_STRING, "ListOfString", string),
            (builtin::LIST_OF_GUID, "ListOfGuid", guid),
        ];
        for (id, name, item) in lists {
            catalog.insert(SchemaBuilder::list(name, item, false).id(id).build()?);
        }

        Ok(catalog)
    }

    /// Adds a schema to a catalog under construction.
    pub fn insert(&mut self, schema: Schema) -> Arc<Schema> {
        let schema = Arc::new(schema);
        self.by_id.insert(schema.id(), schema.clone());
        self.by_name.insert(schema.name().to_string(), schema.clone());
        schema
    }

    fn expect_id(&self, id: SchemaId) -> Result<Arc<Schema>> {
        self.get_by_id(id)
    }

    pub fn contains_id(&self, id: SchemaId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl SchemaProvider for SchemaCatalog {
    fn try_get_by_id(&self, id: SchemaId) -> Option<Arc<Schema>> {
        self.by_id.get(&id).cloned()
    }

    fn try_get_by_name(&self, name: &str) -> Option<Arc<Schema>> {
        self.by_name.get(name).cloned()
    }

    fn get_all(&self) -> Vec<Arc<Schema>> {
        let mut all: Vec<_> = self.by_id.values().cloned().collect();
        all.sort_by_key(|s| s.id());
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_resolve_both_ways() {
        let catalog = SchemaCatalog::builtin().unwrap();
        let int32 = catalog.get_by_id(builtin::INT32).unwrap();
        assert_eq!(int32.name(), "Int32");
        assert_eq!(catalog.get_by_name("Int32").unwrap().id(), builtin::INT32);
        assert!(catalog.get_all().iter().all(|s| s.is_builtin()));
    }

    #[test]
    fn variable_layout() {
        let catalog = SchemaCatalog::builtin().unwrap();
        let variable = catalog.get_by_id(builtin::VARIABLE).unwrap();
        let id_field = variable.field_by_name(builtin::VARIABLE_DATA_SCHEMA_ID_FIELD).unwrap();
        let data = variable.field_by_name(builtin::VARIABLE_DATA_FIELD).unwrap();
        assert_eq!(id_field.offset(), 0);
        assert_eq!(data.offset(), -1);
        assert!(data.is_nullable());
        assert_eq!(variable.null_bitmap_offset(), 4);
        assert_eq!(variable.variable_size_offset(), 5);
    }

    #[test]
    fn missing_lookup_carries_key() {
        let catalog = SchemaCatalog::builtin().unwrap();
        let err = catalog.get_by_id(4242).unwrap_err();
        assert_eq!(
            crate::error::FormatError::of(&err),
            Some(&crate::error::FormatError::SchemaNotFound(
                crate::error::SchemaKey::Id(4242)
            ))
        );
    }
}
