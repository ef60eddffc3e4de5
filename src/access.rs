//! Named field reads shared by both views of a record.
//!
//! Code that only inspects field values can take `&impl FieldAccess` and work
//! the same over bytes (a [`Cursor`]) and over a tree being built (an
//! [`Editable`]). A null record yields `Value::Null` for every declared
//! field; undeclared names are `UnknownField` either way. Variables are
//! looked through to their payload.

use eyre::Result;

use crate::cursor::{is_variable, Cursor};
use crate::editable::Editable;
use crate::error::FormatError;
use crate::schema::Schema;
use crate::types::{DataType, Value};

pub trait FieldAccess {
    fn get_field(&self, name: &str) -> Result<Value<'_>>;

    fn try_get_field(&self, name: &str) -> Option<Value<'_>> {
        self.get_field(name).ok()
    }
}

fn check_declared(schema: &Schema, name: &str) -> Result<()> {
    if schema.data_type() != DataType::Class || schema.field_index(name).is_none() {
        return Err(eyre::Report::new(FormatError::UnknownField {
            schema: schema.name().to_string(),
            field: name.to_string(),
        }));
    }
    Ok(())
}

impl FieldAccess for Cursor<'_> {
    fn get_field(&self, name: &str) -> Result<Value<'_>> {
        if is_variable(self.schema()) && !self.is_null() {
            let payload = self.clone().unwrap_variable()?;
            return payload.get_field(name).map(Value::into_owned);
        }
        check_declared(self.schema(), name)?;
        if self.is_null() {
            return Ok(Value::Null);
        }
        // the child cursor is a temporary, so its value is detached
        self.goto_name(name)?.get().map(Value::into_owned)
    }
}

impl FieldAccess for Editable {
    fn get_field(&self, name: &str) -> Result<Value<'_>> {
        if let Some(payload) = self.data() {
            return payload.get_field(name);
        }
        if let Some(cursor) = self.data_cursor() {
            return cursor.get_field(name).map(Value::into_owned);
        }
        check_declared(self.schema(), name)?;
        if self.is_null() {
            return Ok(Value::Null);
        }
        self.field(name)?.get()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::factory::EditableFactory;
    use crate::registry::{SchemaProvider, SchemaRegistry};
    use crate::schema::SchemaBuilder;

    fn describe(record: &impl FieldAccess) -> String {
        match (record.get_field("Name"), record.get_field("Age")) {
            (Ok(name), Ok(age)) => format!("{} ({})", name, age),
            _ => "?".to_string(),
        }
    }

    #[test]
    fn cursor_and_editable_agree() {
        let registry = Arc::new(SchemaRegistry::new().unwrap());
        let schema = SchemaBuilder::class("Person")
            .nullable_field("Name", registry.get_by_name("String").unwrap())
            .field("Age", registry.get_by_name("Int32").unwrap())
            .build()
            .unwrap();
        let schema = registry.add(schema).unwrap();
        let factory = EditableFactory::new(registry.clone());

        let mut record = factory.create(schema.clone(), false).unwrap();
        record.set_field("Name", "Noor").unwrap();
        record.set_field("Age", 28).unwrap();
        let bytes = record.to_bytes().unwrap();
        let cursor = Cursor::new(registry.clone(), schema, &bytes).unwrap();

        assert_eq!(describe(&record), describe(&cursor));
        assert_eq!(cursor.get_field("Age").unwrap(), Value::Int32(28));
        assert!(record.try_get_field("Height").is_none());
        let err = cursor.get_field("Height").unwrap_err();
        assert!(matches!(
            FormatError::of(&err),
            Some(FormatError::UnknownField { .. })
        ));
    }

    #[test]
    fn null_record_reads_null_fields() {
        let registry = Arc::new(SchemaRegistry::new().unwrap());
        let factory = EditableFactory::new(registry.clone());
        let money = factory.create_by_name("Money", true).unwrap();
        assert_eq!(money.get_field("Currency").unwrap(), Value::Null);
        assert!(money.get_field("Color").is_err());
    }

    #[test]
    fn variable_is_looked_through() {
        let registry = Arc::new(SchemaRegistry::new().unwrap());
        let factory = EditableFactory::new(registry.clone());
        let mut variable = factory.create_by_name("Variable", false).unwrap();
        variable
            .set_data_schema(registry.get_by_name("GeoPosition").unwrap())
            .unwrap();
        variable
            .data_mut()
            .unwrap()
            .set_field("Latitude", 12.5)
            .unwrap();

        assert_eq!(variable.get_field("Latitude").unwrap(), Value::Float64(12.5));
        let bytes = variable.to_bytes().unwrap();
        let cursor = Cursor::new(registry.clone(), variable.schema().clone(), &bytes).unwrap();
        assert_eq!(cursor.get_field("Latitude").unwrap(), Value::Float64(12.5));
    }
}
