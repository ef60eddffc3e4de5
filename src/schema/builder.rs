//! # Schema Builder
//!
//! Fluent construction of Class, List and Choice schemas. `build()` runs the
//! layout pass, so a built schema is always ready for cursors and editables.
//!
//! ```ignore
//! let person = SchemaBuilder::class("Person")
//!     .field("Age", catalog.get_by_name("Int32")?)
//!     .nullable_field("Nickname", catalog.get_by_name("String")?)
//!     .build()?;
//! ```
//!
//! The builder is a plain value; it holds no registry handle and assigns no
//! id unless [`SchemaBuilder::id`] is called. Registration is the job of
//! [`SchemaRegistry::add`](crate::registry::SchemaRegistry::add).

use std::sync::Arc;

use eyre::Result;

use super::{ChoiceSet, Declaration, Field, Schema, SchemaId};
use crate::config::UNREGISTERED_SCHEMA_ID;
use crate::types::DataType;

pub struct SchemaBuilder {
    name: String,
    data_type: DataType,
    fields: Vec<Field>,
    id: SchemaId,
    declaration: Option<Declaration>,
}

impl SchemaBuilder {
    fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            fields: Vec::new(),
            id: UNREGISTERED_SCHEMA_ID,
            declaration: None,
        }
    }

    /// Starts a Class schema with no fields.
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Class)
    }

    /// Starts a List schema over `item`.
    pub fn list(name: impl Into<String>, item: Arc<Schema>, nullable_items: bool) -> Self {
        let mut builder = Self::new(name, DataType::List);
        builder.fields.push(Field::item(item, nullable_items));
        builder
    }

    /// Starts a single-select Choice schema backed by `set`.
    pub fn choice(name: impl Into<String>, set: ChoiceSet) -> Self {
        let mut builder = Self::new(name, DataType::Choice);
        builder.declaration = Some(Declaration::Choices(Arc::new(set)));
        builder
    }

    /// Starts a MultiChoice schema; `int32` must be an Int32 schema.
    pub fn multi_choice(name: impl Into<String>, set: ChoiceSet, int32: Arc<Schema>) -> Self {
        let mut builder = Self::new(name, DataType::MultiChoice);
        builder.fields.push(Field::item(int32, false));
        builder.declaration = Some(Declaration::Choices(Arc::new(set)));
        builder
    }

    pub fn field(mut self, name: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.fields.push(Field::new(name, schema, false));
        self
    }

    pub fn nullable_field(mut self, name: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.fields.push(Field::new(name, schema, true));
        self
    }

    /// Adds a prepared field, e.g. one carrying a `max_length`.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn id(mut self, id: SchemaId) -> Self {
        self.id = id;
        self
    }

    pub fn declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut schema = Schema::new(self.name, self.data_type, self.fields)?;
        schema.id = self.id;
        schema.declaration = self.declaration;
        Ok(schema)
    }

    /// Builds and wraps the schema for sharing.
    pub fn build_arc(self) -> Result<Arc<Schema>> {
        self.build().map(Arc::new)
    }
}
