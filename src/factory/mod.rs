//! # Editable Factory
//!
//! The three ways to obtain an [`Editable`] tree:
//!
//! | Source | Method | Result |
//! |--------|--------|--------|
//! | a schema | [`EditableFactory::create`] | default-valued tree |
//! | serialized bytes | [`EditableFactory::from_cursor`] | deep copy, Variables bound |
//! | JSON text | [`EditableFactory::from_json`] | tree built while tokens are read |
//!
//! Every path yields a tree that, frozen and written, decodes through a
//! [`Cursor`] to the same logical value it was built from.
//!
//! ```ignore
//! let factory = EditableFactory::new(registry.clone());
//! let mut person = factory.create_by_name("Person", false)?;
//! person.set_field("Age", 42)?;
//! let bytes = person.to_bytes()?;
//!
//! let cursor = Cursor::new(registry.clone(), person.schema().clone(), &bytes)?;
//! let copy = factory.from_cursor(&cursor)?;
//! ```

mod from_cursor;
mod from_json;

use std::sync::Arc;

use eyre::Result;

use crate::cursor::Cursor;
use crate::editable::Editable;
use crate::registry::SchemaProvider;
use crate::schema::Schema;

pub(crate) use from_cursor::copy_cursor;

pub struct EditableFactory {
    provider: Arc<dyn SchemaProvider>,
}

impl EditableFactory {
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn SchemaProvider> {
        &self.provider
    }

    /// A fresh tree for `schema`: null when `nullable`, defaulted otherwise.
    pub fn create(&self, schema: Arc<Schema>, nullable: bool) -> Result<Editable> {
        let name = schema.name().to_string();
        Editable::with_defaults(&self.provider, schema, nullable, name)
    }

    pub fn create_by_name(&self, name: &str, nullable: bool) -> Result<Editable> {
        let schema = self.provider.get_by_name(name)?;
        self.create(schema, nullable)
    }

    /// Deep copy of the value under `cursor`.
    pub fn from_cursor(&self, cursor: &Cursor<'_>) -> Result<Editable> {
        copy_cursor(cursor, cursor.schema().name(), cursor.is_null())
    }

    /// Decodes `bytes` as a record of `schema` and copies it.
    pub fn from_bytes(&self, schema: Arc<Schema>, bytes: &[u8]) -> Result<Editable> {
        let cursor = Cursor::new(self.provider.clone(), schema, bytes)?;
        self.from_cursor(&cursor)
    }

    /// Builds a tree of `schema` from JSON text in the cursor's projection.
    pub fn from_json(&self, schema: Arc<Schema>, text: &str) -> Result<Editable> {
        from_json::read_json(&self.provider, schema, text)
    }
}

#[cfg(test)]
mod tests;
