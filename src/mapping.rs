//! # Type Mapping Boundary
//!
//! Connects application types to schemas without reflection. A type opts in
//! by implementing [`RecordCodec`], which names its schema and converts
//! between the type and the record views explicitly. [`TypeMapRegistry`]
//! keeps the bidirectional `TypeId` <-> schema map that
//! [`SchemaTypeMap`] exposes.
//!
//! ```ignore
//! let types = TypeMapRegistry::new(registry.clone());
//! types.register::<Point>()?;
//! let bytes = types.to_bytes(&Point { x: 1, y: 2 })?;
//! let point: Point = types.from_bytes(&bytes)?;
//! ```

use std::any::{type_name, TypeId};
use std::sync::Arc;

use eyre::{bail, Result};
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::cursor::Cursor;
use crate::editable::Editable;
use crate::error::FormatError;
use crate::factory::EditableFactory;
use crate::registry::SchemaProvider;
use crate::schema::{same_schema, Schema, SchemaId};

/// Explicit conversion between a Rust type and its record form.
pub trait RecordCodec: Sized + 'static {
    /// Registered name of the schema this type maps to.
    const SCHEMA_NAME: &'static str;

    /// Writes `self` into a default-valued tree of the mapped schema.
    fn encode(&self, record: &mut Editable) -> Result<()>;

    fn decode(cursor: &Cursor<'_>) -> Result<Self>;
}

pub trait SchemaTypeMap: Send + Sync {
    fn try_get_schema_for_type(&self, type_id: TypeId) -> Option<Arc<Schema>>;

    fn try_get_type_for_schema(&self, schema: &Schema) -> Option<TypeId>;
}

#[derive(Default)]
struct TypeMaps {
    by_type: HashMap<TypeId, SchemaId>,
    by_schema: HashMap<SchemaId, TypeId>,
}

pub struct TypeMapRegistry {
    factory: EditableFactory,
    maps: RwLock<TypeMaps>,
}

impl TypeMapRegistry {
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Self {
        Self {
            factory: EditableFactory::new(provider),
            maps: RwLock::new(TypeMaps::default()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn SchemaProvider> {
        self.factory.provider()
    }

    /// Maps `T` to its registered schema. Re-registering a type is a no-op;
    /// a schema already mapped to another type is a `DuplicateSchema`.
    pub fn register<T: RecordCodec>(&self) -> Result<Arc<Schema>> {
        let schema = self.provider().get_by_name(T::SCHEMA_NAME)?;
        if !schema.is_registered() {
            bail!(FormatError::InvalidData(format!(
                "schema '{}' has no id",
                schema.name()
            )));
        }
        let type_id = TypeId::of::<T>();
        let mut maps = self.maps.write();
        match maps.by_schema.get(&schema.id()) {
            Some(existing) if *existing == type_id => return Ok(schema),
            Some(_) => bail!(FormatError::DuplicateSchema(schema.name().to_string())),
            None => {}
        }
        if let Some(previous) = maps.by_type.insert(type_id, schema.id()) {
            maps.by_schema.remove(&previous);
        }
        maps.by_schema.insert(schema.id(), type_id);
        drop(maps);

        debug!(rust_type = type_name::<T>(), schema = schema.name(), "mapped type");
        Ok(schema)
    }

    fn schema_of<T: RecordCodec>(&self) -> Result<Arc<Schema>> {
        let id = self.maps.read().by_type.get(&TypeId::of::<T>()).copied();
        match id {
            Some(id) => self.provider().get_by_id(id),
            None => bail!(FormatError::InvalidData(format!(
                "type {} is not mapped to a schema",
                type_name::<T>()
            ))),
        }
    }

    /// An unfrozen tree holding `value`.
    pub fn to_editable<T: RecordCodec>(&self, value: &T) -> Result<Editable> {
        let schema = self.schema_of::<T>()?;
        let mut record = self.factory.create(schema, false)?;
        value.encode(&mut record)?;
        Ok(record)
    }

    pub fn to_bytes<T: RecordCodec>(&self, value: &T) -> Result<Vec<u8>> {
        let mut record = self.to_editable(value)?;
        record.freeze()?;
        record.to_bytes()
    }

    /// Decodes a `T` from a cursor whose schema is the one mapped to `T`.
    pub fn from_cursor<T: RecordCodec>(&self, cursor: &Cursor<'_>) -> Result<T> {
        let schema = self.schema_of::<T>()?;
        if !same_schema(&schema, cursor.schema()) {
            bail!(FormatError::TypeMismatch {
                schema: cursor.schema().name().to_string(),
                actual: cursor.schema().data_type(),
                expected: T::SCHEMA_NAME,
            });
        }
        T::decode(cursor)
    }

    pub fn from_bytes<T: RecordCodec>(&self, bytes: &[u8]) -> Result<T> {
        let schema = self.schema_of::<T>()?;
        let cursor = Cursor::new(self.provider().clone(), schema, bytes)?;
        T::decode(&cursor)
    }
}

impl SchemaTypeMap for TypeMapRegistry {
    fn try_get_schema_for_type(&self, type_id: TypeId) -> Option<Arc<Schema>> {
        let id = self.maps.read().by_type.get(&type_id).copied()?;
        self.provider().try_get_by_id(id)
    }

    fn try_get_type_for_schema(&self, schema: &Schema) -> Option<TypeId> {
        self.maps.read().by_schema.get(&schema.id()).copied()
    }
}
