//! # Mutable Schema Registry
//!
//! `SchemaRegistry` layers user schemas over a shared [`SchemaCatalog`].
//! Lookups try the catalog first without taking the lock; everything else
//! goes through one `parking_lot::RwLock` guarding the id map, the name map,
//! the id counter and the listener list.
//!
//! ## Id Assignment
//!
//! Schemas added without an id receive the next dynamic id, starting at
//! [`FIRST_DYNAMIC_SCHEMA_ID`] and incrementing. A schema may also arrive with
//! an explicit id (e.g. restored from a peer); the counter then skips past it.
//! Explicit ids at or below the built-in range are refused, and the counter
//! fails rather than wrapping past `i32::MAX`.

use std::sync::{Arc, Weak};

use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::{SchemaCatalog, SchemaChange, SchemaChangeFeed, SchemaChangeListener, SchemaProvider};
use crate::config::{FIRST_DYNAMIC_SCHEMA_ID, MAX_BUILTIN_SCHEMA_ID};
use crate::error::{FormatError, SchemaKey};
use crate::schema::{Schema, SchemaId};

struct RegistryInner {
    by_id: HashMap<SchemaId, Arc<Schema>>,
    by_name: HashMap<String, SchemaId>,
    next_id: SchemaId,
    listeners: Vec<Weak<dyn SchemaChangeListener>>,
}

pub struct SchemaRegistry {
    catalog: Arc<SchemaCatalog>,
    inner: RwLock<RegistryInner>,
}

pub struct SchemaRegistryBuilder {
    catalog: Option<Arc<SchemaCatalog>>,
    first_dynamic_id: SchemaId,
}

impl Default for SchemaRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self {
            catalog: None,
            first_dynamic_id: FIRST_DYNAMIC_SCHEMA_ID,
        }
    }

    /// Shares an existing catalog instead of building the standard one.
    pub fn catalog(mut self, catalog: Arc<SchemaCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn first_dynamic_id(mut self, id: SchemaId) -> Self {
        self.first_dynamic_id = id;
        self
    }

    pub fn build(self) -> Result<SchemaRegistry> {
        ensure!(
            self.first_dynamic_id > MAX_BUILTIN_SCHEMA_ID,
            "first dynamic id {} collides with the built-in range 0..={}",
            self.first_dynamic_id,
            MAX_BUILTIN_SCHEMA_ID
        );
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(SchemaCatalog::builtin()?),
        };
        Ok(SchemaRegistry {
            catalog,
            inner: RwLock::new(RegistryInner {
                by_id: HashMap::new(),
                by_name: HashMap::new(),
                next_id: self.first_dynamic_id,
                listeners: Vec::new(),
            }),
        })
    }
}

impl SchemaRegistry {
    /// A registry over the standard built-in catalog.
    pub fn new() -> Result<Self> {
        SchemaRegistryBuilder::new().build()
    }

    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    /// Registers `schema`, assigning an id if it has none.
    pub fn add(&self, mut schema: Schema) -> Result<Arc<Schema>> {
        schema.ensure_layout()?;
        if self.catalog.contains_name(schema.name()) {
            bail!(FormatError::DuplicateSchema(schema.name().to_string()));
        }

        let (registered, listeners) = {
            let mut inner = self.inner.write();
            if inner.by_name.contains_key(schema.name()) {
                bail!(FormatError::DuplicateSchema(schema.name().to_string()));
            }

            if schema.is_registered() {
                let id = schema.id();
                if id <= MAX_BUILTIN_SCHEMA_ID {
                    bail!(FormatError::InvalidData(format!(
                        "schema id {} is outside the dynamic range",
                        id
                    )));
                }
                if let Some(existing) = inner.by_id.get(&id) {
                    bail!(FormatError::DuplicateSchema(existing.name().to_string()));
                }
                if id >= inner.next_id {
                    inner.next_id = successor(id)?;
                }
            } else {
                let id = inner.next_id;
                inner.next_id = successor(id)?;
                schema.set_id(id);
            }

            let schema = Arc::new(schema);
            inner.by_id.insert(schema.id(), schema.clone());
            inner.by_name.insert(schema.name().to_string(), schema.id());
            (schema, live_listeners(&mut inner.listeners))
        };

        debug!(id = registered.id(), name = registered.name(), "registered schema");
        notify(&listeners, &SchemaChange::Inserted(registered.clone()));
        Ok(registered)
    }

    pub fn remove(&self, id: SchemaId) -> Result<Arc<Schema>> {
        if self.catalog.contains_id(id) {
            bail!(FormatError::InvalidData(format!(
                "built-in schema {} is read-only",
                id
            )));
        }
        let (removed, listeners) = {
            let mut inner = self.inner.write();
            let Some(removed) = inner.by_id.remove(&id) else {
                bail!(FormatError::SchemaNotFound(SchemaKey::Id(id)));
            };
            inner.by_name.remove(removed.name());
            (removed, live_listeners(&mut inner.listeners))
        };

        debug!(id, name = removed.name(), "removed schema");
        notify(
            &listeners,
            &SchemaChange::Deleted {
                id,
                name: removed.name().to_string(),
            },
        );
        Ok(removed)
    }

    pub fn remove_by_name(&self, name: &str) -> Result<Arc<Schema>> {
        let id = self.inner.read().by_name.get(name).copied();
        match id {
            Some(id) => self.remove(id),
            None => bail!(FormatError::SchemaNotFound(SchemaKey::Name(
                name.to_string()
            ))),
        }
    }

    /// Number of dynamically registered schemas.
    pub fn dynamic_len(&self) -> usize {
        self.inner.read().by_id.len()
    }
}

impl SchemaChangeFeed for SchemaRegistry {
    fn subscribe_weak(&self, listener: Weak<dyn SchemaChangeListener>) {
        self.inner.write().listeners.push(listener);
    }
}

impl SchemaProvider for SchemaRegistry {
    fn try_get_by_id(&self, id: SchemaId) -> Option<Arc<Schema>> {
        if let Some(schema) = self.catalog.try_get_by_id(id) {
            return Some(schema);
        }
        self.inner.read().by_id.get(&id).cloned()
    }

    fn try_get_by_name(&self, name: &str) -> Option<Arc<Schema>> {
        if let Some(schema) = self.catalog.try_get_by_name(name) {
            return Some(schema);
        }
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .and_then(|id| inner.by_id.get(id))
            .cloned()
    }

    fn get_all(&self) -> Vec<Arc<Schema>> {
        let mut all = self.catalog.get_all();
        let mut dynamic: Vec<_> = self.inner.read().by_id.values().cloned().collect();
        dynamic.sort_by_key(|s| s.id());
        all.extend(dynamic);
        all
    }
}

/// The id after `id`; the counter never wraps into negative ids.
fn successor(id: SchemaId) -> Result<SchemaId> {
    match id.checked_add(1) {
        Some(next) => Ok(next),
        None => bail!(FormatError::InvalidData(format!(
            "schema id space exhausted at {}",
            id
        ))),
    }
}

fn live_listeners(
    listeners: &mut Vec<Weak<dyn SchemaChangeListener>>,
) -> Vec<Arc<dyn SchemaChangeListener>> {
    listeners.retain(|l| l.strong_count() > 0);
    listeners.iter().filter_map(Weak::upgrade).collect()
}

fn notify(listeners: &[Arc<dyn SchemaChangeListener>], change: &SchemaChange) {
    for listener in listeners {
        listener.on_schema_change(change);
    }
}
