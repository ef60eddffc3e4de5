//! # Schema Registry
//!
//! Resolves schemas by numeric id or by name. Three providers share the
//! [`SchemaProvider`] interface:
//!
//! | Provider | Ids | Mutability | Locking |
//! |----------|-----|------------|---------|
//! | [`SchemaCatalog`] | 0-999 | read-only, built once | none |
//! | [`SchemaRegistry`] | catalog + 5000.. | add / remove | one `RwLock` |
//! | [`CachingSchemaProvider`] | whatever upstream serves | memoizing | one `RwLock` |
//!
//! The built-in catalog is an explicit value: construct it once with
//! [`SchemaCatalog::builtin`] and share it through an `Arc`. There is no
//! process-global table.
//!
//! ## Change Feed
//!
//! A `SchemaRegistry` publishes a [`SchemaChange`] after every successful add
//! or remove. Listeners are held weakly, so dropping a listener unsubscribes
//! it. Notifications are delivered after the registry lock is released; a
//! listener may call back into the registry.
//!
//! ```text
//!   SchemaRegistry --(Inserted / Deleted)--> CachingSchemaProvider::invalidate
//! ```

pub mod caching;
pub mod catalog;
pub mod dynamic;

use std::sync::{Arc, Weak};

use eyre::Result;

use crate::error::{FormatError, SchemaKey};
use crate::schema::{Schema, SchemaId};

pub use caching::CachingSchemaProvider;
pub use catalog::{builtin, SchemaCatalog};
pub use dynamic::{SchemaRegistry, SchemaRegistryBuilder};

pub trait SchemaProvider: Send + Sync {
    fn try_get_by_id(&self, id: SchemaId) -> Option<Arc<Schema>>;

    fn try_get_by_name(&self, name: &str) -> Option<Arc<Schema>>;

    fn get_all(&self) -> Vec<Arc<Schema>>;

    fn get_by_id(&self, id: SchemaId) -> Result<Arc<Schema>> {
        self.try_get_by_id(id)
            .ok_or_else(|| eyre::Report::new(FormatError::SchemaNotFound(SchemaKey::Id(id))))
    }

    fn get_by_name(&self, name: &str) -> Result<Arc<Schema>> {
        self.try_get_by_name(name).ok_or_else(|| {
            eyre::Report::new(FormatError::SchemaNotFound(SchemaKey::Name(name.to_string())))
        })
    }
}

#[derive(Debug, Clone)]
pub enum SchemaChange {
    Inserted(Arc<Schema>),
    Deleted { id: SchemaId, name: String },
}

impl SchemaChange {
    pub fn id(&self) -> SchemaId {
        match self {
            SchemaChange::Inserted(schema) => schema.id(),
            SchemaChange::Deleted { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SchemaChange::Inserted(schema) => schema.name(),
            SchemaChange::Deleted { name, .. } => name,
        }
    }
}

pub trait SchemaChangeListener: Send + Sync {
    fn on_schema_change(&self, change: &SchemaChange);
}

/// Source of [`SchemaChange`] notifications.
pub trait SchemaChangeFeed {
    fn subscribe_weak(&self, listener: Weak<dyn SchemaChangeListener>);
}

/// Subscribes `listener` to `feed` without keeping it alive.
pub fn subscribe<F, L>(feed: &F, listener: &Arc<L>)
where
    F: SchemaChangeFeed + ?Sized,
    L: SchemaChangeListener + 'static,
{
    let weak: Weak<L> = Arc::downgrade(listener);
    feed.subscribe_weak(weak);
}
