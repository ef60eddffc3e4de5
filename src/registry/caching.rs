//! # Caching Schema Provider
//!
//! Fans lookups out to a list of upstream providers in order and memoizes
//! every hit. Misses are not cached, so a schema registered upstream later is
//! found on the next lookup. Subscribing the cache to a [`SchemaChangeFeed`]
//! keeps it coherent with removals and name reuse.
//!
//! Every invalidation bumps a generation counter. A lookup that missed the
//! cache records the generation before asking upstream and only memoizes its
//! result if no invalidation ran in between, so a schema removed while the
//! lookup was in flight is never cached.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use tracing::debug;

use super::{SchemaChange, SchemaChangeFeed, SchemaChangeListener, SchemaProvider};
use crate::schema::{Schema, SchemaId};

#[derive(Default)]
struct CacheInner {
    by_id: HashMap<SchemaId, Arc<Schema>>,
    by_name: HashMap<String, Arc<Schema>>,
    generation: u64,
}

pub struct CachingSchemaProvider {
    upstream: Vec<Arc<dyn SchemaProvider>>,
    cache: RwLock<CacheInner>,
}

impl CachingSchemaProvider {
    pub fn new(upstream: Vec<Arc<dyn SchemaProvider>>) -> Self {
        Self {
            upstream,
            cache: RwLock::new(CacheInner::default()),
        }
    }

    /// Creates the cache and subscribes it to `feed`.
    pub fn attached<F>(upstream: Vec<Arc<dyn SchemaProvider>>, feed: &F) -> Arc<Self>
    where
        F: SchemaChangeFeed + ?Sized,
    {
        let cache = Arc::new(Self::new(upstream));
        super::subscribe(feed, &cache);
        cache
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().by_id.len()
    }

    pub fn invalidate(&self, id: SchemaId, name: &str) {
        let mut cache = self.cache.write();
        let by_id = cache.by_id.remove(&id);
        let by_name = cache.by_name.remove(name);
        // Entries reached through the other key must go too.
        if let Some(schema) = by_id {
            cache.by_name.remove(schema.name());
        }
        if let Some(schema) = by_name {
            cache.by_id.remove(&schema.id());
        }
        cache.generation += 1;
        debug!(id, name, "invalidated cached schema");
    }

    pub fn invalidate_all(&self) {
        let mut cache = self.cache.write();
        cache.by_id.clear();
        cache.by_name.clear();
        cache.generation += 1;
        debug!("invalidated schema cache");
    }

    fn remember(&self, schema: &Arc<Schema>, generation: u64) {
        let mut cache = self.cache.write();
        if cache.generation != generation {
            return;
        }
        cache.by_id.insert(schema.id(), schema.clone());
        cache.by_name.insert(schema.name().to_string(), schema.clone());
    }
}

impl SchemaProvider for CachingSchemaProvider {
    fn try_get_by_id(&self, id: SchemaId) -> Option<Arc<Schema>> {
        let generation = {
            let cache = self.cache.read();
            if let Some(hit) = cache.by_id.get(&id) {
                return Some(hit.clone());
            }
            cache.generation
        };
        let found = self.upstream.iter().find_map(|p| p.try_get_by_id(id))?;
        self.remember(&found, generation);
        Some(found)
    }

    fn try_get_by_name(&self, name: &str) -> Option<Arc<Schema>> {
        let generation = {
            let cache = self.cache.read();
            if let Some(hit) = cache.by_name.get(name) {
                return Some(hit.clone());
            }
            cache.generation
        };
        let found = self.upstream.iter().find_map(|p| p.try_get_by_name(name))?;
        self.remember(&found, generation);
        Some(found)
    }

    /// Union of every upstream; earlier providers win on id collisions.
    fn get_all(&self) -> Vec<Arc<Schema>> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        for provider in &self.upstream {
            for schema in provider.get_all() {
                if seen.insert(schema.id()) {
                    all.push(schema);
                }
            }
        }
        all
    }
}

impl SchemaChangeListener for CachingSchemaProvider {
    fn on_schema_change(&self, change: &SchemaChange) {
        self.invalidate(change.id(), change.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SchemaCatalog, SchemaRegistry};
    use crate::schema::SchemaBuilder;

    fn setup() -> (Arc<SchemaRegistry>, Arc<CachingSchemaProvider>) {
        let registry = Arc::new(SchemaRegistry::new().unwrap());
        let upstream: Vec<Arc<dyn SchemaProvider>> = vec![registry.clone()];
        let cache = CachingSchemaProvider::attached(upstream, registry.as_ref());
        (registry, cache)
    }

    #[test]
    fn memoizes_hits_not_misses() {
        let (registry, cache) = setup();
        assert!(cache.try_get_by_name("Thing").is_none());
        assert_eq!(cache.cached_len(), 0);

        registry
            .add(
                SchemaBuilder::class("Thing")
                    .field("x", registry.get_by_name("Int32").unwrap())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let thing = cache.try_get_by_name("Thing").unwrap();
        assert_eq!(cache.cached_len(), 1);
        assert!(Arc::ptr_eq(&thing, &cache.try_get_by_id(thing.id()).unwrap()));
    }

    #[test]
    fn removal_invalidates() {
        let (registry, cache) = setup();
        let thing = registry
            .add(
                SchemaBuilder::class("Thing")
                    .field("x", registry.get_by_name("Int32").unwrap())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert!(cache.try_get_by_id(thing.id()).is_some());
        registry.remove(thing.id()).unwrap();
        assert!(cache.try_get_by_id(thing.id()).is_none());
        assert!(cache.try_get_by_name("Thing").is_none());
    }

    /// Upstream that removes the schema it just returned, as a concurrent
    /// writer would between the lookup and the cache insert.
    struct RemovesAfterRead {
        registry: Arc<SchemaRegistry>,
    }

    impl SchemaProvider for RemovesAfterRead {
        fn try_get_by_id(&self, id: SchemaId) -> Option<Arc<Schema>> {
            let found = self.registry.try_get_by_id(id)?;
            self.registry.remove(id).unwrap();
            Some(found)
        }

        fn try_get_by_name(&self, name: &str) -> Option<Arc<Schema>> {
            let found = self.registry.try_get_by_name(name)?;
            self.registry.remove(found.id()).unwrap();
            Some(found)
        }

        fn get_all(&self) -> Vec<Arc<Schema>> {
            self.registry.get_all()
        }
    }

    #[test]
    fn removal_during_lookup_is_not_cached() {
        let registry = Arc::new(SchemaRegistry::new().unwrap());
        let upstream: Vec<Arc<dyn SchemaProvider>> = vec![
            Arc::new(RemovesAfterRead {
                registry: registry.clone(),
            }),
            registry.clone(),
        ];
        let cache = CachingSchemaProvider::attached(upstream, registry.as_ref());
        let thing = |name: &str| {
            SchemaBuilder::class(name)
                .field("x", registry.get_by_name("Int32").unwrap())
                .build()
                .unwrap()
        };

        let first = registry.add(thing("Thing")).unwrap();
        assert!(cache.try_get_by_name("Thing").is_some());
        assert_eq!(cache.cached_len(), 0);
        assert!(cache.try_get_by_name("Thing").is_none());

        let second = registry.add(thing("Other")).unwrap();
        assert!(cache.try_get_by_id(second.id()).is_some());
        assert_eq!(cache.cached_len(), 0);
        assert!(cache.try_get_by_id(second.id()).is_none());
        assert!(cache.try_get_by_id(first.id()).is_none());
    }

    #[test]
    fn concurrent_removals_leave_nothing_stale() {
        let (registry, cache) = setup();
        let int32 = registry.get_by_name("Int32").unwrap();

        for round in 0..50 {
            let name = format!("Flip{}", round);
            let schema = SchemaBuilder::class(name.as_str())
                .field("x", int32.clone())
                .build()
                .unwrap();
            registry.add(schema).unwrap();

            std::thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        for _ in 0..20 {
                            cache.try_get_by_name(&name);
                        }
                    });
                }
                scope.spawn(|| registry.remove_by_name(&name).unwrap());
            });

            assert!(cache.try_get_by_name(&name).is_none(), "{} still cached", name);
        }
        assert_eq!(cache.cached_len(), 0);
    }

    #[test]
    fn fans_out_in_order() {
        let mut first = SchemaCatalog::empty();
        first.insert(
            Schema::primitive("Int32", crate::types::DataType::Int32)
                .unwrap()
                .with_id(2),
        );
        let second = SchemaCatalog::builtin().unwrap();
        let upstream: Vec<Arc<dyn SchemaProvider>> = vec![Arc::new(first), Arc::new(second)];
        let cache = CachingSchemaProvider::new(upstream);
        assert_eq!(cache.get_by_name("String").unwrap().id(), 9);
        assert_eq!(cache.get_all().len(), SchemaCatalog::builtin().unwrap().len());
        assert!(cache.get_by_name("Nope").is_err());
    }
}
