//! Persistent method store and query cache
//!
//! The store binds `(identity, property definition)` pairs to methods. The
//! cache remembers which method a `(identity, query string)` pair resolved to,
//! so repeated fetches skip property matching entirely.
//!
//! Methods of every operation kind share one store. They are kept type-erased
//! and recovered by downcasting; the operation id inside the identity
//! guarantees the concrete type is the one the caller asks for.

use crate::error::Result;
use crate::method::MethodId;
use crate::property::{PropertyDefinition, PropertyQuery};
use log::{debug, trace};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default number of cached query results before the cache is flushed
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

type ErasedMethod = Box<dyn Any + Send + Sync>;

struct StoreEntry {
    definition: PropertyDefinition,
    method: ErasedMethod,
    /// Registration order, used to break score ties
    sequence: u64,
}

#[derive(Default)]
struct StoreInner {
    entries: HashMap<MethodId, Vec<StoreEntry>>,
    cache: HashMap<(MethodId, String), ErasedMethod>,
    /// Provider generation each identity was last populated from
    populated: HashMap<MethodId, u64>,
    global: PropertyQuery,
    next_sequence: u64,
}

/// Thread-safe store of constructed methods
pub struct MethodStore {
    inner: RwLock<StoreInner>,
    cache_capacity: usize,
}

impl Default for MethodStore {
    fn default() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for MethodStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("MethodStore")
            .field("identities", &inner.entries.len())
            .field("cached", &inner.cache.len())
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

impl MethodStore {
    /// Create a store with the default cache capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store caching at most `capacity` query results (0 disables caching)
    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            cache_capacity: capacity,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select the best stored method for an identity.
    ///
    /// The query is merged over the global default properties first. Among
    /// matching entries the highest score wins; equal scores go to the most
    /// recently registered entry.
    pub fn fetch<M: Clone + 'static>(&self, id: MethodId, query: &PropertyQuery) -> Option<M> {
        if !id.is_valid() {
            return None;
        }
        let inner = self.read();
        let effective = query.merged_over(&inner.global);
        let entries = inner.entries.get(&id)?;

        entries
            .iter()
            .filter_map(|entry| {
                effective
                    .match_score(&entry.definition)
                    .map(|score| (score, entry.sequence, entry))
            })
            .max_by_key(|(score, sequence, _)| (*score, *sequence))
            .and_then(|(_, _, entry)| entry.method.downcast_ref::<M>().cloned())
    }

    /// Register a method under an identity and exact property definition.
    ///
    /// Returns `false` for the invalid identity or when the pair is already
    /// stored; the passed reference is dropped in that case.
    pub fn add<M: Send + Sync + 'static>(
        &self,
        id: MethodId,
        definition: PropertyDefinition,
        method: M,
    ) -> bool {
        if !id.is_valid() {
            return false;
        }
        let mut inner = self.write();
        let sequence = inner.next_sequence;
        let entries = inner.entries.entry(id).or_default();
        if entries.iter().any(|entry| entry.definition == definition) {
            return false;
        }
        debug!("Stored method {id} with properties '{definition}'");
        entries.push(StoreEntry {
            definition,
            method: Box::new(method),
            sequence,
        });
        inner.next_sequence += 1;
        inner.cache.retain(|(cached, _), _| *cached != id);
        true
    }

    /// Whether an exact `(identity, definition)` pair is stored
    pub fn contains(&self, id: MethodId, definition: &PropertyDefinition) -> bool {
        self.read()
            .entries
            .get(&id)
            .is_some_and(|entries| entries.iter().any(|entry| &entry.definition == definition))
    }

    /// Cached resolution for `(identity, query string)`
    pub fn cache_get<M: Clone + 'static>(&self, id: MethodId, query: &str) -> Option<M> {
        if !id.is_valid() {
            return None;
        }
        let inner = self.read();
        let hit = inner
            .cache
            .get(&(id, query.to_string()))
            .and_then(|method| method.downcast_ref::<M>())
            .cloned();
        match hit {
            Some(_) => trace!("Cache hit for {id} '{query}'"),
            None => trace!("Cache miss for {id} '{query}'"),
        }
        hit
    }

    /// Remember the resolution for `(identity, query string)`
    pub fn cache_set<M: Clone + Send + Sync + 'static>(&self, id: MethodId, query: &str, method: &M) {
        if !id.is_valid() || self.cache_capacity == 0 {
            return;
        }
        let mut inner = self.write();
        let key = (id, query.to_string());
        if inner.cache.len() >= self.cache_capacity && !inner.cache.contains_key(&key) {
            debug!("Method cache reached {} entries, flushing", inner.cache.len());
            inner.cache.clear();
        }
        inner.cache.insert(key, Box::new(method.clone()));
    }

    /// Replace the global default property query and invalidate the cache
    pub fn set_global_properties(&self, query: &str) -> Result<()> {
        let parsed = PropertyQuery::parse(query)?;
        let mut inner = self.write();
        inner.global = parsed;
        inner.cache.clear();
        debug!("Default properties set to '{query}'");
        Ok(())
    }

    /// Current global default property query in canonical form
    pub fn global_properties(&self) -> String {
        self.read().global.to_string()
    }

    /// Whether the identity was populated from providers at `generation` or later
    pub fn is_populated(&self, id: MethodId, generation: u64) -> bool {
        self.read()
            .populated
            .get(&id)
            .is_some_and(|&seen| seen >= generation)
    }

    /// Record that every provider of `generation` was asked for the identity
    pub fn mark_populated(&self, id: MethodId, generation: u64) {
        if !id.is_valid() {
            return;
        }
        let mut inner = self.write();
        let seen = inner.populated.entry(id).or_insert(generation);
        *seen = (*seen).max(generation);
    }

    /// Drop every cached resolution
    pub fn flush_cache(&self) {
        self.write().cache.clear();
    }

    /// Number of stored methods
    pub fn len(&self) -> usize {
        self.read().entries.values().map(Vec::len).sum()
    }

    /// Whether no method is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cached resolutions
    pub fn cache_len(&self) -> usize {
        self.read().cache.len()
    }
}
