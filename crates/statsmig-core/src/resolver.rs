//! Legacy id resolution with a bounded, time-limited cache.
//!
//! Answers are cached per `(kind, legacy id)` including "not found", so a
//! busy item referenced by thousands of records costs one database read.
//! The driver tears the cache down periodically to bound memory.

use crate::config::CacheSettings;
use crate::error::Result;
use crate::models::{LegacyId, ObjectKey, ObjectKind, OwnerRef};
use crate::persistence::LegacyLookup;
use mini_moka::sync::Cache;
use std::cell::Cell;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

fn build_cache(ttl: Duration, capacity: u64) -> Cache<ObjectKey, Option<Uuid>> {
    Cache::builder()
        .time_to_live(ttl)
        .max_capacity(capacity)
        .build()
}

/// Resolves legacy ids to UUIDs through a [`LegacyLookup`].
pub struct Resolver<L> {
    lookup: L,
    cache: Cache<ObjectKey, Option<Uuid>>,
    ttl: Duration,
    capacity: u64,
    /// Entries inserted since the last reset.
    inserted: Cell<usize>,
}

impl<L: LegacyLookup> Resolver<L> {
    pub fn new(lookup: L) -> Self {
        Self::with_cache(lookup, CacheSettings::TIME_TO_LIVE, CacheSettings::MAX_CAPACITY)
    }

    pub fn with_cache(lookup: L, ttl: Duration, capacity: u64) -> Self {
        Self {
            lookup,
            cache: build_cache(ttl, capacity),
            ttl,
            capacity,
            inserted: Cell::new(0),
        }
    }

    /// Resolve a legacy id of a known kind.
    pub fn resolve(&self, kind: ObjectKind, legacy_id: LegacyId) -> Result<Option<Uuid>> {
        self.resolve_key(ObjectKey::new(kind, legacy_id))
    }

    pub fn resolve_key(&self, key: ObjectKey) -> Result<Option<Uuid>> {
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let found = self.lookup.find_by_legacy_id(key.kind, key.legacy_id)?;
        if found.is_none() {
            debug!("No {} with legacy id {}", key.kind, key.legacy_id);
        }
        self.cache.insert(key, found);
        self.inserted.set(self.inserted.get() + 1);
        Ok(found)
    }

    /// Resolve a prefixed `owner` value such as `e15` or `g3`.
    ///
    /// Malformed values and unknown prefixes resolve to `None`.
    pub fn resolve_owner(&self, raw: &str) -> Result<Option<Uuid>> {
        let Some(owner) = OwnerRef::parse(raw) else {
            warn!("Malformed legacy owner value {:?}", raw);
            return Ok(None);
        };
        self.resolve_owner_ref(owner)
    }

    pub fn resolve_owner_ref(&self, owner: OwnerRef) -> Result<Option<Uuid>> {
        match owner.key() {
            Some(key) => self.resolve_key(key),
            None => {
                debug!("Unknown owner prefix {:?}", owner.prefix);
                Ok(None)
            }
        }
    }

    /// Drop one entry, typically an item or bitstream that will not recur.
    pub fn evict(&self, key: &ObjectKey) {
        self.cache.invalidate(key);
    }

    /// Entries inserted since the cache was last rebuilt.
    pub fn cache_size(&self) -> usize {
        self.inserted.get()
    }

    /// Discard the cache and refresh the persistence context.
    pub fn reset(&mut self) -> Result<()> {
        self.cache = build_cache(self.ttl, self.capacity);
        self.inserted.set(0);
        self.lookup.refresh()
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }
}
