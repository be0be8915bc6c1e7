//! # Cache Layer
//!
//! One map per record kind, from id to a whole-record snapshot, guarded by a single
//! reader/writer lock. Reads share the lock; every mutation takes it exclusively.
//!
//! The cache starts cold. The first bulk read scans the slot directory and marks it
//! warm; from then on the cache is authoritative for that kind and reads never touch
//! the backend until [`Cache::invalidate`] is called.
//!
//! Values are cloned on the way in and out, so no caller ever holds a reference into
//! the map.
//!
//! Compound operations (write the slot, then update the map) hold the exclusive guard
//! from [`Cache::lock`] across both steps so the map always reflects the last write
//! that *completed*.

use crate::model::Record;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::HashMap;
use uuid::Uuid;

pub struct CacheState<T> {
    entries: HashMap<Uuid, T>,
    warm: bool,
}

impl<T: Record> CacheState<T> {
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }

    pub fn put(&mut self, value: T) {
        self.entries.insert(value.id(), value);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<T> {
        self.entries.remove(id)
    }

    pub fn values(&self) -> Vec<T> {
        self.entries.values().cloned().collect()
    }

    pub fn is_warm(&self) -> bool {
        self.warm
    }

    pub fn mark_warm(&mut self) {
        self.warm = true;
    }
}

pub struct Cache<T> {
    state: RwLock<CacheState<T>>,
}

impl<T: Record> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Cache<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                warm: false,
            }),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.state.read().get(id)
    }

    pub fn put(&self, value: T) {
        self.state.write().put(value);
    }

    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.state.write().remove(id)
    }

    pub fn all_values(&self) -> Vec<T> {
        self.state.read().values()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn is_warm(&self) -> bool {
        self.state.read().warm
    }

    /// All values if the cache is warm, without taking the exclusive lock.
    pub fn warm_values(&self) -> Option<Vec<T>> {
        let state = self.state.read();
        state.warm.then(|| state.values())
    }

    /// Drops every entry and marks the cache cold.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.warm = false;
    }

    /// Exclusive access for compound read-disk/write-disk + update operations.
    pub fn lock(&self) -> RwLockWriteGuard<'_, CacheState<T>> {
        self.state.write()
    }
}
