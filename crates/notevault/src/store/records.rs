use super::backend::StorageBackend;
use super::cache::{Cache, CacheState};
use crate::codec;
use crate::error::{Result, VaultError};
use crate::model::Record;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Typed storage for one record kind: codec + slot I/O + cache.
///
/// Every mutation writes the slot first and only then touches the cache, while holding
/// the cache's exclusive lock, so a failed write leaves the cache as it was.
pub struct RecordStore<T, B> {
    backend: Arc<B>,
    cache: Cache<T>,
}

impl<T, B> RecordStore<T, B>
where
    T: Record + Serialize + DeserializeOwned,
    B: StorageBackend,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            cache: Cache::new(),
        }
    }

    pub fn cache(&self) -> &Cache<T> {
        &self.cache
    }

    /// Validate, encode, atomically write, then upsert into the cache.
    pub fn save(&self, record: &T) -> Result<()> {
        record.validate()?;
        let bytes = codec::encode(record)?;
        let mut state = self.cache.lock();
        self.backend.write_slot(T::KIND, &record.id(), &bytes)?;
        state.put(record.clone());
        Ok(())
    }

    /// Cache hit returns a copy; a miss reads the single slot.
    ///
    /// Once the kind has been bulk-loaded the cache is authoritative and a miss is
    /// reported as not found without going to the backend.
    pub fn load(&self, id: &Uuid) -> Result<T> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }

        let mut state = self.cache.lock();
        if let Some(hit) = state.get(id) {
            return Ok(hit);
        }
        if state.is_warm() {
            return Err(VaultError::not_found(T::KIND, *id));
        }
        match self.read_slot(&mut state, id)? {
            Some(record) => Ok(record),
            None => Err(VaultError::not_found(T::KIND, *id)),
        }
    }

    /// Every record of the kind. The first call scans the backend; later calls are
    /// served from the cache.
    pub fn load_all(&self) -> Result<Vec<T>> {
        if let Some(values) = self.cache.warm_values() {
            return Ok(values);
        }

        let mut state = self.cache.lock();
        if state.is_warm() {
            return Ok(state.values());
        }

        let ids = self.backend.list_slots(T::KIND)?;
        let mut quarantined = 0;
        for id in &ids {
            if state.contains(id) {
                continue;
            }
            match self.read_slot(&mut state, id) {
                Ok(_) => {}
                Err(VaultError::Corrupt { .. }) => quarantined += 1,
                Err(err) => return Err(err),
            }
        }
        state.mark_warm();
        debug!(
            "event=cache_warmed kind={} slots={} quarantined={}",
            T::KIND,
            ids.len(),
            quarantined
        );
        Ok(state.values())
    }

    /// Records whose parent reference equals `parent`.
    pub fn load_children(&self, parent: Option<Uuid>) -> Result<Vec<T>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|r| r.parent_id() == parent)
            .collect())
    }

    /// Removes the slot and the cache entry. Returns false if there was nothing to
    /// remove, which callers treat as a no-op.
    pub fn remove(&self, id: &Uuid) -> Result<bool> {
        let mut state = self.cache.lock();
        let existed = self.backend.delete_slot(T::KIND, id)?;
        let cached = state.remove(id).is_some();
        Ok(existed || cached)
    }

    /// Whether a live, decodable record exists.
    pub fn exists(&self, id: &Uuid) -> Result<bool> {
        match self.load(id) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() || err.is_corrupt() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Drops the cache so the next read goes back to the backend.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn quarantined(&self) -> Result<Vec<String>> {
        self.backend.list_quarantined(T::KIND)
    }

    /// Reads and decodes one slot into the locked cache. Corrupt slots are moved to
    /// quarantine and reported.
    fn read_slot(&self, state: &mut CacheState<T>, id: &Uuid) -> Result<Option<T>> {
        let Some(bytes) = self.backend.read_slot(T::KIND, id)? else {
            return Ok(None);
        };
        match codec::decode::<T>(*id, &bytes) {
            Ok(record) => {
                state.put(record.clone());
                Ok(Some(record))
            }
            Err(err) => {
                warn!("event=decode_failed kind={} id={} error=\"{}\"", T::KIND, id, err);
                if let Err(q_err) = self.backend.quarantine_slot(T::KIND, id) {
                    error!(
                        "event=quarantine_failed kind={} id={} error={}",
                        T::KIND,
                        id,
                        q_err
                    );
                }
                Err(err)
            }
        }
    }
}
