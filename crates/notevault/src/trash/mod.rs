//! # Trash
//!
//! Soft-deleted entities are kept as [`DeletedRecord`]s: a fresh id, the original id,
//! a display name and an encoded snapshot of the entity as it was when deleted.
//!
//! ```text
//!            stage                restore
//!   Active ─────────▶ SoftDeleted ─────────▶ Restored (caller re-saves)
//!                         │
//!                         │ purge / purge_all / sweep_expired
//!                         ▼
//!                       Purged
//! ```
//!
//! The trash never writes to the live document or container slots. [`Trash::restore`]
//! hands the decoded entity back and the caller saves it, which keeps the dependency
//! one-directional: the vault knows about the trash, not the other way around.
//!
//! ## Concurrency
//!
//! Purging is idempotent. A sweep racing a user purge or restore of the same record
//! sees the slot already gone and moves on; nobody gets an error for it.
//!
//! See [`sweeper`] for the background expiry task.

use crate::codec;
use crate::error::Result;
use crate::model::{Container, DeletedRecord, Document, Entity, EntityKind, RetentionPolicy};
use crate::store::backend::StorageBackend;
use crate::store::records::RecordStore;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

pub mod sweeper;

pub use sweeper::{SweeperHandle, TrashSweeper};

pub struct Trash<B> {
    records: RecordStore<DeletedRecord, B>,
}

impl<B: StorageBackend> Trash<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            records: RecordStore::new(backend),
        }
    }

    /// Snapshots `entity` into a new trash record and persists it.
    ///
    /// The live record is left alone; removing it is the caller's job once staging
    /// has succeeded.
    pub fn stage(&self, entity: &Entity) -> Result<DeletedRecord> {
        let snapshot = match entity {
            Entity::Document(doc) => codec::encode(doc)?,
            Entity::Container(container) => codec::encode(container)?,
        };
        let record = DeletedRecord {
            id: Uuid::new_v4(),
            original_id: entity.id(),
            name: entity.name().to_string(),
            kind: entity.kind(),
            deleted_at: Utc::now(),
            snapshot,
            original_parent_id: entity.parent_id(),
        };
        self.records.save(&record)?;
        debug!(
            "event=trash_staged id={} original_id={} kind={:?}",
            record.id, record.original_id, record.kind
        );
        Ok(record)
    }

    /// Every trash record, most recently deleted first.
    pub fn load_all(&self) -> Result<Vec<DeletedRecord>> {
        let mut records = self.records.load_all()?;
        records.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(records)
    }

    pub fn get(&self, id: &Uuid) -> Result<DeletedRecord> {
        self.records.load(id)
    }

    /// Decodes the entity embedded in a trash record.
    pub fn snapshot(&self, record: &DeletedRecord) -> Result<Entity> {
        Ok(match record.kind {
            EntityKind::Document => {
                Entity::Document(codec::decode::<Document>(record.original_id, &record.snapshot)?)
            }
            EntityKind::Container => Entity::Container(codec::decode::<Container>(
                record.original_id,
                &record.snapshot,
            )?),
        })
    }

    /// Decodes the snapshot and drops the trash record. The caller re-saves the
    /// returned entity.
    ///
    /// A snapshot that fails to decode leaves the record in the trash.
    pub fn restore(&self, id: &Uuid) -> Result<Entity> {
        let record = self.get(id)?;
        let entity = self.snapshot(&record)?;
        self.purge(id)?;
        Ok(entity)
    }

    /// Removes a trash record for good. Returns false if it was already gone.
    pub fn purge(&self, id: &Uuid) -> Result<bool> {
        self.records.remove(id)
    }

    pub fn purge_all(&self) -> Result<usize> {
        let mut purged = 0;
        for record in self.records.load_all()? {
            if self.purge(&record.id)? {
                purged += 1;
            }
        }
        if purged > 0 {
            info!("event=trash_emptied purged={}", purged);
        }
        Ok(purged)
    }

    pub fn sweep_expired(&self, policy: RetentionPolicy) -> Result<usize> {
        self.sweep_expired_at(policy, Utc::now())
    }

    /// Purges every record whose retention ran out by `now`.
    pub fn sweep_expired_at(&self, policy: RetentionPolicy, now: DateTime<Utc>) -> Result<usize> {
        if policy == RetentionPolicy::Forever {
            return Ok(0);
        }

        let mut purged = 0;
        for record in self.records.load_all()? {
            if record.is_expired(policy, now) && self.purge(&record.id)? {
                purged += 1;
            }
        }
        if purged > 0 {
            info!("event=trash_swept purged={} policy={:?}", purged, policy);
        } else {
            debug!("event=trash_swept purged=0 policy={:?}", policy);
        }
        Ok(purged)
    }

    pub fn invalidate(&self) {
        self.records.invalidate();
    }

    pub fn quarantined(&self) -> Result<Vec<String>> {
        self.records.quarantined()
    }

    /// Writes a record deleted `days_ago` days in the past.
    #[cfg(test)]
    pub(crate) fn insert_backdated(&self, name: &str, days_ago: i64) -> DeletedRecord {
        let doc = Document::new(name, None);
        let record = DeletedRecord {
            id: Uuid::new_v4(),
            original_id: doc.id,
            name: name.to_string(),
            kind: EntityKind::Document,
            deleted_at: Utc::now() - chrono::Duration::days(days_ago),
            snapshot: codec::encode(&doc).unwrap(),
            original_parent_id: None,
        };
        self.records.save(&record).unwrap();
        record
    }
}
