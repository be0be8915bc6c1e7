use super::backend::StorageBackend;
use crate::error::Result;
use crate::model::RecordKind;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

/// In-memory storage backend for testing.
///
/// Slots and quarantined bytes live behind `parking_lot` mutexes so the backend can
/// be shared with the sweeper thread like the real one. Counters expose how often
/// the store actually went to "disk".
#[derive(Default)]
pub struct MemBackend {
    slots: Mutex<HashMap<(RecordKind, Uuid), Vec<u8>>>,
    quarantine: Mutex<Vec<(RecordKind, Uuid, Vec<u8>)>>,
    simulate_write_error: AtomicBool,
    scans: AtomicUsize,
    reads: AtomicUsize,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full disk would.
    pub fn set_simulate_write_error(&self, fail: bool) {
        self.simulate_write_error.store(fail, Ordering::SeqCst);
    }

    /// Number of directory listings performed so far.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Number of single-slot reads performed so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Bytes currently stored in a slot, bypassing the counters.
    pub fn raw(&self, kind: RecordKind, id: &Uuid) -> Option<Vec<u8>> {
        self.slots.lock().get(&(kind, *id)).cloned()
    }

    /// Bytes moved to quarantine for a slot, if any.
    pub fn quarantined_bytes(&self, kind: RecordKind, id: &Uuid) -> Option<Vec<u8>> {
        self.quarantine
            .lock()
            .iter()
            .find(|(k, i, _)| *k == kind && i == id)
            .map(|(_, _, bytes)| bytes.clone())
    }

    pub fn slot_count(&self, kind: RecordKind) -> usize {
        self.slots.lock().keys().filter(|(k, _)| *k == kind).count()
    }
}

impl StorageBackend for MemBackend {
    fn read_slot(&self, kind: RecordKind, id: &Uuid) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.slots.lock().get(&(kind, *id)).cloned())
    }

    fn write_slot(&self, kind: RecordKind, id: &Uuid, bytes: &[u8]) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "Simulated write error").into());
        }
        self.slots.lock().insert((kind, *id), bytes.to_vec());
        Ok(())
    }

    fn delete_slot(&self, kind: RecordKind, id: &Uuid) -> Result<bool> {
        Ok(self.slots.lock().remove(&(kind, *id)).is_some())
    }

    fn list_slots(&self, kind: RecordKind) -> Result<Vec<Uuid>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .slots
            .lock()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| *id)
            .collect())
    }

    fn quarantine_slot(&self, kind: RecordKind, id: &Uuid) -> Result<Option<PathBuf>> {
        let Some(bytes) = self.slots.lock().remove(&(kind, *id)) else {
            return Ok(None);
        };
        self.quarantine.lock().push((kind, *id, bytes));
        Ok(Some(PathBuf::from(format!(
            "memory://{}/quarantine/{}",
            kind.dir_name(),
            id
        ))))
    }

    fn list_quarantined(&self, kind: RecordKind) -> Result<Vec<String>> {
        Ok(self
            .quarantine
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, id, _)| format!("{}.{}", id, kind.extension()))
            .collect())
    }

    fn remove_stale_temp_files(&self, _kind: RecordKind) -> Result<usize> {
        Ok(0)
    }

    fn slot_path(&self, kind: RecordKind, id: &Uuid) -> PathBuf {
        PathBuf::from(format!("memory://{}/{}", kind.dir_name(), id))
    }
}
