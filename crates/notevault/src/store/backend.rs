use crate::error::Result;
use crate::model::RecordKind;
use std::path::PathBuf;
use uuid::Uuid;

/// Abstract interface for raw slot I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while the record stores handle the "what" (codec, cache, quarantine).
///
/// Implementations must be shareable across threads: the vault, the trash and the
/// background sweeper all hold the same backend.
pub trait StorageBackend: Send + Sync {
    /// Read the raw bytes of a slot.
    /// Returns Ok(None) if the slot does not exist.
    /// Returns Err only on actual I/O errors (permissions, disk failure).
    fn read_slot(&self, kind: RecordKind, id: &Uuid) -> Result<Option<Vec<u8>>>;

    /// Write a slot.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn write_slot(&self, kind: RecordKind, id: &Uuid, bytes: &[u8]) -> Result<()>;

    /// Delete a slot. Returns false if it was already gone.
    fn delete_slot(&self, kind: RecordKind, id: &Uuid) -> Result<bool>;

    /// List every slot id of a kind. The listing is the index.
    fn list_slots(&self, kind: RecordKind) -> Result<Vec<Uuid>>;

    /// Move a slot that failed to decode out of the way, preserving its bytes.
    /// Returns where it went, or None if the slot had already disappeared.
    fn quarantine_slot(&self, kind: RecordKind, id: &Uuid) -> Result<Option<PathBuf>>;

    /// Names of the files currently quarantined for a kind.
    fn list_quarantined(&self, kind: RecordKind) -> Result<Vec<String>>;

    /// Remove temp files left behind by interrupted writes.
    fn remove_stale_temp_files(&self, kind: RecordKind) -> Result<usize>;

    /// The "file path" for a slot.
    /// For FsBackend, this is the real path. For MemBackend, a virtual path.
    fn slot_path(&self, kind: RecordKind, id: &Uuid) -> PathBuf;
}
