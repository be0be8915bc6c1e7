use super::atomic::{self, AtomicWriter};
use super::backend::StorageBackend;
use crate::error::Result;
use crate::model::RecordKind;
use chrono::Utc;
use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const QUARANTINE_DIR: &str = "quarantine";

/// Filesystem backend.
///
/// ```text
/// <root>/
/// ├── documents/{uuid}.note
/// │   └── quarantine/
/// ├── containers/{uuid}.folder
/// │   └── quarantine/
/// └── trash/{uuid}.trash
///     └── quarantine/
/// ```
pub struct FsBackend {
    root: PathBuf,
    writer: AtomicWriter,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writer: AtomicWriter::default(),
        }
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.writer = AtomicWriter::new(sync);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind_dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    pub fn quarantine_dir(&self, kind: RecordKind) -> PathBuf {
        self.kind_dir(kind).join(QUARANTINE_DIR)
    }

    fn slot_filename(kind: RecordKind, id: &Uuid) -> String {
        format!("{}.{}", id, kind.extension())
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Parses `{uuid}.{ext}`; anything else in the directory is ignored.
    fn parse_slot_name(kind: RecordKind, name: &str) -> Option<Uuid> {
        let stem = name.strip_suffix(kind.extension())?.strip_suffix('.')?;
        Uuid::parse_str(stem).ok()
    }
}

impl StorageBackend for FsBackend {
    fn read_slot(&self, kind: RecordKind, id: &Uuid) -> Result<Option<Vec<u8>>> {
        match fs::read(self.slot_path(kind, id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_slot(&self, kind: RecordKind, id: &Uuid, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(&self.kind_dir(kind))?;
        self.writer.write(&self.slot_path(kind, id), bytes)?;
        Ok(())
    }

    fn delete_slot(&self, kind: RecordKind, id: &Uuid) -> Result<bool> {
        match fs::remove_file(self.slot_path(kind, id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list_slots(&self, kind: RecordKind) -> Result<Vec<Uuid>> {
        let dir = self.kind_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::parse_slot_name(kind, name) {
                Some(id) => ids.push(id),
                None if !atomic::is_temp_file(name) => {
                    debug!("event=slot_ignored path={}", path.display());
                }
                None => {}
            }
        }
        Ok(ids)
    }

    fn quarantine_slot(&self, kind: RecordKind, id: &Uuid) -> Result<Option<PathBuf>> {
        let source = self.slot_path(kind, id);
        if !source.exists() {
            return Ok(None);
        }
        let dir = self.quarantine_dir(kind);
        self.ensure_dir(&dir)?;

        let name = Self::slot_filename(kind, id);
        let mut target = dir.join(&name);
        if target.exists() {
            // Same slot went bad before; keep both copies.
            target = dir.join(format!("{}.{}", name, Utc::now().timestamp_millis()));
        }
        fs::rename(&source, &target)?;
        warn!(
            "event=slot_quarantined kind={} id={} path={}",
            kind,
            id,
            target.display()
        );
        Ok(Some(target))
    }

    fn list_quarantined(&self, kind: RecordKind) -> Result<Vec<String>> {
        let dir = self.quarantine_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn remove_stale_temp_files(&self, kind: RecordKind) -> Result<usize> {
        Ok(atomic::remove_stale_temp_files(&self.kind_dir(kind))?)
    }

    fn slot_path(&self, kind: RecordKind, id: &Uuid) -> PathBuf {
        self.kind_dir(kind).join(Self::slot_filename(kind, id))
    }
}
