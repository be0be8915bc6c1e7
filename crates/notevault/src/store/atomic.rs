//! Crash-safe slot writes.
//!
//! Bytes go to a uniquely named hidden temp file next to the target, get flushed,
//! and are then renamed over the target. Rename within one directory is atomic, so
//! a reader sees either the old file or the new one, never a mix. A crash before
//! the rename leaves the old file untouched plus a stray temp file, which
//! [`remove_stale_temp_files`] cleans up on the next start.

use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const TEMP_SUFFIX: &str = ".tmp";

/// True for file names produced by [`AtomicWriter::stage`].
pub fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

#[derive(Debug, Clone, Copy)]
pub struct AtomicWriter {
    sync: bool,
}

impl Default for AtomicWriter {
    fn default() -> Self {
        Self { sync: true }
    }
}

impl AtomicWriter {
    /// `sync` controls whether data and directory entries are fsynced.
    pub fn new(sync: bool) -> Self {
        Self { sync }
    }

    /// Atomically replaces `target` with `bytes`.
    ///
    /// On failure the target is untouched and the temp file is removed.
    pub fn write(&self, target: &Path, bytes: &[u8]) -> io::Result<()> {
        let tmp = self.stage(target, bytes)?;
        self.commit(&tmp, target)
    }

    /// First half of [`write`](Self::write): writes the temp file and returns its path.
    pub fn stage(&self, target: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
        let tmp = temp_path_for(target)?;
        if let Err(err) = self.write_temp(&tmp, bytes) {
            discard(&tmp);
            return Err(err);
        }
        Ok(tmp)
    }

    /// Second half of [`write`](Self::write): renames the temp file over the target.
    pub fn commit(&self, tmp: &Path, target: &Path) -> io::Result<()> {
        if let Err(err) = fs::rename(tmp, target) {
            discard(tmp);
            return Err(err);
        }
        if self.sync {
            if let Some(dir) = target.parent() {
                sync_dir(dir);
            }
        }
        debug!("event=slot_written path={}", target.display());
        Ok(())
    }

    fn write_temp(&self, tmp: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(tmp)?;
        file.write_all(bytes)?;
        if self.sync {
            file.sync_all()?;
        }
        Ok(())
    }
}

fn temp_path_for(target: &Path) -> io::Result<PathBuf> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "slot path has no file name"))?;
    let tmp_name = format!(".{}-{}{}", name, Uuid::new_v4(), TEMP_SUFFIX);
    Ok(match target.parent() {
        Some(dir) => dir.join(tmp_name),
        None => PathBuf::from(tmp_name),
    })
}

fn discard(tmp: &Path) {
    match fs::remove_file(tmp) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            "event=temp_cleanup_failed path={} error={}",
            tmp.display(),
            err
        ),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(err) = File::open(dir).and_then(|d| d.sync_all()) {
        warn!("event=dir_sync_failed path={} error={}", dir.display(), err);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Deletes leftover temp files in `dir`, returning how many were removed.
pub fn remove_stale_temp_files(dir: &Path) -> io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_temp = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(is_temp_file)
            .unwrap_or(false);
        if is_temp && path.is_file() {
            fs::remove_file(&path)?;
            warn!("event=stale_temp_removed path={}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}
