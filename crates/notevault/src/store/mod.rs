//! # Storage Layer
//!
//! Everything between the domain model and the disk.
//!
//! ```text
//!                    Vault
//!          ┌───────────┼─────────────┐
//!     RecordStore  RecordStore     Trash
//!     <Document>   <Container>       └── RecordStore<DeletedRecord>
//!          └───────────┼─────────────┘
//!           codec + Cache (one per store)
//!                      │
//!     StorageBackend (FsBackend | MemBackend)
//!                      │
//!     AtomicWriter (tmp + fsync + rename)
//! ```
//!
//! ## Philosophy
//!
//! - **Files are Truth**: one file per record, named by id. The directory listing is
//!   the index; there is no manifest to drift out of sync.
//! - **Lazy Cache**: nothing is read at open. The first bulk read of a kind scans its
//!   directory once, after which the cache answers every read for that kind.
//! - **Write Through**: `save` writes the slot atomically and only then updates the
//!   cache, under the cache's exclusive lock. A failed write leaves the cache alone.
//! - **Never Lose Bytes**: a record that fails to decode is moved to `quarantine/`
//!   next to its siblings, verbatim, and the caller gets a `Corrupt` error.
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//! ├── notevault.toml                # Optional vault config
//! ├── documents/{uuid}.note
//! ├── containers/{uuid}.folder
//! ├── trash/{uuid}.trash
//! └── <kind>/quarantine/            # Records that failed to decode
//! ```
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: production, plain files.
//! - [`mem_backend::MemBackend`]: for testing logic without filesystem I/O, with
//!   write-fault injection and I/O counters.

use crate::model::RecordKind;
use std::collections::HashMap;

pub mod atomic;
pub mod backend;
pub mod cache;
pub mod fs_backend;
pub mod mem_backend;
pub mod records;
pub mod vault;

pub use backend::StorageBackend;
pub use fs_backend::FsBackend;
pub use mem_backend::MemBackend;
pub use vault::{ContainerUpdate, DocumentUpdate, Vault};

/// Report from [`Vault::recover`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Temp files from interrupted writes that were deleted.
    pub removed_temp_files: usize,
    pub documents: usize,
    pub containers: usize,
    pub deleted: usize,
    /// Files sitting in quarantine per kind, including ones moved there earlier.
    pub quarantined: HashMap<RecordKind, usize>,
}

impl RecoveryReport {
    pub fn total_quarantined(&self) -> usize {
        self.quarantined.values().sum()
    }
}
