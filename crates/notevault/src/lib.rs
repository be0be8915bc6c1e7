//! # Notevault Architecture
//!
//! Notevault is the **persistence core** of a notebook app: handwritten documents made
//! of pages, folders to put them in, and a trash that keeps deleted things around for
//! a while. It knows nothing about canvases, rendering or PDF export; those sit on top
//! and talk to it through [`store::Vault`].
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Vault (store/vault.rs)                                     │
//! │  - CRUD, move/rename, cascade delete, path resolution       │
//! │  - Rejects cycles and missing parents before writing        │
//! └─────────────────────────────────────────────────────────────┘
//!                │                                │
//!                ▼                                ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────┐
//! │  RecordStore (store/)        │  │  Trash (trash/)          │
//! │  - codec + cache per kind    │◀─│  - stage, restore, purge │
//! │  - quarantine on bad decode  │  │  - expiry sweeper thread │
//! └──────────────────────────────┘  └──────────────────────────┘
//!                │
//!                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StorageBackend (FsBackend | MemBackend)                    │
//! │  - One slot per record, atomic tmp + rename writes          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - A crash mid-write leaves the previous version of a record intact.
//! - Reads hand out copies. Nothing changes until the copy is passed back to a save.
//! - A record that no longer decodes is quarantined and reported, never dropped.
//! - No operation panics or exits the process on bad data; everything returns
//!   [`error::Result`].
//!
//! ## Concurrency
//!
//! A [`store::Vault`] is `Send + Sync` and meant to be shared behind an `Arc` by
//! interactive edits, autosave and the trash sweeper. Writes to the same record are
//! last-writer-wins by completion order.
//!
//! ## Module Overview
//!
//! - [`model`]: Documents, pages, containers, trash records
//! - [`codec`]: Framed record encoding and the drawing format
//! - [`store`]: Backends, atomic writer, cache and the [`store::Vault`]
//! - [`trash`]: Soft delete, restore, purge and the background sweeper
//! - [`config`]: `notevault.toml` loading
//! - [`error`]: Error types

pub(crate) mod base64_bytes;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod trash;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use config::VaultConfig;
pub use error::{IntegrityViolation, Result, VaultError};
pub use store::Vault;
