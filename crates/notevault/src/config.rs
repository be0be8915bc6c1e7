//! # Configuration
//!
//! Vault configuration is managed by [`clapfig`], which handles layered loading from
//! TOML files and environment variables.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `NOTEVAULT__RETENTION_DAYS`, `NOTEVAULT__SYNC_WRITES`, etc.
//! 2. **Vault Config**: `<root>/notevault.toml`, overrides everything for that vault.
//! 3. **Global Config**: `notevault.toml` in the OS data directory (via `directories`).
//! 4. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `retention_days` | `30` | Days a deleted item stays in the trash |
//! | `keep_deleted_forever` | `false` | Disable expiry entirely |
//! | `sweep_interval_secs` | `86400` | How often the background sweep runs |
//! | `sync_writes` | `true` | fsync temp files before the atomic rename |

use crate::error::{Result, VaultError};
use crate::model::RetentionPolicy;
use clapfig::{Clapfig, SearchMode, SearchPath};
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "notevault.toml";

/// Configuration for a vault, stored in `notevault.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Days a soft-deleted item is kept before the sweep purges it.
    #[config(default = 30)]
    pub retention_days: u32,

    /// When true, the trash is never swept and `retention_days` is ignored.
    #[config(default = false)]
    pub keep_deleted_forever: bool,

    #[config(default = 86400)]
    pub sweep_interval_secs: u64,

    /// Flush temp files to disk before renaming them over the target.
    #[config(default = true)]
    pub sync_writes: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            keep_deleted_forever: false,
            sweep_interval_secs: 86400,
            sync_writes: true,
        }
    }
}

impl VaultConfig {
    /// Loads the merged config for the vault at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let mut paths = Vec::new();
        if let Some(dirs) = project_dirs() {
            paths.push(dirs.data_dir().to_path_buf());
        }
        paths.push(root.to_path_buf());
        Self::load_from(paths)
    }

    /// Loads and merges `notevault.toml` from each directory, later ones winning.
    pub fn load_from(dirs: Vec<PathBuf>) -> Result<Self> {
        Clapfig::builder::<VaultConfig>()
            .app_name("notevault")
            .file_name(CONFIG_FILE)
            .search_paths(dirs.into_iter().map(SearchPath::Path).collect())
            .search_mode(SearchMode::Merge)
            .load()
            .map_err(|e| VaultError::Config(e.to_string()))
    }

    pub fn retention(&self) -> RetentionPolicy {
        if self.keep_deleted_forever {
            RetentionPolicy::Forever
        } else {
            RetentionPolicy::Days(self.retention_days)
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "notevault", "notevault")
}

/// Default vault location: the OS data directory, or `./.notevault` when the
/// platform has none.
pub fn default_root() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("vault"))
        .unwrap_or_else(|| PathBuf::from(".notevault"))
}
