use crate::config::VaultConfig;
use crate::store::{FsBackend, Vault};
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    // We keep _temp_dir to ensure the directory is not dropped until the test is done
    pub _temp_dir: TempDir,
    pub vault: Vault<FsBackend>,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let config = VaultConfig {
            sync_writes: false,
            ..Default::default()
        };
        let vault = Vault::open(root.clone(), &config);
        Self {
            _temp_dir: temp_dir,
            vault,
            root,
        }
    }

    /// A second vault over the same directory, with cold caches.
    pub fn reopen(&self) -> Vault<FsBackend> {
        Vault::open(self.root.clone(), &VaultConfig::default())
    }
}
