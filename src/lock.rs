//! Advisory (fs2) locks on store files.
//!
//! Лок живёт в отдельном файле `<store>.lock`: сам store переписывается через
//! tmp+rename, поэтому лочить его inode нельзя.
//! - exclusive - put/delete/reset и открытие таблицы
//! - shared    - get/list
//!
//! Снимается в Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Held lock on a store file.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    mode: LockMode,
}

impl StoreLock {
    /// Block until a shared lock on `store` is held.
    pub fn shared(store: &Path) -> Result<Self> {
        Self::take(store, LockMode::Shared, true)
    }

    /// Block until an exclusive lock on `store` is held.
    pub fn exclusive(store: &Path) -> Result<Self> {
        Self::take(store, LockMode::Exclusive, true)
    }

    /// Exclusive lock without waiting; Err when someone else holds the store.
    pub fn try_exclusive(store: &Path) -> Result<Self> {
        Self::take(store, LockMode::Exclusive, false)
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    fn take(store: &Path, mode: LockMode, wait: bool) -> Result<Self> {
        let path = lock_file_path(store);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("open lock file {}", path.display()))?;
        // fs2 explicitly: std::fs::File has inherent lock methods of its own
        let res = match (mode, wait) {
            (LockMode::Shared, true) => FileExt::lock_shared(&file),
            (LockMode::Shared, false) => FileExt::try_lock_shared(&file),
            (LockMode::Exclusive, true) => FileExt::lock_exclusive(&file),
            (LockMode::Exclusive, false) => FileExt::try_lock_exclusive(&file),
        };
        res.with_context(|| format!("{:?} lock on {}", mode, path.display()))?;
        Ok(Self { file, mode })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// `<dir>/script_db` -> `<dir>/script_db.lock`
pub fn lock_file_path(store: &Path) -> PathBuf {
    let mut name = store
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    store.with_file_name(name)
}
