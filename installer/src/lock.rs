//! Per-package install lock.
//!
//! Installs and uninstalls of one package take an exclusive advisory lock on
//! `<prefix>/var/lock/<name>.lock`. A second process fails fast with
//! [`InstallerError::Locked`] instead of waiting.

use crate::error::{InstallerError, Result};
use fs2::FileExt;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive lock held until dropped.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Acquire the lock at `path` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Locked`] if another holder has the lock, or
    /// [`InstallerError::LockFailed`] if the lock file cannot be opened.
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_failed = |source: std::io::Error| InstallerError::LockFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(lock_failed)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(lock_failed)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!("acquired install lock {}", path.display());
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(e) if is_contended(&e) => Err(InstallerError::Locked {
                lock_path: path.to_path_buf(),
            }),
            Err(e) => Err(lock_failed(e)),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("failed to release install lock {}: {e}", self.path.display());
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
