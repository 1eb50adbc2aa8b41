//! Install receipts.
//!
//! A receipt records what was installed and from where. It is written beside
//! the installation root (never inside it, so the root stays a mirror of the
//! archive) and read back by `list`, `test` and `uninstall`.

use crate::error::{InstallerError, Result};
use crate::wrapper::VersionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Record of one installed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Formula name.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Archive source URL.
    pub source_url: String,
    /// Verified archive digest.
    pub sha256: String,
    /// Installation root.
    pub install_root: PathBuf,
    /// Launcher path.
    pub launcher: PathBuf,
    /// Version precedence rule baked into the launcher.
    pub version_policy: VersionPolicy,
    /// Entrypoints marked executable, relative to the root.
    pub entrypoints: Vec<PathBuf>,
    /// Install time in seconds since the Unix epoch.
    pub installed_at: u64,
}

impl InstallReceipt {
    /// Seconds since the Unix epoch, for [`InstallReceipt::installed_at`].
    #[must_use]
    pub fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }

    /// Write the receipt as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Receipt`] if serialization or the write
    /// fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| receipt_error(path, &e))?;
        std::fs::write(path, format!("{json}\n")).map_err(|e| receipt_error(path, &e))
    }

    /// Read a receipt written by [`InstallReceipt::write`].
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Receipt`] if the file cannot be read or
    /// parsed.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| receipt_error(path, &e))?;
        serde_json::from_str(&text).map_err(|e| receipt_error(path, &e))
    }
}

fn receipt_error(path: &Path, err: &dyn std::fmt::Display) -> InstallerError {
    InstallerError::Receipt {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
