//! Entrypoint discovery and permission normalization.
//!
//! Entrypoints are found by location, not by a declared list: every regular
//! file under the configured entrypoint directory of an installation root is
//! marked `0755`. Symlinks are left alone so a link can never widen the mode
//! of a file outside the root.

use crate::error::{InstallerError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Mode applied to every entrypoint (`rwxr-xr-x`).
pub const ENTRYPOINT_MODE: u32 = 0o755;

/// How deep entrypoint discovery descends below the entrypoint directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EntrypointDepth {
    /// Direct children of the entrypoint directory only.
    #[default]
    Shallow,
    /// Every file in the entrypoint directory tree.
    Recursive,
}

/// List the entrypoints under `install_root/entrypoint_dir`.
///
/// Paths are returned relative to `install_root`, sorted. A missing
/// entrypoint directory yields an empty set.
///
/// # Errors
///
/// Returns any I/O error raised while reading the directory tree.
pub fn discover_entrypoints(
    install_root: &Path,
    entrypoint_dir: &Path,
    depth: EntrypointDepth,
) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let start = install_root.join(entrypoint_dir);
    if !start.is_dir() {
        return Ok(found);
    }
    collect_files(&start, entrypoint_dir, depth, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_files(
    dir: &Path,
    relative: &Path,
    depth: EntrypointDepth,
    found: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let child = relative.join(entry.file_name());
        if file_type.is_file() {
            found.push(child);
        } else if file_type.is_dir() && depth == EntrypointDepth::Recursive {
            collect_files(&entry.path(), &child, depth, found)?;
        }
    }
    Ok(())
}

/// Mark every entrypoint under `install_root/entrypoint_dir` executable.
///
/// Files whose mode already equals [`ENTRYPOINT_MODE`] are not touched, so a
/// second run on a normalized tree changes nothing.
///
/// Returns the entrypoints relative to `install_root`.
///
/// # Errors
///
/// Returns [`InstallerError::PermissionFailure`] naming the first file whose
/// mode could not be read or changed.
pub fn normalize_permissions(
    install_root: &Path,
    entrypoint_dir: &Path,
    depth: EntrypointDepth,
) -> Result<Vec<PathBuf>> {
    let entrypoints = discover_entrypoints(install_root, entrypoint_dir, depth).map_err(
        |source| InstallerError::PermissionFailure {
            path: install_root.join(entrypoint_dir),
            source,
        },
    )?;

    for relative in &entrypoints {
        let path = install_root.join(relative);
        set_executable(&path).map_err(|source| InstallerError::PermissionFailure {
            path: path.clone(),
            source,
        })?;
    }

    debug!(
        "normalized {} entrypoint(s) under {}",
        entrypoints.len(),
        install_root.display()
    );
    Ok(entrypoints)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let current = fs::metadata(path)?.permissions();
    if current.mode() & 0o7777 == ENTRYPOINT_MODE {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(ENTRYPOINT_MODE))
}

#[cfg(not(unix))]
fn set_executable(path: &Path) -> std::io::Result<()> {
    fs::metadata(path).map(|_| ())
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
