//! Directory resolution abstraction for platform-specific paths.
//!
//! Wraps `directories-next` behind a trait so tests can supply fixed paths.

use std::path::PathBuf;

/// Source of the user's base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Directory for user executables (`~/.local/bin` on Linux).
    fn bin_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by the platform conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
    }

    fn bin_dir(&self) -> Option<PathBuf> {
        let dirs = directories_next::BaseDirs::new()?;
        dirs.executable_dir()
            .map(std::path::Path::to_path_buf)
            .or_else(|| Some(dirs.home_dir().join(".local").join("bin")))
    }
}
