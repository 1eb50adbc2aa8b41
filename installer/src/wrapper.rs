//! Launcher generation for installed packages.
//!
//! The launcher is a small POSIX `sh` script placed on the command path. It
//! exports the installation root (and, by policy, the packaging version) and
//! then `exec`s the interpreter on the primary entrypoint with every argument
//! forwarded unchanged. The installer regenerates it on every install; it is
//! never edited in place.

use crate::artefact::version::PackageVersion;
use crate::error::{InstallerError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where the version reported by the wrapped script comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// The launcher exports the packaging-declared version, overriding any
    /// value embedded in the payload or inherited from the caller.
    #[default]
    Packaging,
    /// The launcher unsets the version variable; the payload reports its own
    /// internal version.
    Payload,
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Packaging => f.write_str("packaging"),
            Self::Payload => f.write_str("payload"),
        }
    }
}

/// Inputs for [`generate_launcher`].
///
/// Groups all required inputs so the function signature stays within
/// Clippy's parameter limit.
#[derive(Debug, Clone, Copy)]
pub struct LauncherSpec<'a> {
    /// Where the launcher is written.
    pub launcher_path: &'a Path,
    /// Absolute installation root exported to the script.
    pub install_root: &'a Path,
    /// Packaging-declared version.
    pub version: &'a PackageVersion,
    /// Interpreter that runs the primary entrypoint.
    pub interpreter: &'a Path,
    /// Primary entrypoint, relative to the installation root.
    pub primary_entrypoint: &'a Path,
    /// Name of the installation-root variable.
    pub root_env: &'a str,
    /// Name of the version variable.
    pub version_env: &'a str,
    /// Version precedence rule.
    pub policy: VersionPolicy,
}

/// Quote `value` for a POSIX shell using single quotes.
///
/// # Examples
///
/// ```
/// use tfc_installer::wrapper::shell_quote;
///
/// assert_eq!(shell_quote("/opt/my pkg"), "'/opt/my pkg'");
/// assert_eq!(shell_quote("it's"), r"'it'\''s'");
/// ```
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn utf8_path<'p>(path: &'p Path, launcher_path: &Path) -> Result<&'p str> {
    path.to_str().ok_or_else(|| InstallerError::WriteFailure {
        path: launcher_path.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("path is not valid UTF-8: {}", path.display()),
        ),
    })
}

/// Render the launcher script body.
///
/// # Errors
///
/// Returns [`InstallerError::WriteFailure`] when the installation root is
/// relative or a path cannot be expressed as UTF-8 shell text.
pub fn render_launcher(spec: &LauncherSpec<'_>) -> Result<String> {
    if !spec.install_root.is_absolute() {
        return Err(InstallerError::WriteFailure {
            path: spec.launcher_path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "installation root must be absolute: {}",
                    spec.install_root.display()
                ),
            ),
        });
    }
    let root = utf8_path(spec.install_root, spec.launcher_path)?;
    let interpreter = utf8_path(spec.interpreter, spec.launcher_path)?;
    let entrypoint_path = spec.install_root.join(spec.primary_entrypoint);
    let entrypoint = utf8_path(&entrypoint_path, spec.launcher_path)?;

    let root_env = spec.root_env;
    let version_env = spec.version_env;
    let version_lines = match spec.policy {
        VersionPolicy::Packaging => format!(
            "{version_env}={}\nexport {version_env}\n",
            shell_quote(spec.version.as_str())
        ),
        VersionPolicy::Payload => format!("unset {version_env}\n"),
    };

    Ok(format!(
        concat!(
            "#!/bin/sh\n",
            "# Generated by tfc-installer ({version}); rewritten on every install.\n",
            "{root_env}={root}\n",
            "export {root_env}\n",
            "{version_lines}",
            "exec {interpreter} {entrypoint} \"$@\"\n",
        ),
        version = spec.version,
        root_env = root_env,
        root = shell_quote(root),
        version_lines = version_lines,
        interpreter = shell_quote(interpreter),
        entrypoint = shell_quote(entrypoint),
    ))
}

/// Write the launcher described by `spec` and mark it executable.
///
/// The script is written to a temporary file beside the launcher path and
/// renamed over it, so a concurrent invocation never sees a half-written
/// launcher.
///
/// # Errors
///
/// Returns [`InstallerError::WriteFailure`] if the launcher directory cannot
/// be created or the script cannot be written, made executable, or moved
/// into place.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tfc_installer::artefact::version::PackageVersion;
/// use tfc_installer::wrapper::{LauncherSpec, VersionPolicy, generate_launcher};
///
/// let version = PackageVersion::try_from("2.0.6")?;
/// let spec = LauncherSpec {
///     launcher_path: Path::new("/usr/local/bin/tfc_controller"),
///     install_root: Path::new("/opt/pkg"),
///     version: &version,
///     interpreter: Path::new("/bin/bash"),
///     primary_entrypoint: Path::new("bin/tfc_controller.sh"),
///     root_env: "TFC_CONTROLLER_ROOT",
///     version_env: "TFC_CONTROLLER_VERSION",
///     policy: VersionPolicy::Packaging,
/// };
/// generate_launcher(&spec)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn generate_launcher(spec: &LauncherSpec<'_>) -> Result<PathBuf> {
    let content = render_launcher(spec)?;
    let launcher_path = spec.launcher_path;
    let write_failure = |source: std::io::Error| InstallerError::WriteFailure {
        path: launcher_path.to_path_buf(),
        source,
    };

    let bin_dir = launcher_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(bin_dir).map_err(write_failure)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".launcher-")
        .tempfile_in(bin_dir)
        .map_err(write_failure)?;
    staged
        .write_all(content.as_bytes())
        .and_then(|()| staged.flush())
        .map_err(write_failure)?;
    make_executable(staged.path()).map_err(write_failure)?;
    staged
        .persist(launcher_path)
        .map_err(|e| write_failure(e.error))?;

    debug!("wrote launcher {}", launcher_path.display());
    Ok(launcher_path.to_path_buf())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // rwxr-xr-x
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Checks if a directory is in the PATH environment variable.
#[must_use]
pub fn is_directory_in_path(dir: &Path) -> bool {
    std::env::var_os("PATH")
        .is_some_and(|path| std::env::split_paths(&path).any(|p| p == dir))
}

/// Returns instructions for adding a directory to PATH.
#[must_use]
pub fn path_instructions(bin_dir: &Path) -> String {
    format!(
        concat!(
            "Add the following to your shell profile (~/.bashrc or ~/.zshrc):\n",
            "  export PATH=\"{}:$PATH\""
        ),
        bin_dir.display()
    )
}

#[cfg(test)]
#[path = "wrapper_tests.rs"]
mod tests;
