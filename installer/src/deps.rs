//! Runtime dependency checks for packaged scripts.
//!
//! The controller script needs `bash` and `jq` at run time and can use `gum`
//! for prettier output when present. The installer cannot install those
//! tools; it checks for them on `PATH` so a missing requirement is reported
//! before anything is staged, and resolves the launcher's interpreter.

use crate::error::{InstallerError, Result};
use crate::formula::Dependencies;
use std::path::{Path, PathBuf};

/// Abstraction for locating executables.
#[cfg_attr(test, mockall::automock)]
pub trait ToolProbe {
    /// Return the absolute path of `tool` if it can be found.
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// Searches the directories listed in `PATH`.
///
/// # Examples
///
/// ```no_run
/// use tfc_installer::deps::{PathProbe, ToolProbe};
///
/// let probe = PathProbe;
/// if let Some(bash) = probe.locate("bash") {
///     println!("bash is at {}", bash.display());
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PathProbe;

impl ToolProbe for PathProbe {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(tool))
            .find(|candidate| is_executable_file(candidate))
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

/// Availability of a formula's runtime tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyStatus {
    /// Required tools that were not found.
    pub missing_required: Vec<String>,
    /// Optional tools that were not found.
    pub missing_optional: Vec<String>,
}

impl DependencyStatus {
    /// Returns `true` if every required tool was found.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfc_installer::deps::DependencyStatus;
    ///
    /// let status = DependencyStatus {
    ///     missing_required: Vec::new(),
    ///     missing_optional: vec!["gum".to_owned()],
    /// };
    /// assert!(status.all_required_installed());
    /// ```
    #[must_use]
    pub fn all_required_installed(&self) -> bool {
        self.missing_required.is_empty()
    }

    /// Convert the status into an error naming the first missing tool.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::MissingDependency`] when a required tool is
    /// missing.
    pub fn require_all(&self) -> Result<()> {
        match self.missing_required.first() {
            Some(tool) => Err(InstallerError::MissingDependency { tool: tool.clone() }),
            None => Ok(()),
        }
    }
}

/// Check which of the formula's tools are available.
#[must_use]
pub fn check_dependencies(dependencies: &Dependencies, probe: &dyn ToolProbe) -> DependencyStatus {
    let missing = |tools: &[String]| -> Vec<String> {
        tools
            .iter()
            .filter(|tool| probe.locate(tool).is_none())
            .cloned()
            .collect()
    };
    DependencyStatus {
        missing_required: missing(&dependencies.required),
        missing_optional: missing(&dependencies.optional),
    }
}

/// Resolve the interpreter named by a formula to an absolute path.
///
/// Absolute paths are used as given. Bare names are looked up with `probe`
/// at install time, so the launcher records the interpreter that existed
/// when it was generated.
///
/// # Errors
///
/// Returns [`InstallerError::MissingDependency`] when a bare name cannot be
/// found.
pub fn resolve_interpreter(interpreter: &str, probe: &dyn ToolProbe) -> Result<PathBuf> {
    let as_path = Path::new(interpreter);
    if as_path.is_absolute() {
        return Ok(as_path.to_path_buf());
    }
    probe
        .locate(interpreter)
        .ok_or_else(|| InstallerError::MissingDependency {
            tool: interpreter.to_owned(),
        })
}
