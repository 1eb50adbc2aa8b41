//! Output formatting for the installer CLI.
//!
//! Progress and summaries go to stderr so `list --json` output on stdout
//! stays machine-readable.

use crate::permissions::EntrypointDepth;
use crate::wrapper::VersionPolicy;
use camino::Utf8Path;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Format a success message after installation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tfc_installer::output::success_message;
///
/// let msg = success_message("tfc_controller", "2.0.6", Path::new("/usr/local/bin/tfc_controller"));
/// assert_eq!(msg, "Installed tfc_controller 2.0.6 as /usr/local/bin/tfc_controller");
/// ```
#[must_use]
pub fn success_message(name: &str, version: &str, launcher: &std::path::Path) -> String {
    format!("Installed {name} {version} as {}", launcher.display())
}

/// Format the caveats block printed after installation.
#[must_use]
pub fn caveats_text(caveats: &str) -> String {
    let body: Vec<String> = caveats.lines().map(|line| format!("  {line}")).collect();
    format!("==> Caveats\n{}", body.join("\n"))
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use tfc_installer::output::DryRunInfo;
/// use tfc_installer::permissions::EntrypointDepth;
/// use tfc_installer::wrapper::VersionPolicy;
///
/// let root = Utf8PathBuf::from("/home/user/.local/libexec/tfc_controller/1.0.4");
/// let launcher = Utf8PathBuf::from("/home/user/.local/bin/tfc_controller");
///
/// let info = DryRunInfo {
///     name: "tfc_controller",
///     version: "1.0.4",
///     source: "https://example.com/v1.0.4.tar.gz",
///     install_root: &root,
///     launcher: &launcher,
///     interpreter: "bash",
///     version_policy: VersionPolicy::Packaging,
///     entrypoint_depth: EntrypointDepth::Shallow,
///     skip_deps: false,
///     skip_test: false,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("1.0.4"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Package name.
    pub name: &'a str,
    /// Version to install.
    pub version: &'a str,
    /// Archive URL or local path.
    pub source: &'a str,
    /// Installation root.
    pub install_root: &'a Utf8Path,
    /// Launcher path.
    pub launcher: &'a Utf8Path,
    /// Interpreter name or path.
    pub interpreter: &'a str,
    /// Version precedence rule.
    pub version_policy: VersionPolicy,
    /// Entrypoint discovery depth.
    pub entrypoint_depth: EntrypointDepth,
    /// Whether the dependency check is skipped.
    pub skip_deps: bool,
    /// Whether the smoke test is skipped.
    pub skip_test: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let depth = match self.entrypoint_depth {
            EntrypointDepth::Shallow => "shallow",
            EntrypointDepth::Recursive => "recursive",
        };
        [
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Package: {} {}", self.name, self.version),
            format!("Source: {}", self.source),
            format!("Installation root: {}", self.install_root),
            format!("Launcher: {}", self.launcher),
            format!("Interpreter: {}", self.interpreter),
            format!("Version policy: {}", self.version_policy),
            format!("Entrypoint depth: {depth}"),
            format!("Skip deps: {}", self.skip_deps),
            format!("Skip test: {}", self.skip_test),
        ]
        .join("\n")
    }
}
