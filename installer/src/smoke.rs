//! Post-install smoke test.
//!
//! Runs the installed launcher with the formula's version flag and checks the
//! output names the program (and, under the packaging policy, the packaging
//! version). The run has a timeout so a hung script cannot stall the
//! installer.

use crate::artefact::version::PackageVersion;
use crate::error::{InstallerError, Result};
use crate::wrapper::VersionPolicy;
use log::debug;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default timeout for the smoke test.
pub const SMOKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The launcher is always a POSIX `sh` script, so it is run through `sh`
/// directly rather than relying on its shebang.
const LAUNCHER_SHELL: &str = "/bin/sh";

/// Text the launcher's version output must contain.
///
/// # Examples
///
/// ```
/// use tfc_installer::artefact::version::PackageVersion;
/// use tfc_installer::smoke::expected_output;
/// use tfc_installer::wrapper::VersionPolicy;
///
/// let version = PackageVersion::try_from("2.0.6")?;
/// assert_eq!(
///     expected_output("tfc_controller", &version, VersionPolicy::Packaging),
///     "tfc_controller v2.0.6"
/// );
/// assert_eq!(
///     expected_output("tfc_controller", &version, VersionPolicy::Payload),
///     "tfc_controller"
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[must_use]
pub fn expected_output(launcher: &str, version: &PackageVersion, policy: VersionPolicy) -> String {
    match policy {
        VersionPolicy::Packaging => format!("{launcher} v{version}"),
        VersionPolicy::Payload => launcher.to_owned(),
    }
}

/// Run `launcher <version_flag>` and check its standard output.
///
/// Returns the captured standard output on success.
///
/// # Errors
///
/// Returns [`InstallerError::SmokeTest`] if the launcher cannot be started,
/// times out, exits unsuccessfully, or prints output without `expected`.
pub fn run_smoke_test(
    launcher: &Path,
    version_flag: &str,
    expected: &str,
    timeout: Duration,
) -> Result<String> {
    let smoke_error = |reason: String| InstallerError::SmokeTest { reason };

    let mut child = Command::new(LAUNCHER_SHELL)
        .arg(launcher)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| smoke_error(format!("cannot run {}: {e}", launcher.display())))?;

    let Some(status) = child.wait_timeout(timeout)? else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(smoke_error(format!(
            "{} {version_flag} timed out after {} seconds",
            launcher.display(),
            timeout.as_secs()
        )));
    };

    let stdout = child
        .stdout
        .take()
        .map(std::io::read_to_string)
        .transpose()?
        .unwrap_or_default();
    let stderr = child
        .stderr
        .take()
        .map(std::io::read_to_string)
        .transpose()?
        .unwrap_or_default();
    debug!("smoke test output: {}", stdout.trim_end());

    if !status.success() {
        return Err(smoke_error(format!(
            "{} {version_flag} exited with {status}: {}",
            launcher.display(),
            stderr.trim()
        )));
    }
    if !stdout.contains(expected) {
        return Err(smoke_error(format!(
            "expected output containing \"{expected}\", got \"{}\"",
            stdout.trim_end()
        )));
    }
    Ok(stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rstest::rstest;

    fn script(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("tfc_controller");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        (temp, path)
    }

    #[test]
    fn matching_output_passes() {
        let (_temp, launcher) = script("echo \"tfc_controller v2.0.6\"");
        let stdout = run_smoke_test(&launcher, "-V", "tfc_controller v2.0.6", SMOKE_TIMEOUT)
            .expect("smoke test passes");
        assert_eq!(stdout, "tfc_controller v2.0.6\n");
    }

    #[rstest]
    #[case::wrong_version("echo \"tfc_controller v2.0.4\"", "expected output")]
    #[case::failure_exit("echo broken >&2; exit 3", "broken")]
    fn mismatches_are_smoke_test_errors(#[case] body: &str, #[case] fragment: &str) {
        let (_temp, launcher) = script(body);
        let err = run_smoke_test(&launcher, "-V", "tfc_controller v2.0.6", SMOKE_TIMEOUT)
            .expect_err("smoke test fails");
        assert!(matches!(err, InstallerError::SmokeTest { .. }));
        assert!(err.to_string().contains(fragment), "message: {err}");
    }

    #[test]
    fn hung_launcher_times_out() {
        let (_temp, launcher) = script("sleep 5");
        let err = run_smoke_test(&launcher, "-V", "x", Duration::from_millis(200))
            .expect_err("times out");
        assert!(err.to_string().contains("timed out"));
    }
}
