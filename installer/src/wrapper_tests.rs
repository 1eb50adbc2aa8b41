//! Unit tests for launcher rendering and generation.

use super::*;
use crate::test_utils::{CONTROLLER_SCRIPT_PATH, controller_script};
use rstest::rstest;
use tempfile::TempDir;

const ROOT_ENV: &str = "TFC_CONTROLLER_ROOT";
const VERSION_ENV: &str = "TFC_CONTROLLER_VERSION";

fn version(value: &str) -> PackageVersion {
    PackageVersion::try_from(value).expect("valid version")
}

fn spec<'a>(
    launcher_path: &'a Path,
    install_root: &'a Path,
    version: &'a PackageVersion,
    policy: VersionPolicy,
) -> LauncherSpec<'a> {
    LauncherSpec {
        launcher_path,
        install_root,
        version,
        interpreter: Path::new("/bin/sh"),
        primary_entrypoint: Path::new(CONTROLLER_SCRIPT_PATH),
        root_env: ROOT_ENV,
        version_env: VERSION_ENV,
        policy,
    }
}

#[test]
fn packaging_policy_exports_root_and_version() {
    let version = version("2.0.6");
    let rendered = render_launcher(&spec(
        Path::new("/usr/local/bin/tfc_controller"),
        Path::new("/opt/pkg"),
        &version,
        VersionPolicy::Packaging,
    ))
    .expect("render");

    assert!(rendered.starts_with("#!/bin/sh\n"));
    assert!(rendered.contains("TFC_CONTROLLER_ROOT='/opt/pkg'\nexport TFC_CONTROLLER_ROOT\n"));
    assert!(rendered.contains("TFC_CONTROLLER_VERSION='2.0.6'\nexport TFC_CONTROLLER_VERSION\n"));
    assert!(rendered.ends_with("exec '/bin/sh' '/opt/pkg/bin/tfc_controller.sh' \"$@\"\n"));
}

#[test]
fn payload_policy_unsets_version() {
    let version = version("2.0.6");
    let rendered = render_launcher(&spec(
        Path::new("/usr/local/bin/tfc_controller"),
        Path::new("/opt/pkg"),
        &version,
        VersionPolicy::Payload,
    ))
    .expect("render");

    assert!(rendered.contains("unset TFC_CONTROLLER_VERSION\n"));
    assert!(!rendered.contains("TFC_CONTROLLER_VERSION='"));
    assert!(rendered.contains("export TFC_CONTROLLER_ROOT\n"));
}

#[rstest]
#[case("plain", "'plain'")]
#[case("with space", "'with space'")]
#[case("it's", r"'it'\''s'")]
#[case("$HOME", "'$HOME'")]
fn shell_quote_neutralizes_metacharacters(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(shell_quote(input), expected);
}

#[test]
fn is_directory_in_path_returns_false_for_random_dir() {
    let temp = TempDir::new().expect("failed to create temp dir");
    assert!(!is_directory_in_path(temp.path()));
}

#[test]
fn path_instructions_contains_directory() {
    let instructions = path_instructions(Path::new("/test/bin"));
    assert!(instructions.contains("/test/bin"));
}

#[test]
fn version_policy_displays_lowercase() {
    assert_eq!(VersionPolicy::Packaging.to_string(), "packaging");
    assert_eq!(VersionPolicy::Payload.to_string(), "payload");
}

#[test]
fn relative_installation_root_is_rejected() {
    let temp = TempDir::new().expect("temp dir");
    let launcher = temp.path().join("bin").join("tfc_controller");
    let version = version("2.0.6");

    let err = generate_launcher(&spec(
        &launcher,
        Path::new("libexec/tfc_controller/2.0.6"),
        &version,
        VersionPolicy::Packaging,
    ))
    .expect_err("relative root");

    assert!(matches!(err, InstallerError::WriteFailure { ref path, .. } if path == &launcher));
    assert!(err.to_string().contains("must be absolute"));
    assert!(!launcher.exists());
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::process::Command;

    struct Installed {
        _temp: TempDir,
        root: PathBuf,
        launcher: PathBuf,
    }

    fn install(policy: VersionPolicy, version_value: &str) -> Installed {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().join("opt pkg").join("it's");
        let script = root.join(CONTROLLER_SCRIPT_PATH);
        std::fs::create_dir_all(script.parent().expect("script parent")).expect("create bin");
        std::fs::write(&script, controller_script("2.0.4")).expect("write script");

        let launcher = temp.path().join("bin").join("tfc_controller");
        let version = version(version_value);
        generate_launcher(&spec(&launcher, &root, &version, policy)).expect("generate launcher");

        Installed {
            _temp: temp,
            root,
            launcher,
        }
    }

    fn run(launcher: &Path, args: &[&str]) -> std::process::Output {
        Command::new("/bin/sh")
            .arg(launcher)
            .args(args)
            .env_remove(VERSION_ENV)
            .output()
            .expect("run launcher")
    }

    #[test]
    fn launcher_is_executable() {
        let installed = install(VersionPolicy::Packaging, "2.0.6");
        let mode = std::fs::metadata(&installed.launcher)
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn regeneration_replaces_previous_launcher() {
        let installed = install(VersionPolicy::Packaging, "2.0.6");
        let newer = version("2.1.0");
        generate_launcher(&spec(
            &installed.launcher,
            &installed.root,
            &newer,
            VersionPolicy::Packaging,
        ))
        .expect("regenerate");

        let content = std::fs::read_to_string(&installed.launcher).expect("read launcher");
        assert!(content.contains("'2.1.0'"));
        assert!(!content.contains("'2.0.6'"));
    }

    #[test]
    fn packaging_version_wins_over_payload() {
        let installed = install(VersionPolicy::Packaging, "2.0.6");
        let output = run(&installed.launcher, &["-V"]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("tfc_controller v2.0.6"), "stdout: {stdout}");
        assert!(!stdout.contains("v2.0.4"));
    }

    #[test]
    fn packaging_version_overrides_inherited_environment() {
        let installed = install(VersionPolicy::Packaging, "2.0.6");
        let output = Command::new("/bin/sh")
            .arg(&installed.launcher)
            .arg("-V")
            .env(VERSION_ENV, "9.9.9")
            .output()
            .expect("run launcher");
        assert!(String::from_utf8_lossy(&output.stdout).contains("tfc_controller v2.0.6"));
    }

    #[test]
    fn payload_policy_reports_internal_version() {
        let installed = install(VersionPolicy::Payload, "2.0.6");
        let output = Command::new("/bin/sh")
            .arg(&installed.launcher)
            .arg("-V")
            .env(VERSION_ENV, "9.9.9")
            .output()
            .expect("run launcher");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("tfc_controller v2.0.4"), "stdout: {stdout}");
    }

    #[test]
    fn root_variable_points_at_installation_root() {
        let installed = install(VersionPolicy::Packaging, "2.0.6");
        let output = run(&installed.launcher, &["--print-root"]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.trim_end(), installed.root.to_str().expect("utf-8 root"));
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::single(&["orgs"])]
    #[case::spaces(&["show", "my workspace", "  padded  "])]
    #[case::quotes(&["it's", "\"double\"", "back\\slash"])]
    #[case::expansions(&["$HOME", "*", "$(id)", "`id`", "a;b|c&d"])]
    #[case::empty_string(&["", "after-empty"])]
    #[case::newline(&["line1\nline2"])]
    fn arguments_pass_through_unmodified(#[case] args: &[&str]) {
        let installed = install(VersionPolicy::Packaging, "2.0.6");
        let output = run(&installed.launcher, args);
        assert!(output.status.success());

        let received: Vec<String> = output
            .stdout
            .split(|byte| *byte == 0)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect();
        // Each argument is NUL-terminated, leaving one empty trailing chunk.
        let (trailer, forwarded) = received.split_last().expect("at least one chunk");
        assert!(trailer.is_empty());
        assert_eq!(forwarded, args);
    }

    #[test]
    fn exit_code_is_propagated() {
        let installed = install(VersionPolicy::Packaging, "2.0.6");
        let output = run(&installed.launcher, &["--exit", "7"]);
        assert_eq!(output.status.code(), Some(7));
    }

    #[test]
    fn unwritable_launcher_directory_is_a_write_failure() {
        let temp = TempDir::new().expect("temp dir");
        let blocker = temp.path().join("bin");
        std::fs::write(&blocker, "not a directory").expect("write blocker");
        let launcher = blocker.join("tfc_controller");
        let version = version("2.0.6");

        let err = generate_launcher(&spec(
            &launcher,
            temp.path(),
            &version,
            VersionPolicy::Packaging,
        ))
        .expect_err("launcher dir is a file");
        assert!(matches!(err, InstallerError::WriteFailure { .. }));
    }
}
