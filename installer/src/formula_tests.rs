//! Unit tests for formula parsing and validation.

use super::*;
use rstest::rstest;

const DIGEST: &str = "d5558cd419c8d46bdc958064cb97f963d1ea793866414c025906ec15033512ed";

fn minimal(extra: &str) -> String {
    format!(
        concat!(
            "name = \"tfc_controller\"\n",
            "url = \"https://example.com/v2.0.6.tar.gz\"\n",
            "sha256 = \"{digest}\"\n",
            "version = \"2.0.6\"\n",
            "license = \"MIT\"\n",
            "{extra}"
        ),
        digest = DIGEST,
        extra = extra,
    )
}

#[test]
fn builtin_formula_describes_the_controller_release() {
    let formula = Formula::builtin().expect("built-in formula is valid");

    assert_eq!(formula.name(), "tfc_controller");
    assert_eq!(formula.release().version().as_str(), "1.0.4");
    assert_eq!(formula.release().sha256().as_str(), DIGEST);
    assert_eq!(formula.release().license().as_str(), "MIT");
    assert_eq!(formula.dependencies().required, ["bash", "jq"]);
    assert_eq!(formula.dependencies().optional, ["gum"]);
    assert!(formula.caveats().is_some_and(|text| text.contains("TFE_TOKEN")));
}

#[test]
fn install_settings_default_from_name() {
    let formula = Formula::parse(&minimal("")).expect("minimal formula");
    let install = formula.install();

    assert_eq!(install.entrypoint_dir, "bin");
    assert_eq!(install.entrypoint_depth, EntrypointDepth::Shallow);
    assert_eq!(install.primary_entrypoint, "bin/tfc_controller.sh");
    assert_eq!(install.launcher, "tfc_controller");
    assert_eq!(install.interpreter, "bash");
    assert_eq!(install.version_policy, VersionPolicy::Packaging);
    assert_eq!(install.root_env, "TFC_CONTROLLER_ROOT");
    assert_eq!(install.version_env, "TFC_CONTROLLER_VERSION");
    assert_eq!(install.version_flag, "-V");
    assert!(formula.dependencies().required.is_empty());
}

#[test]
fn install_section_overrides_defaults() {
    let formula = Formula::parse(&minimal(concat!(
        "\n[install]\n",
        "entrypoint_depth = \"recursive\"\n",
        "version_policy = \"payload\"\n",
        "launcher = \"tfc\"\n",
    )))
    .expect("formula with overrides");

    assert_eq!(formula.install().entrypoint_depth, EntrypointDepth::Recursive);
    assert_eq!(formula.install().version_policy, VersionPolicy::Payload);
    assert_eq!(formula.install().launcher, "tfc");
}

#[rstest]
#[case::bad_digest("sha256 = \"abc\"", "invalid SHA-256")]
#[case::bad_url("url = \"ftp://example.com/a.tar.gz\"", "ftp://")]
#[case::bad_version("version = \"v2.0.6\"", "v2.0.6")]
fn descriptor_errors_surface_as_release_errors(#[case] line: &str, #[case] fragment: &str) {
    let key = line.split(' ').next().expect("key");
    let text: String = minimal("")
        .lines()
        .map(|existing| {
            if existing.starts_with(key) {
                line.to_owned()
            } else {
                existing.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let err = Formula::parse(&text).expect_err("descriptor must be rejected");
    assert!(matches!(err, FormulaError::Release(_)), "unexpected: {err:?}");
    assert!(err.to_string().contains(fragment), "message: {err}");
}

#[rstest]
#[case::escaping_entrypoint("primary_entrypoint = \"../outside.sh\"", "install.primary_entrypoint")]
#[case::absolute_dir("entrypoint_dir = \"/usr/bin\"", "install.entrypoint_dir")]
#[case::launcher_with_slash("launcher = \"bin/tfc\"", "install.launcher")]
#[case::bad_env("root_env = \"1ROOT\"", "install.root_env")]
#[case::same_env("root_env = \"X\"\nversion_env = \"X\"", "install.version_env")]
#[case::empty_interpreter("interpreter = \"\"", "install.interpreter")]
fn invalid_install_settings_name_the_field(#[case] setting: &str, #[case] field: &str) {
    let err = Formula::parse(&minimal(&format!("\n[install]\n{setting}\n")))
        .expect_err("setting must be rejected");
    assert!(
        matches!(err, FormulaError::Invalid { field: f, .. } if f == field),
        "unexpected: {err:?}"
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let err = Formula::parse(&minimal("\n[install]\nentrypoints = \"bin\"\n"))
        .expect_err("typo must be rejected");
    assert!(matches!(err, FormulaError::Parse(_)));
}

#[test]
fn load_reads_formula_from_disk() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(temp.path().join("custom.toml")).expect("utf-8 path");
    std::fs::write(&path, minimal("")).expect("write formula");

    let formula = Formula::load(Some(&path)).expect("load formula");
    assert_eq!(formula.release().version().as_str(), "2.0.6");
}

#[test]
fn load_reports_missing_file() {
    let err = Formula::load(Some(Utf8Path::new("/nonexistent/formula.toml")))
        .expect_err("file does not exist");
    assert!(matches!(err, FormulaError::Read { .. }));
}

#[test]
fn load_without_path_uses_builtin() {
    let formula = Formula::load(None).expect("built-in formula");
    assert_eq!(formula, Formula::builtin().expect("built-in formula"));
}
