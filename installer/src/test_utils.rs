//! Shared test utilities for the installer crate.

use crate::artefact::sha256_digest::Sha256Digest;
use crate::deps::ToolProbe;
use crate::formula::Formula;
use crate::wrapper::VersionPolicy;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Location of the primary entrypoint inside controller release archives.
pub const CONTROLLER_SCRIPT_PATH: &str = "bin/tfc_controller.sh";

/// A POSIX `sh` stand-in for the controller script.
///
/// - `-V` / `--version` prints `tfc_controller v<version>`, preferring
///   `TFC_CONTROLLER_VERSION` over `internal_version`;
/// - `--print-root` prints `TFC_CONTROLLER_ROOT`;
/// - `--exit N` exits with status `N`;
/// - anything else echoes each argument followed by a NUL byte.
#[must_use]
pub fn controller_script(internal_version: &str) -> String {
    format!(
        r#"#!/bin/sh
INTERNAL_VERSION="{internal_version}"
case "$1" in
  -V|--version)
    printf 'tfc_controller v%s\n' "${{TFC_CONTROLLER_VERSION:-$INTERNAL_VERSION}}"
    exit 0
    ;;
  --print-root)
    printf '%s\n' "$TFC_CONTROLLER_ROOT"
    exit 0
    ;;
  --exit)
    exit "$2"
    ;;
esac
for arg in "$@"; do
  printf '%s\000' "$arg"
done
"#
    )
}

/// Builder for `.tar.gz` release archives used as test input.
///
/// # Examples
///
/// ```
/// use tfc_installer::test_utils::ArchiveFixture;
///
/// let temp = tempfile::tempdir().expect("temp dir");
/// let archive = temp.path().join("release.tar.gz");
/// ArchiveFixture::controller("2.0.4")
///     .write_tar_gz(&archive)
///     .expect("write archive");
/// assert!(archive.exists());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveFixture {
    top_level: Option<String>,
    files: BTreeMap<String, (Vec<u8>, u32)>,
}

impl ArchiveFixture {
    /// Create an empty fixture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The controller layout: a non-executable `bin/tfc_controller.sh`
    /// reporting `internal_version`, plus `lib/helpers.sh`, wrapped in a
    /// release-style top-level directory.
    #[must_use]
    pub fn controller(internal_version: &str) -> Self {
        Self::new()
            .with_top_level(&format!("tfc_controller-{internal_version}"))
            .file(CONTROLLER_SCRIPT_PATH, &controller_script(internal_version), 0o644)
            .file("lib/helpers.sh", "tfc_helper() { :; }\n", 0o644)
    }

    /// Wrap every entry in a single top-level directory.
    #[must_use]
    pub fn with_top_level(mut self, name: &str) -> Self {
        self.top_level = Some(name.to_owned());
        self
    }

    /// Add a file with the given contents and mode.
    #[must_use]
    pub fn file(mut self, path: &str, contents: &str, mode: u32) -> Self {
        self.files
            .insert(path.to_owned(), (contents.as_bytes().to_vec(), mode));
        self
    }

    /// Paths and contents of the payload, relative to the archive root.
    #[must_use]
    pub fn payload(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.files
            .iter()
            .map(|(path, (contents, _))| (PathBuf::from(path), contents.clone()))
            .collect()
    }

    /// Write the payload, unwrapped, into `dir`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while writing files.
    pub fn write_tree(&self, dir: &Path) -> std::io::Result<()> {
        for (path, (contents, _)) in &self.files {
            let dest = dir.join(path);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(dest, contents)?;
        }
        Ok(())
    }

    /// Write the fixture as a gzip-compressed tarball and return its digest.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while building the archive.
    pub fn write_tar_gz(&self, archive_path: &Path) -> std::io::Result<Sha256Digest> {
        let output = std::fs::File::create(archive_path)?;
        let encoder = GzEncoder::new(output, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (path, (contents, mode)) in &self.files {
            let entry_path = match &self.top_level {
                Some(top) => format!("{top}/{path}"),
                None => path.clone(),
            };
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(*mode);
            header.set_entry_type(tar::EntryType::Regular);
            builder.append_data(&mut header, entry_path, contents.as_slice())?;
        }

        let encoder = builder.into_inner()?;
        encoder.finish()?;
        Sha256Digest::of_file(archive_path)
    }
}

/// Render formula TOML for a fixture archive.
#[must_use]
pub fn formula_toml(archive: &Path, sha256: &Sha256Digest, version: &str, policy: VersionPolicy) -> String {
    format!(
        r#"name = "tfc_controller"
desc = "Bash-powered Terraform Cloud controller CLI"
homepage = "https://github.com/raymonepping/tfc_controller"
url = "file://{archive}"
sha256 = "{sha256}"
license = "MIT"
version = "{version}"

[install]
interpreter = "/bin/sh"
version_policy = "{policy}"
"#,
        archive = archive.display(),
    )
}

/// Parse a formula for a fixture archive.
///
/// # Panics
///
/// Panics if the rendered TOML does not validate, which indicates a broken
/// fixture rather than a behaviour under test.
#[must_use]
pub fn fixture_formula(
    archive: &Path,
    sha256: &Sha256Digest,
    version: &str,
    policy: VersionPolicy,
) -> Formula {
    Formula::parse(&formula_toml(archive, sha256, version, policy))
        .unwrap_or_else(|e| panic!("fixture formula must parse: {e}"))
}

/// A [`ToolProbe`] that only knows the tools it was given.
#[derive(Debug, Clone, Default)]
pub struct StubProbe {
    tools: BTreeMap<String, PathBuf>,
}

impl StubProbe {
    /// Create a probe that reports each named tool under `/stub/bin`.
    #[must_use]
    pub fn with_tools(tools: &[&str]) -> Self {
        Self {
            tools: tools
                .iter()
                .map(|tool| ((*tool).to_owned(), Path::new("/stub/bin").join(tool)))
                .collect(),
        }
    }
}

impl ToolProbe for StubProbe {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        self.tools.get(tool).cloned()
    }
}
