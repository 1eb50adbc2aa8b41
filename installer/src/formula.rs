//! Formula loading and validation.
//!
//! A formula is the configuration that drives one parameterized install: the
//! release descriptor plus how to lay the release out on disk. Formulas are
//! TOML documents; the controller's formula is compiled into the binary and
//! can be replaced with `--formula <file>`.
//!
//! ```toml
//! name = "tfc_controller"
//! url = "https://github.com/.../v1.0.4.tar.gz"
//! sha256 = "d5558cd4..."
//! version = "1.0.4"
//! license = "MIT"
//!
//! [dependencies]
//! required = ["bash", "jq"]
//! optional = ["gum"]
//!
//! [install]
//! primary_entrypoint = "bin/tfc_controller.sh"
//! version_policy = "packaging"
//! ```

use crate::artefact::descriptor::{LicenseId, ReleaseDescriptor, SourceUrl};
use crate::artefact::error::ArtefactError;
use crate::artefact::sha256_digest::Sha256Digest;
use crate::artefact::version::PackageVersion;
use crate::permissions::EntrypointDepth;
use crate::wrapper::VersionPolicy;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// The built-in formula for the Terraform Cloud controller CLI.
pub const BUILTIN_FORMULA: &str = include_str!("../formulas/tfc_controller.toml");

/// Errors arising from loading or validating a formula.
#[derive(Debug, Error)]
pub enum FormulaError {
    /// The formula file could not be read.
    #[error("cannot read formula {path}: {source}")]
    Read {
        /// Formula path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The formula is not valid TOML or has unknown keys.
    #[error("cannot parse formula: {0}")]
    Parse(#[from] toml::de::Error),

    /// A release descriptor field is malformed.
    #[error("invalid release: {0}")]
    Release(#[from] ArtefactError),

    /// An install setting is malformed.
    #[error("invalid formula field `{field}`: {reason}")]
    Invalid {
        /// Dotted key of the offending field.
        field: &'static str,
        /// Description of the validation failure.
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFormula {
    name: String,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    url: String,
    sha256: String,
    version: String,
    license: String,
    #[serde(default)]
    dependencies: Dependencies,
    #[serde(default)]
    install: RawInstall,
    #[serde(default)]
    caveats: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawInstall {
    entrypoint_dir: Utf8PathBuf,
    entrypoint_depth: EntrypointDepth,
    primary_entrypoint: Utf8PathBuf,
    launcher: Option<String>,
    interpreter: String,
    version_policy: VersionPolicy,
    root_env: Option<String>,
    version_env: Option<String>,
    version_flag: String,
}

impl Default for RawInstall {
    fn default() -> Self {
        Self {
            entrypoint_dir: Utf8PathBuf::from("bin"),
            entrypoint_depth: EntrypointDepth::default(),
            primary_entrypoint: Utf8PathBuf::from("bin/tfc_controller.sh"),
            launcher: None,
            interpreter: "bash".to_owned(),
            version_policy: VersionPolicy::default(),
            root_env: None,
            version_env: None,
            version_flag: "-V".to_owned(),
        }
    }
}

/// Tools the packaged script needs at run time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dependencies {
    /// Tools without which the script cannot work.
    pub required: Vec<String>,
    /// Tools that only improve presentation.
    pub optional: Vec<String>,
}

/// How a release is laid out on disk and launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSettings {
    /// Entrypoint directory, relative to the installation root.
    pub entrypoint_dir: Utf8PathBuf,
    /// Entrypoint discovery depth.
    pub entrypoint_depth: EntrypointDepth,
    /// Script the launcher runs, relative to the installation root.
    pub primary_entrypoint: Utf8PathBuf,
    /// File name of the launcher on the command path.
    pub launcher: String,
    /// Interpreter name or absolute path.
    pub interpreter: String,
    /// Version precedence rule.
    pub version_policy: VersionPolicy,
    /// Installation-root variable exported by the launcher.
    pub root_env: String,
    /// Version variable exported by the launcher.
    pub version_env: String,
    /// Flag that makes the script print its version.
    pub version_flag: String,
}

/// A validated formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    name: String,
    desc: Option<String>,
    homepage: Option<String>,
    release: ReleaseDescriptor,
    dependencies: Dependencies,
    install: InstallSettings,
    caveats: Option<String>,
}

impl Formula {
    /// Parse and validate a formula from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError`] when the TOML is malformed or a field fails
    /// validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfc_installer::formula::{BUILTIN_FORMULA, Formula};
    ///
    /// let formula = Formula::parse(BUILTIN_FORMULA)?;
    /// assert_eq!(formula.name(), "tfc_controller");
    /// assert_eq!(formula.install().launcher, "tfc_controller");
    /// # Ok::<(), tfc_installer::formula::FormulaError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let raw: RawFormula = toml::from_str(text)?;
        Self::from_raw(raw)
    }

    /// Load the built-in controller formula.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError`] if the embedded formula fails validation.
    pub fn builtin() -> Result<Self, FormulaError> {
        Self::parse(BUILTIN_FORMULA)
    }

    /// Read a formula from disk, or the built-in one when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError::Read`] when the file cannot be read, or any
    /// validation error from [`Formula::parse`].
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, FormulaError> {
        let Some(path) = path else {
            return Self::builtin();
        };
        let text = std::fs::read_to_string(path).map_err(|source| FormulaError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }

    fn from_raw(raw: RawFormula) -> Result<Self, FormulaError> {
        let name = validate_name("name", raw.name)?;
        let release = ReleaseDescriptor::new(
            SourceUrl::try_from(raw.url.as_str())?,
            Sha256Digest::try_from(raw.sha256)?,
            PackageVersion::try_from(raw.version)?,
            LicenseId::try_from(raw.license.as_str())?,
        );

        let install = raw.install;
        let launcher = validate_name("install.launcher", install.launcher.unwrap_or_else(|| name.clone()))?;
        let env_prefix = name.to_ascii_uppercase().replace(['-', '.'], "_");
        let root_env = validate_env_name(
            "install.root_env",
            install.root_env.unwrap_or_else(|| format!("{env_prefix}_ROOT")),
        )?;
        let version_env = validate_env_name(
            "install.version_env",
            install
                .version_env
                .unwrap_or_else(|| format!("{env_prefix}_VERSION")),
        )?;
        if root_env == version_env {
            return Err(FormulaError::Invalid {
                field: "install.version_env",
                reason: "must differ from install.root_env".to_owned(),
            });
        }
        if install.interpreter.is_empty() {
            return Err(FormulaError::Invalid {
                field: "install.interpreter",
                reason: "must not be empty".to_owned(),
            });
        }
        if install.version_flag.is_empty() {
            return Err(FormulaError::Invalid {
                field: "install.version_flag",
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(Self {
            name,
            desc: raw.desc,
            homepage: raw.homepage,
            release,
            dependencies: raw.dependencies,
            install: InstallSettings {
                entrypoint_dir: validate_relative("install.entrypoint_dir", install.entrypoint_dir)?,
                entrypoint_depth: install.entrypoint_depth,
                primary_entrypoint: validate_relative(
                    "install.primary_entrypoint",
                    install.primary_entrypoint,
                )?,
                launcher,
                interpreter: install.interpreter,
                version_policy: install.version_policy,
                root_env,
                version_env,
                version_flag: install.version_flag,
            },
            caveats: raw.caveats,
        })
    }

    /// Package name; also names the directory under `libexec`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description.
    #[must_use]
    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    /// Project homepage.
    #[must_use]
    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }

    /// The release this formula installs.
    #[must_use]
    pub fn release(&self) -> &ReleaseDescriptor {
        &self.release
    }

    /// Runtime tool requirements.
    #[must_use]
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Layout and launch settings.
    #[must_use]
    pub fn install(&self) -> &InstallSettings {
        &self.install
    }

    /// Mutable layout and launch settings, for command-line overrides.
    pub fn install_mut(&mut self) -> &mut InstallSettings {
        &mut self.install
    }

    /// Post-install notes for the user.
    #[must_use]
    pub fn caveats(&self) -> Option<&str> {
        self.caveats.as_deref()
    }
}

fn validate_name(field: &'static str, value: String) -> Result<String, FormulaError> {
    let valid = !value.is_empty()
        && !value.starts_with('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(value)
    } else {
        Err(FormulaError::Invalid {
            field,
            reason: format!("\"{value}\" must be a plain file name of [A-Za-z0-9_.-]"),
        })
    }
}

fn validate_env_name(field: &'static str, value: String) -> Result<String, FormulaError> {
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(value)
    } else {
        Err(FormulaError::Invalid {
            field,
            reason: format!("\"{value}\" is not a valid environment variable name"),
        })
    }
}

fn validate_relative(field: &'static str, value: Utf8PathBuf) -> Result<Utf8PathBuf, FormulaError> {
    let stays_inside = value.as_str() != ""
        && value
            .components()
            .all(|component| matches!(component, Utf8Component::Normal(_) | Utf8Component::CurDir));
    if stays_inside {
        Ok(value)
    } else {
        Err(FormulaError::Invalid {
            field,
            reason: format!("\"{value}\" must be a relative path inside the installation root"),
        })
    }
}

#[cfg(test)]
#[path = "formula_tests.rs"]
mod tests;
