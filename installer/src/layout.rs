//! On-disk layout of installed packages under a prefix.
//!
//! ```text
//! <prefix>/bin/<launcher>
//! <prefix>/libexec/<name>/<version>/              installation root
//! <prefix>/libexec/<name>/<version>.receipt.json  install receipt
//! <prefix>/var/lock/<name>.lock
//! ```

use crate::artefact::version::PackageVersion;
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Suffix appended to a version to name its receipt file.
pub const RECEIPT_SUFFIX: &str = ".receipt.json";

/// Paths derived from an installation prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    prefix: Utf8PathBuf,
}

impl InstallLayout {
    /// Create a layout rooted at `prefix`.
    ///
    /// Relative prefixes are resolved against the current directory so the
    /// launcher always records an absolute installation root.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] if the current directory cannot be
    /// determined or is not valid UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfc_installer::artefact::version::PackageVersion;
    /// use tfc_installer::layout::InstallLayout;
    ///
    /// let layout = InstallLayout::new("/usr/local".into())?;
    /// let version = PackageVersion::try_from("1.0.4")?;
    /// assert_eq!(
    ///     layout.install_root("tfc_controller", &version),
    ///     "/usr/local/libexec/tfc_controller/1.0.4"
    /// );
    /// assert_eq!(layout.launcher_path("tfc_controller"), "/usr/local/bin/tfc_controller");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(prefix: Utf8PathBuf) -> Result<Self> {
        if prefix.is_absolute() {
            return Ok(Self { prefix });
        }
        let cwd = std::env::current_dir()?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| {
            InstallerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("current directory is not valid UTF-8: {}", path.display()),
            ))
        })?;
        Ok(Self {
            prefix: cwd.join(prefix),
        })
    }

    /// The prefix every other path hangs off.
    #[must_use]
    pub fn prefix(&self) -> &Utf8Path {
        &self.prefix
    }

    /// Directory on the command path that receives launchers.
    #[must_use]
    pub fn bin_dir(&self) -> Utf8PathBuf {
        self.prefix.join("bin")
    }

    /// Directory holding every package's version roots.
    #[must_use]
    pub fn libexec_dir(&self) -> Utf8PathBuf {
        self.prefix.join("libexec")
    }

    /// Directory holding the version roots of one package.
    #[must_use]
    pub fn package_dir(&self, name: &str) -> Utf8PathBuf {
        self.libexec_dir().join(name)
    }

    /// Installation root for one version of a package.
    #[must_use]
    pub fn install_root(&self, name: &str, version: &PackageVersion) -> Utf8PathBuf {
        self.package_dir(name).join(version.as_str())
    }

    /// Receipt file for one version of a package.
    #[must_use]
    pub fn receipt_path(&self, name: &str, version: &PackageVersion) -> Utf8PathBuf {
        self.package_dir(name)
            .join(format!("{}{RECEIPT_SUFFIX}", version.as_str()))
    }

    /// Launcher path for a launcher name.
    #[must_use]
    pub fn launcher_path(&self, launcher: &str) -> Utf8PathBuf {
        self.bin_dir().join(launcher)
    }

    /// Lock file serializing installs of one package.
    #[must_use]
    pub fn lock_path(&self, name: &str) -> Utf8PathBuf {
        self.prefix.join("var").join("lock").join(format!("{name}.lock"))
    }
}

/// The default prefix: the parent of the user's executable directory
/// (`~/.local` on Linux), falling back to `~/.local`.
#[must_use]
pub fn default_prefix(dirs: &dyn BaseDirs) -> Option<Utf8PathBuf> {
    let prefix = dirs
        .bin_dir()
        .and_then(|bin| bin.parent().map(std::path::Path::to_path_buf))
        .or_else(|| dirs.home_dir().map(|home| home.join(".local")))?;
    Utf8PathBuf::from_path_buf(prefix).ok()
}
