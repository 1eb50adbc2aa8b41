//! Scanner for discovering installed packages.
//!
//! Walks `<prefix>/libexec`, treating each directory whose name parses as a
//! version as one installation root, and pairs it with its receipt when one
//! exists.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use camino::Utf8Path;
use log::trace;

use crate::artefact::version::PackageVersion;
use crate::layout::RECEIPT_SUFFIX;
use crate::receipt::InstallReceipt;

/// One installed version of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    /// Installed version.
    pub version: PackageVersion,
    /// Installation root.
    pub root: PathBuf,
    /// Receipt, when present and readable.
    pub receipt: Option<InstallReceipt>,
}

/// Installed versions grouped by package name.
#[derive(Debug, Clone, Default)]
pub struct InstalledPackages {
    /// Map from package name to its versions, oldest first.
    pub by_package: BTreeMap<String, Vec<InstalledVersion>>,
}

impl InstalledPackages {
    /// Returns true if nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_package.is_empty()
    }

    /// Versions installed for `name`, oldest first.
    #[must_use]
    pub fn versions(&self, name: &str) -> &[InstalledVersion] {
        self.by_package.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Scan every package under `libexec_dir`.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn scan_installed(libexec_dir: &Utf8Path) -> io::Result<InstalledPackages> {
    let mut result = InstalledPackages::default();
    if !libexec_dir.exists() {
        return Ok(result);
    }

    for entry in libexec_dir.read_dir_utf8()? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let versions = scan_package(entry.path())?;
        if !versions.is_empty() {
            result.by_package.insert(entry.file_name().to_owned(), versions);
        }
    }

    Ok(result)
}

/// Scan the version roots of one package directory.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn scan_package(package_dir: &Utf8Path) -> io::Result<Vec<InstalledVersion>> {
    let mut versions = Vec::new();
    if !package_dir.is_dir() {
        return Ok(versions);
    }

    for entry in package_dir.read_dir_utf8()? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Ok(version) = PackageVersion::try_from(entry.file_name()) else {
            trace!("skipping non-version directory {}", entry.path());
            continue;
        };
        let receipt_path = package_dir.join(format!("{}{RECEIPT_SUFFIX}", version.as_str()));
        let receipt = InstallReceipt::read(receipt_path.as_std_path())
            .inspect_err(|e| trace!("no usable receipt for {}: {e}", entry.path()))
            .ok();
        versions.push(InstalledVersion {
            version,
            root: entry.path().as_std_path().to_path_buf(),
            receipt,
        });
    }

    versions.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(versions)
}
