//! Output formatting for package listing.
//!
//! This module formats installed package information for human-readable or
//! JSON output.

use serde::Serialize;
use std::path::PathBuf;

use crate::scanner::{InstalledPackages, InstalledVersion};
use crate::wrapper::VersionPolicy;

/// Format installed packages for human-readable output.
///
/// The newest version of each package is the active one; older versions only
/// linger after an interrupted upgrade.
///
/// # Examples
///
/// ```
/// use tfc_installer::list_output::format_human;
/// use tfc_installer::scanner::InstalledPackages;
///
/// let installed = InstalledPackages::default();
/// let output = format_human(&installed);
/// assert!(output.contains("Nothing installed"));
/// ```
#[must_use]
pub fn format_human(installed: &InstalledPackages) -> String {
    if installed.is_empty() {
        return String::from(
            "Nothing installed.\n\nRun `tfc-installer` to install the controller CLI.",
        );
    }

    let mut output = String::from("Installed packages:\n");

    for (name, versions) in &installed.by_package {
        output.push('\n');
        output.push_str(&format!("{name}\n"));

        let newest = versions.len().saturating_sub(1);
        for (index, version) in versions.iter().enumerate() {
            let active_marker = if index == newest { " (active)" } else { "" };
            output.push_str(&format!("  {}{active_marker}\n", version.version));
            output.push_str(&format!("    root: {}\n", version.root.display()));
            if let Some(receipt) = &version.receipt {
                output.push_str(&format!("    launcher: {}\n", receipt.launcher.display()));
                output.push_str(&format!("    version policy: {}\n", receipt.version_policy));
            }
        }
    }

    output
}

/// Format installed packages as JSON.
///
/// # Examples
///
/// ```
/// use tfc_installer::list_output::format_json;
/// use tfc_installer::scanner::InstalledPackages;
///
/// let installed = InstalledPackages::default();
/// let json = format_json(&installed);
/// assert!(json.contains("\"packages\""));
/// ```
#[must_use]
pub fn format_json(installed: &InstalledPackages) -> String {
    let json_data = InstalledPackagesJson::from_installed(installed);

    serde_json::to_string_pretty(&json_data).unwrap_or_else(|_| "{}".to_owned())
}

/// JSON-serializable representation of installed packages.
#[derive(Debug, Serialize)]
pub struct InstalledPackagesJson {
    /// Installed packages.
    pub packages: Vec<PackageEntry>,
}

/// One package in JSON output.
#[derive(Debug, Serialize)]
pub struct PackageEntry {
    /// Package name.
    pub name: String,
    /// Newest installed version.
    pub active: Option<String>,
    /// Every installed version, oldest first.
    pub versions: Vec<VersionEntry>,
}

/// One installed version in JSON output.
#[derive(Debug, Serialize)]
pub struct VersionEntry {
    /// Version string.
    pub version: String,
    /// Installation root.
    pub root: PathBuf,
    /// Launcher path, from the receipt.
    pub launcher: Option<PathBuf>,
    /// Version policy, from the receipt.
    pub version_policy: Option<VersionPolicy>,
    /// Install time in Unix seconds, from the receipt.
    pub installed_at: Option<u64>,
}

impl InstalledPackagesJson {
    /// Build the JSON representation from scan results.
    #[must_use]
    pub fn from_installed(installed: &InstalledPackages) -> Self {
        let packages = installed
            .by_package
            .iter()
            .map(|(name, versions)| PackageEntry {
                name: name.clone(),
                active: versions.last().map(|v| v.version.to_string()),
                versions: versions.iter().map(VersionEntry::from).collect(),
            })
            .collect();

        Self { packages }
    }
}

impl From<&InstalledVersion> for VersionEntry {
    fn from(installed: &InstalledVersion) -> Self {
        let receipt = installed.receipt.as_ref();
        Self {
            version: installed.version.to_string(),
            root: installed.root.clone(),
            launcher: receipt.map(|r| r.launcher.clone()),
            version_policy: receipt.map(|r| r.version_policy),
            installed_at: receipt.map(|r| r.installed_at),
        }
    }
}
