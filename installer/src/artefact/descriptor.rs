//! Release descriptor: the immutable identity of one installable archive.

use super::error::{ArtefactError, Result};
use super::sha256_digest::Sha256Digest;
use super::version::PackageVersion;
use std::fmt;
use std::path::PathBuf;

/// Schemes accepted for release archive URLs.
const SUPPORTED_SCHEMES: [&str; 3] = ["https://", "http://", "file://"];

/// File name used when a URL has no usable final path segment.
const FALLBACK_ARCHIVE_NAME: &str = "source.tar.gz";

/// A validated release archive URL.
///
/// # Examples
///
/// ```
/// use tfc_installer::artefact::descriptor::SourceUrl;
///
/// let url = SourceUrl::try_from(
///     "https://github.com/raymonepping/homebrew-tfc-controller-cli/archive/refs/tags/v1.0.4.tar.gz",
/// )
/// .expect("valid URL");
/// assert_eq!(url.archive_file_name(), "v1.0.4.tar.gz");
/// assert!(url.local_path().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Return the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the local filesystem path for `file://` URLs.
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix("file://").map(PathBuf::from)
    }

    /// Return the final path segment, used to name the downloaded file.
    #[must_use]
    pub fn archive_file_name(&self) -> &str {
        let without_query = self.0.split(['?', '#']).next().unwrap_or_default();
        without_query
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(FALLBACK_ARCHIVE_NAME)
    }
}

impl TryFrom<&str> for SourceUrl {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        let Some(scheme) = SUPPORTED_SCHEMES
            .iter()
            .find(|scheme| value.starts_with(**scheme))
        else {
            return Err(ArtefactError::InvalidSourceUrl {
                value: value.to_owned(),
                reason: format!("expected one of: {}", SUPPORTED_SCHEMES.join(", ")),
            });
        };
        if value.len() == scheme.len() || value.chars().any(char::is_whitespace) {
            return Err(ArtefactError::InvalidSourceUrl {
                value: value.to_owned(),
                reason: "URL must have a non-empty location without whitespace".to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An SPDX-style license identifier such as `MIT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LicenseId(String);

impl LicenseId {
    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for LicenseId {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(ArtefactError::InvalidLicense {
                value: value.to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies exactly one installable release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    url: SourceUrl,
    sha256: Sha256Digest,
    version: PackageVersion,
    license: LicenseId,
}

impl ReleaseDescriptor {
    /// Assemble a descriptor from validated parts.
    #[must_use]
    pub fn new(
        url: SourceUrl,
        sha256: Sha256Digest,
        version: PackageVersion,
        license: LicenseId,
    ) -> Self {
        Self {
            url,
            sha256,
            version,
            license,
        }
    }

    /// Where the release archive is fetched from.
    #[must_use]
    pub fn url(&self) -> &SourceUrl {
        &self.url
    }

    /// Expected digest of the release archive.
    #[must_use]
    pub fn sha256(&self) -> &Sha256Digest {
        &self.sha256
    }

    /// Packaging-declared version.
    #[must_use]
    pub fn version(&self) -> &PackageVersion {
        &self.version
    }

    /// License of the packaged payload.
    #[must_use]
    pub fn license(&self) -> &LicenseId {
        &self.license
    }
}
