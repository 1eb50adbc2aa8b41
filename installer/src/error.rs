//! Error types for the controller installer.
//!
//! Every variant maps to one installation step so the CLI can tell the user
//! which step failed. None of these errors is recovered locally: the installer
//! surfaces the first failure and aborts.

use crate::artefact::download::DownloadError;
use crate::artefact::error::ArtefactError;
use crate::artefact::extraction::ExtractionError;
use crate::formula::FormulaError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during installation, removal, or verification.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The installation root could not be created or populated.
    #[error("cannot stage files into {}: {source}", path.display())]
    IoFailure {
        /// Path being created or copied when the failure happened.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An entrypoint could not be marked executable.
    #[error("cannot mark {} executable: {source}", path.display())]
    PermissionFailure {
        /// The entrypoint whose mode change was rejected.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The launcher could not be written or made executable.
    #[error("cannot write launcher {}: {source}", path.display())]
    WriteFailure {
        /// Launcher path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Fetching the release archive failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The fetched archive does not match the declared checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest declared by the formula.
        expected: String,
        /// Digest of the fetched archive.
        actual: String,
    },

    /// Unpacking the release archive failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The formula could not be read or validated.
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// A release descriptor value is malformed.
    #[error(transparent)]
    Artefact(#[from] ArtefactError),

    /// A required tool is not available on `PATH`.
    #[error("required tool `{tool}` was not found on PATH")]
    MissingDependency {
        /// Name of the missing tool.
        tool: String,
    },

    /// Another installer process holds the package lock.
    #[error("package is locked by another install; remove {} if no install is running", lock_path.display())]
    Locked {
        /// Path to the held lock file.
        lock_path: PathBuf,
    },

    /// The lock file could not be opened or locked.
    #[error("cannot lock {}: {source}", path.display())]
    LockFailed {
        /// Lock file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The package has no installed versions under the prefix.
    #[error("{name} is not installed")]
    NotInstalled {
        /// Formula name.
        name: String,
    },

    /// The launcher smoke test did not produce the expected output.
    #[error("smoke test failed: {reason}")]
    SmokeTest {
        /// Description of what went wrong.
        reason: String,
    },

    /// An install receipt could not be read or written.
    #[error("install receipt {} is unusable: {reason}", path.display())]
    Receipt {
        /// Receipt path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Writing user-facing output failed.
    #[error("failed to write output")]
    OutputFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation outside the three install steps failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallerError {
    /// Name of the installation step this error belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfc_installer::error::InstallerError;
    ///
    /// let err = InstallerError::MissingDependency { tool: "jq".to_owned() };
    /// assert_eq!(err.step(), "check dependencies");
    /// ```
    #[must_use]
    pub fn step(&self) -> &'static str {
        match self {
            Self::IoFailure { .. } => "stage",
            Self::PermissionFailure { .. } => "normalize permissions",
            Self::WriteFailure { .. } => "generate launcher",
            Self::Download(_) => "download",
            Self::ChecksumMismatch { .. } => "verify checksum",
            Self::Extraction(_) => "extract",
            Self::Formula(_) | Self::Artefact(_) => "load formula",
            Self::MissingDependency { .. } => "check dependencies",
            Self::Locked { .. } | Self::LockFailed { .. } => "lock",
            Self::NotInstalled { .. } => "find installation",
            Self::SmokeTest { .. } => "smoke test",
            Self::Receipt { .. } => "receipt",
            Self::OutputFailed { .. } => "output",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
