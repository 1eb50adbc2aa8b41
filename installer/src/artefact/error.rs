//! Error types for release descriptor values.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use thiserror::Error;

/// Errors arising from invalid release descriptor values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A package version is not a semantic version string.
    #[error("invalid package version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A source URL is empty or uses an unsupported scheme.
    #[error("invalid source URL \"{value}\": {reason}")]
    InvalidSourceUrl {
        /// The rejected URL.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A license identifier is empty or contains whitespace.
    #[error("invalid license identifier \"{value}\"")]
    InvalidLicense {
        /// The rejected identifier.
        value: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
