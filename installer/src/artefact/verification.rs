//! Checksum verification for fetched release archives.
//!
//! Verification is a precondition of staging: the pipeline refuses to
//! extract anything whose digest differs from the one the formula declares.
//! The staging step itself trusts its input.

use super::sha256_digest::Sha256Digest;
use crate::error::{InstallerError, Result};
use log::debug;
use std::path::Path;

/// Verify that the file at `archive` hashes to `expected`.
///
/// Returns the computed digest on success.
///
/// # Errors
///
/// Returns [`InstallerError::ChecksumMismatch`] when the digests differ and
/// [`InstallerError::Io`] when the archive cannot be read.
pub fn verify_checksum(expected: &Sha256Digest, archive: &Path) -> Result<Sha256Digest> {
    let actual = Sha256Digest::of_file(archive)?;
    debug!("archive {} hashes to {actual}", archive.display());
    if &actual != expected {
        return Err(InstallerError::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(actual)
}
