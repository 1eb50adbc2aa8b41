//! Release descriptor, retrieval, verification, and extraction.
//!
//! A formula names exactly one release archive. This module models that
//! release as validated values and provides the steps that turn it into a
//! directory of files ready for staging:
//!
//! - [`error`] - Semantic error types for validation failures.
//! - [`descriptor`] - Release descriptor (`ReleaseDescriptor`, `SourceUrl`, `LicenseId`).
//! - [`sha256_digest`] - SHA-256 digest newtype (`Sha256Digest`).
//! - [`version`] - Package version newtype (`PackageVersion`).
//! - [`download`] - Archive fetch trait and HTTP implementation.
//! - [`verification`] - Checksum verification before extraction.
//! - [`extraction`] - Archive extraction with path traversal protection.

pub mod descriptor;
pub mod download;
pub mod error;
pub mod extraction;
pub mod sha256_digest;
pub mod verification;
pub mod version;
