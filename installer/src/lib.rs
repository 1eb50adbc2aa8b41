//! Installer library for the Terraform Cloud controller CLI.
//!
//! This crate takes a release archive of the `tfc_controller` bash script
//! bundle to a working command: it verifies the archive, stages it into an
//! isolated installation root, marks its entrypoints executable and writes a
//! launcher that forwards every argument to the real script. It is used by
//! the `tfc-installer` CLI binary and can be consumed programmatically for
//! testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Release descriptor, download, verification and extraction
//! - [`cli`] - Command-line argument definitions
//! - [`deps`] - Runtime tool checks and interpreter resolution
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error types naming the failing installation step
//! - [`formula`] - TOML formula loading and validation
//! - [`layout`] - Paths under the installation prefix
//! - [`list_output`] - Output formatting for package listing
//! - [`lock`] - Per-package install lock
//! - [`output`] - Progress, summary and dry-run output
//! - [`permissions`] - Entrypoint discovery and permission normalization
//! - [`pipeline`] - Install, uninstall and verification orchestration
//! - [`receipt`] - Install receipts
//! - [`scanner`] - Scanner for discovering installed versions
//! - [`smoke`] - Post-install smoke test
//! - [`stager`] - Mirroring archive contents into an installation root
//! - [`wrapper`] - Launcher script generation

pub mod artefact;
pub mod cli;
pub mod deps;
pub mod dirs;
pub mod error;
pub mod formula;
pub mod layout;
pub mod list_output;
pub mod lock;
pub mod output;
pub mod permissions;
pub mod pipeline;
pub mod receipt;
pub mod scanner;
pub mod smoke;
pub mod stager;
pub mod wrapper;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
