//! Install, uninstall and verification pipelines.
//!
//! `install` takes a formula from release archive to working launcher:
//!
//! 1. lock the package;
//! 2. check runtime tools and resolve the interpreter;
//! 3. fetch the archive and verify its SHA-256;
//! 4. extract it, looking through a single top-level directory;
//! 5. stage it into a hidden directory beside the installation root and
//!    normalize entrypoint permissions there;
//! 6. rename the staged tree over the root and write the launcher, putting
//!    the previous root back if either fails;
//! 7. write the receipt, optionally smoke test the launcher, then prune other
//!    versions of the package.
//!
//! Every step is fatal; nothing is retried.

use crate::artefact::download::ArchiveFetcher;
use crate::artefact::extraction::{ArchiveExtractor, ExtractionError, archive_root};
use crate::artefact::verification::verify_checksum;
use crate::artefact::version::PackageVersion;
use crate::deps::{ToolProbe, check_dependencies, resolve_interpreter};
use crate::error::{InstallerError, Result};
use crate::formula::Formula;
use crate::layout::InstallLayout;
use crate::lock::InstallLock;
use crate::output::write_stderr_line;
use crate::permissions::normalize_permissions;
use crate::receipt::InstallReceipt;
use crate::scanner::scan_package;
use crate::smoke::{SMOKE_TIMEOUT, expected_output, run_smoke_test};
use crate::stager::Stager;
use crate::wrapper::{LauncherSpec, generate_launcher, is_directory_in_path};
use log::{debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Context for an install run.
pub struct PipelineContext<'a> {
    /// Formula describing the release and its layout.
    pub formula: &'a Formula,
    /// Paths under the installation prefix.
    pub layout: &'a InstallLayout,
    /// Retrieves the release archive.
    pub fetcher: &'a dyn ArchiveFetcher,
    /// Unpacks the release archive.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Locates runtime tools and the interpreter.
    pub probe: &'a dyn ToolProbe,
    /// Local archive used instead of fetching the formula URL.
    pub archive: Option<&'a Path>,
    /// Do not fail when required tools are missing.
    pub skip_deps: bool,
    /// Suppress progress output.
    pub quiet: bool,
    /// Run the launcher smoke test before pruning other versions.
    pub smoke_test: bool,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Installed version.
    pub version: PackageVersion,
    /// Installation root.
    pub install_root: PathBuf,
    /// Launcher path.
    pub launcher: PathBuf,
    /// Entrypoints marked executable, relative to the root.
    pub entrypoints: Vec<PathBuf>,
    /// Number of files staged.
    pub staged_files: usize,
    /// Whether the launcher directory is on `PATH`.
    pub launcher_dir_in_path: bool,
    /// Other versions removed by this install.
    pub pruned: Vec<PackageVersion>,
    /// Optional tools that were not found.
    pub missing_optional: Vec<String>,
}

/// Outcome of a successful uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    /// Versions whose roots were removed.
    pub removed: Vec<PackageVersion>,
    /// Whether a launcher was removed.
    pub launcher_removed: bool,
}

/// Install the release described by `context.formula`.
///
/// # Errors
///
/// Returns the first failing step's error. If staging, permission
/// normalization or launcher generation fails, the previous installation
/// root and launcher are left as they were. A failed smoke test leaves the new
/// version installed and other versions unpruned.
pub fn install(context: &PipelineContext<'_>, stderr: &mut dyn Write) -> Result<InstallReport> {
    let formula = context.formula;
    let layout = context.layout;
    let name = formula.name();
    let version = formula.release().version();
    let settings = formula.install();
    let quiet = context.quiet;

    let _lock = InstallLock::acquire(layout.lock_path(name).as_std_path())?;

    // Step 1: runtime tools and interpreter.
    let status = check_dependencies(formula.dependencies(), context.probe);
    if context.skip_deps {
        for tool in &status.missing_required {
            warn!("required tool {tool} not found; continuing because dependency checks are skipped");
        }
    } else {
        status.require_all()?;
    }
    let interpreter = resolve_interpreter(&settings.interpreter, context.probe)?;
    debug!("interpreter resolved to {}", interpreter.display());

    // Step 2: fetch and verify.
    let scratch = tempfile::tempdir()?;
    let archive_path = match context.archive {
        Some(path) => path.to_path_buf(),
        None => {
            let url = formula.release().url();
            let dest = scratch.path().join(url.archive_file_name());
            progress(quiet, stderr, format_args!("Fetching {url}"));
            context.fetcher.fetch(url, &dest)?;
            dest
        }
    };
    progress(quiet, stderr, format_args!("Verifying {}", archive_path.display()));
    verify_checksum(formula.release().sha256(), &archive_path)?;

    // Step 3: extract.
    let extract_dir = scratch.path().join("extract");
    std::fs::create_dir(&extract_dir)?;
    context.extractor.extract(&archive_path, &extract_dir)?;
    let source_root = archive_root(&extract_dir).map_err(ExtractionError::from)?;

    // Step 4: stage beside the live root, swap it in, write the launcher.
    let package_dir = layout.package_dir(name).into_std_path_buf();
    let install_root = layout.install_root(name, version).into_std_path_buf();
    let launcher_path = layout.launcher_path(&settings.launcher).into_std_path_buf();
    progress(quiet, stderr, format_args!("Staging into {}", install_root.display()));
    let populated = replace_root(&RootSwap {
        source_root: &source_root,
        package_dir: &package_dir,
        install_root: &install_root,
        launcher_path: &launcher_path,
        interpreter: &interpreter,
        formula,
    })
    .inspect_err(|_| {
        // Succeeds only when no other version is installed.
        if std::fs::remove_dir(&package_dir).is_ok() {
            debug!("removed empty {}", package_dir.display());
        }
    })?;
    progress(quiet, stderr, format_args!("Wrote launcher {}", launcher_path.display()));

    // Step 5: receipt, smoke test, upgrade pruning.
    InstallReceipt {
        name: name.to_owned(),
        version: version.to_string(),
        source_url: formula.release().url().to_string(),
        sha256: formula.release().sha256().to_string(),
        install_root: install_root.clone(),
        launcher: launcher_path.clone(),
        version_policy: settings.version_policy,
        entrypoints: populated.entrypoints.clone(),
        installed_at: InstallReceipt::now(),
    }
    .write(layout.receipt_path(name, version).as_std_path())?;

    if context.smoke_test {
        progress(
            quiet,
            stderr,
            format_args!("Testing {} {}", launcher_path.display(), settings.version_flag),
        );
        let expected = expected_output(&settings.launcher, version, settings.version_policy);
        run_smoke_test(&launcher_path, &settings.version_flag, &expected, SMOKE_TIMEOUT)?;
    }

    let pruned = prune_other_versions(layout, name, version)?;
    info!("installed {name} {version} into {}", install_root.display());

    Ok(InstallReport {
        version: version.clone(),
        install_root,
        launcher_dir_in_path: is_directory_in_path(layout.bin_dir().as_std_path()),
        launcher: launcher_path,
        entrypoints: populated.entrypoints,
        staged_files: populated.staged_files,
        pruned,
        missing_optional: status.missing_optional,
    })
}

fn progress(quiet: bool, stderr: &mut dyn Write, message: std::fmt::Arguments<'_>) {
    if !quiet {
        write_stderr_line(stderr, format!("==> {message}"));
    }
}

struct Populated {
    entrypoints: Vec<PathBuf>,
    staged_files: usize,
}

struct RootSwap<'a> {
    source_root: &'a Path,
    package_dir: &'a Path,
    install_root: &'a Path,
    launcher_path: &'a Path,
    interpreter: &'a Path,
    formula: &'a Formula,
}

/// Directory name a displaced root is moved to inside its holding directory.
const DISPLACED_ROOT: &str = "root";

/// Stage and normalize into a hidden sibling of the installation root, rename
/// it over the root, then write the launcher.
///
/// On failure the previous root, if any, is moved back and the launcher is
/// left as it was.
fn replace_root(swap: &RootSwap<'_>) -> Result<Populated> {
    let version = swap.formula.release().version();
    std::fs::create_dir_all(swap.package_dir)
        .map_err(|source| io_failure(swap.package_dir, source))?;
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{version}.staging-"))
        .tempdir_in(swap.package_dir)
        .map_err(|source| io_failure(swap.package_dir, source))?;
    let populated = populate_staging(staging.path(), swap)?;

    let previous = set_aside_root(swap.install_root, swap.package_dir, version)?;
    let committed = std::fs::rename(staging.path(), swap.install_root)
        .map_err(|source| io_failure(swap.install_root, source))
        .and_then(|()| {
            let settings = swap.formula.install();
            generate_launcher(&LauncherSpec {
                launcher_path: swap.launcher_path,
                install_root: swap.install_root,
                version,
                interpreter: swap.interpreter,
                primary_entrypoint: settings.primary_entrypoint.as_std_path(),
                root_env: &settings.root_env,
                version_env: &settings.version_env,
                policy: settings.version_policy,
            })
            .map(drop)
        });
    if let Err(e) = committed {
        restore_root(swap.install_root, previous.as_ref());
        return Err(e);
    }
    // Dropping `previous` deletes the replaced root.
    Ok(populated)
}

fn populate_staging(staging_root: &Path, swap: &RootSwap<'_>) -> Result<Populated> {
    let settings = swap.formula.install();
    let mut stager = Stager::new(staging_root);
    stager.prepare()?;
    let staged = stager.stage_from(swap.source_root)?;

    if !staging_root.join(&settings.primary_entrypoint).is_file() {
        return Err(io_failure(
            &swap.install_root.join(&settings.primary_entrypoint),
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "primary entrypoint is missing from the archive",
            ),
        ));
    }

    let entrypoints = normalize_permissions(
        staging_root,
        settings.entrypoint_dir.as_std_path(),
        settings.entrypoint_depth,
    )?;

    Ok(Populated {
        entrypoints,
        staged_files: staged.len(),
    })
}

/// Move an existing root into a hidden holding directory so it can be
/// restored if the swap fails.
fn set_aside_root(
    install_root: &Path,
    package_dir: &Path,
    version: &PackageVersion,
) -> Result<Option<tempfile::TempDir>> {
    match std::fs::symlink_metadata(install_root) {
        Ok(meta) if meta.is_dir() => {
            debug!("setting aside existing root {}", install_root.display());
            let aside = tempfile::Builder::new()
                .prefix(&format!(".{version}.previous-"))
                .tempdir_in(package_dir)
                .map_err(|source| io_failure(package_dir, source))?;
            std::fs::rename(install_root, aside.path().join(DISPLACED_ROOT))
                .map_err(|source| io_failure(install_root, source))?;
            Ok(Some(aside))
        }
        Ok(_) => Err(io_failure(
            install_root,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "installation root exists and is not a directory",
            ),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(io_failure(install_root, source)),
    }
}

fn restore_root(install_root: &Path, previous: Option<&tempfile::TempDir>) {
    match std::fs::remove_dir_all(install_root) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!("failed to remove {}: {e}", install_root.display());
        }
        _ => {}
    }
    if let Some(aside) = previous {
        let displaced = aside.path().join(DISPLACED_ROOT);
        if let Err(e) = std::fs::rename(&displaced, install_root) {
            warn!(
                "failed to restore {} from {}: {e}",
                install_root.display(),
                displaced.display()
            );
        }
    }
}

fn io_failure(path: &Path, source: std::io::Error) -> InstallerError {
    InstallerError::IoFailure {
        path: path.to_path_buf(),
        source,
    }
}

fn prune_other_versions(
    layout: &InstallLayout,
    name: &str,
    keep: &PackageVersion,
) -> Result<Vec<PackageVersion>> {
    let mut pruned = Vec::new();
    for installed in scan_package(&layout.package_dir(name))? {
        if &installed.version == keep {
            continue;
        }
        remove_version(layout, name, &installed.version, &installed.root)?;
        pruned.push(installed.version);
    }
    Ok(pruned)
}

fn remove_version(
    layout: &InstallLayout,
    name: &str,
    version: &PackageVersion,
    root: &Path,
) -> Result<()> {
    debug!("removing {name} {version} at {}", root.display());
    std::fs::remove_dir_all(root)?;
    remove_if_present(layout.receipt_path(name, version).as_std_path())?;
    Ok(())
}

fn remove_if_present(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove the launcher, every version root and every receipt of a package.
///
/// # Errors
///
/// Returns [`InstallerError::NotInstalled`] when neither a launcher nor a
/// version root exists, [`InstallerError::Locked`] when an install is in
/// progress, or an I/O error if removal fails.
pub fn uninstall(formula: &Formula, layout: &InstallLayout) -> Result<UninstallReport> {
    let name = formula.name();
    let _lock = InstallLock::acquire(layout.lock_path(name).as_std_path())?;

    let package_dir = layout.package_dir(name);
    let versions = scan_package(&package_dir)?;
    let launcher = layout.launcher_path(&formula.install().launcher);
    let launcher_removed = remove_if_present(launcher.as_std_path())?;
    if versions.is_empty() && !launcher_removed {
        return Err(InstallerError::NotInstalled {
            name: name.to_owned(),
        });
    }

    let mut removed = Vec::new();
    for installed in versions {
        remove_version(layout, name, &installed.version, &installed.root)?;
        removed.push(installed.version);
    }
    if let Err(e) = std::fs::remove_dir(&package_dir) {
        debug!("leaving {package_dir}: {e}");
    }

    info!("uninstalled {name}");
    Ok(UninstallReport {
        removed,
        launcher_removed,
    })
}

/// Run the smoke test against the newest installed version.
///
/// The expected output follows the version policy recorded in the receipt,
/// falling back to the formula's policy.
///
/// # Errors
///
/// Returns [`InstallerError::NotInstalled`] when no version is installed, or
/// [`InstallerError::SmokeTest`] when the launcher misbehaves.
pub fn verify_installed(formula: &Formula, layout: &InstallLayout) -> Result<String> {
    let name = formula.name();
    let settings = formula.install();
    let newest = scan_package(&layout.package_dir(name))?
        .pop()
        .ok_or_else(|| InstallerError::NotInstalled {
            name: name.to_owned(),
        })?;

    let (launcher, policy) = match &newest.receipt {
        Some(receipt) => (receipt.launcher.clone(), receipt.version_policy),
        None => (
            layout.launcher_path(&settings.launcher).into_std_path_buf(),
            settings.version_policy,
        ),
    };
    let expected = expected_output(&settings.launcher, &newest.version, policy);
    run_smoke_test(&launcher, &settings.version_flag, &expected, SMOKE_TIMEOUT)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
