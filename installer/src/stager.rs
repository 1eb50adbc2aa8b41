//! Mirror an extracted archive into an installation root.
//!
//! Staging copies every file of a verified archive into its installation root
//! preserving relative paths exactly. The root must be empty or absent; on
//! any failure the stager removes what it created, so a failed stage leaves
//! no partial installation behind.

use crate::error::{InstallerError, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Stages archive contents into one installation root.
#[derive(Debug)]
pub struct Stager {
    install_root: PathBuf,
    created_root: bool,
}

impl Stager {
    /// Create a stager for `install_root`.
    #[must_use]
    pub fn new(install_root: &Path) -> Self {
        Self {
            install_root: install_root.to_path_buf(),
            created_root: false,
        }
    }

    /// The installation root being populated.
    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Ensure the installation root exists and is empty.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::IoFailure`] if the root is a regular file, a
    /// non-empty directory, or cannot be created.
    pub fn prepare(&mut self) -> Result<()> {
        let root = &self.install_root;
        match fs::symlink_metadata(root) {
            Ok(meta) if meta.is_dir() => {
                let mut entries = fs::read_dir(root).map_err(|source| io_failure(root, source))?;
                if entries.next().is_some() {
                    return Err(io_failure(
                        root,
                        std::io::Error::new(
                            std::io::ErrorKind::AlreadyExists,
                            "installation root is not empty",
                        ),
                    ));
                }
                Ok(())
            }
            Ok(_) => Err(io_failure(
                root,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "installation root exists and is not a directory",
                ),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                fs::create_dir_all(root).map_err(|source| io_failure(root, source))?;
                self.created_root = true;
                Ok(())
            }
            Err(source) => Err(io_failure(root, source)),
        }
    }

    /// Copy the tree under `archive_root` into the installation root.
    ///
    /// Returns the copied files relative to the root, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::IoFailure`] naming the first path that could
    /// not be read or written.
    pub fn stage_from(&self, archive_root: &Path) -> Result<Vec<PathBuf>> {
        let mut copied = Vec::new();
        copy_tree(archive_root, &self.install_root, Path::new(""), &mut copied)?;
        copied.sort();
        debug!(
            "staged {} file(s) into {}",
            copied.len(),
            self.install_root.display()
        );
        Ok(copied)
    }

    /// Remove everything this stager put under the installation root.
    ///
    /// A root the stager created is removed entirely; a pre-existing empty
    /// root is emptied again.
    pub fn rollback(&self) {
        let root = &self.install_root;
        let result = if self.created_root {
            fs::remove_dir_all(root)
        } else {
            clear_dir(root)
        };
        match result {
            Ok(()) => debug!("rolled back {}", root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to roll back {}: {e}", root.display()),
        }
    }
}

/// Mirror `archive_root` into `install_root`.
///
/// `install_root` must be absent or an empty directory. Checksum verification
/// is the caller's responsibility; the archive contents are trusted.
///
/// # Errors
///
/// Returns [`InstallerError::IoFailure`] when the root cannot be prepared or
/// a copy fails. Whatever was created under `install_root` is removed first.
pub fn stage(archive_root: &Path, install_root: &Path) -> Result<Vec<PathBuf>> {
    let mut stager = Stager::new(install_root);
    stager.prepare()?;
    stager.stage_from(archive_root).inspect_err(|_| stager.rollback())
}

fn io_failure(path: &Path, source: std::io::Error) -> InstallerError {
    InstallerError::IoFailure {
        path: path.to_path_buf(),
        source,
    }
}

fn copy_tree(src: &Path, dest: &Path, relative: &Path, copied: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(src).map_err(|source| io_failure(src, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| io_failure(src, source))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let rel = relative.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|source| io_failure(&from, source))?;

        if file_type.is_dir() {
            fs::create_dir(&to).map_err(|source| io_failure(&to, source))?;
            copy_tree(&from, &to, &rel, copied)?;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
            copied.push(rel);
        } else {
            // fs::copy carries the permission bits across.
            fs::copy(&from, &to).map_err(|source| io_failure(&to, source))?;
            copied.push(rel);
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let target = fs::read_link(from).map_err(|source| io_failure(from, source))?;
    std::os::unix::fs::symlink(target, to).map_err(|source| io_failure(to, source))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|source| io_failure(to, source))
}

fn clear_dir(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ArchiveFixture;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Sandbox {
        temp: TempDir,
        archive_root: PathBuf,
    }

    impl Sandbox {
        fn root(&self) -> PathBuf {
            self.temp.path().join("prefix").join("libexec").join("pkg").join("2.0.6")
        }
    }

    #[fixture]
    fn sandbox() -> Sandbox {
        let temp = TempDir::new().expect("temp dir");
        let archive_root = temp.path().join("archive");
        ArchiveFixture::controller("2.0.4")
            .file("share/doc/README.md", "# controller\n", 0o644)
            .write_tree(&archive_root)
            .expect("write archive tree");
        Sandbox { temp, archive_root }
    }

    #[rstest]
    fn stage_mirrors_every_file(sandbox: Sandbox) {
        let root = sandbox.root();
        let copied = stage(&sandbox.archive_root, &root).expect("stage");

        assert_eq!(
            copied,
            vec![
                PathBuf::from("bin/tfc_controller.sh"),
                PathBuf::from("lib/helpers.sh"),
                PathBuf::from("share/doc/README.md"),
            ]
        );
        for relative in &copied {
            let original = std::fs::read(sandbox.archive_root.join(relative)).expect("original");
            let staged = std::fs::read(root.join(relative)).expect("staged");
            assert_eq!(original, staged, "{} differs", relative.display());
        }
    }

    #[rstest]
    fn stage_accepts_existing_empty_root(sandbox: Sandbox) {
        let root = sandbox.root();
        std::fs::create_dir_all(&root).expect("create empty root");
        stage(&sandbox.archive_root, &root).expect("stage into empty root");
        assert!(root.join("lib/helpers.sh").is_file());
    }

    #[rstest]
    fn stage_rejects_non_empty_root(sandbox: Sandbox) {
        let root = sandbox.root();
        std::fs::create_dir_all(&root).expect("create root");
        std::fs::write(root.join("leftover"), "old").expect("write leftover");

        let err = stage(&sandbox.archive_root, &root).expect_err("root not empty");
        assert!(matches!(err, InstallerError::IoFailure { .. }));
        assert_eq!(
            std::fs::read_to_string(root.join("leftover")).expect("leftover kept"),
            "old"
        );
    }

    #[rstest]
    fn stage_rejects_root_that_is_a_file(sandbox: Sandbox) {
        let root = sandbox.root();
        std::fs::create_dir_all(root.parent().expect("parent")).expect("create parent");
        std::fs::write(&root, "occupied").expect("write file");

        let err = stage(&sandbox.archive_root, &root).expect_err("root is a file");
        assert!(matches!(err, InstallerError::IoFailure { ref path, .. } if *path == root));
        assert_eq!(std::fs::read_to_string(&root).expect("file kept"), "occupied");
    }

    #[cfg(unix)]
    #[rstest]
    fn stage_recreates_symlinks(sandbox: Sandbox) {
        std::os::unix::fs::symlink(
            "tfc_controller.sh",
            sandbox.archive_root.join("bin/tfc"),
        )
        .expect("create symlink");
        let root = sandbox.root();
        stage(&sandbox.archive_root, &root).expect("stage");

        let link = std::fs::read_link(root.join("bin/tfc")).expect("link staged");
        assert_eq!(link, PathBuf::from("tfc_controller.sh"));
    }

    #[cfg(unix)]
    #[rstest]
    fn failed_copy_rolls_back_the_root(sandbox: Sandbox) {
        use std::os::unix::fs::PermissionsExt;

        // Root can read anything, so the copy would not fail.
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let unreadable = sandbox.archive_root.join("lib/helpers.sh");
        std::fs::set_permissions(&unreadable, std::fs::Permissions::from_mode(0o000))
            .expect("chmod");

        let root = sandbox.root();
        let err = stage(&sandbox.archive_root, &root).expect_err("copy fails");
        assert!(matches!(err, InstallerError::IoFailure { .. }));
        assert!(!root.exists(), "partial root must be removed");
    }
}
