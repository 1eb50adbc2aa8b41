//! Archive extraction for release tarballs.
//!
//! Extracts `.tar.gz` archives to a scratch directory with path traversal
//! protection to prevent zip-slip attacks. Source tarballs produced by
//! release hosts wrap everything in one `<repo>-<tag>/` directory; callers
//! use [`archive_root`] to look through it.

use log::trace;
use std::path::{Component, Path, PathBuf};

/// Trait for extracting release archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use tfc_installer::artefact::extraction::GzipExtractor;
///
/// let extractor = GzipExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the regular files that were extracted.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    /// Returns [`ExtractionError::Io`] on I/O failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Default extractor using the `flate2` and `tar` crates.
///
/// Validates each entry path before extraction to guard against
/// path traversal attacks (zip-slip).
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipExtractor;

impl ArchiveExtractor for GzipExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        let mut extracted = Vec::new();

        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let entry_type = entry.header().entry_type();
            if entry_type.is_pax_global_extensions() || entry_type.is_pax_local_extensions() {
                continue;
            }

            let entry_path = entry.path()?.into_owned();
            validate_entry_path(&entry_path)?;
            if entry_type.is_symlink() || entry_type.is_hard_link() {
                if let Some(target) = entry.link_name()? {
                    validate_link_target(&entry_path, &target, entry_type.is_hard_link())?;
                }
            }

            trace!("unpacking {}", entry_path.display());
            // `unpack_in` also refuses entries whose parent resolves outside
            // `dest_dir` through a previously unpacked link.
            if !entry.unpack_in(dest_dir)? {
                return Err(ExtractionError::PathTraversal {
                    path: entry_path.display().to_string(),
                });
            }

            if entry_type.is_file() {
                extracted.push(entry_path);
            }
        }

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(extracted)
    }
}

/// Return the directory holding the archive's files.
///
/// When `extract_dir` contains exactly one entry and that entry is a real
/// directory, the archive wrapped its payload in a top-level folder and that
/// folder is returned. Otherwise `extract_dir` itself is the root.
///
/// # Errors
///
/// Returns any I/O error raised while listing `extract_dir`.
pub fn archive_root(extract_dir: &Path) -> std::io::Result<PathBuf> {
    let mut entries = std::fs::read_dir(extract_dir)?.collect::<std::io::Result<Vec<_>>>()?;
    if entries.len() == 1 {
        if let Some(only) = entries.pop() {
            if only.file_type()?.is_dir() {
                return Ok(only.path());
            }
        }
    }
    Ok(extract_dir.to_path_buf())
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Validate that a link entry cannot point outside the destination.
///
/// Symlink targets resolve against the entry's parent directory; hard link
/// targets name another entry relative to the archive root.
fn validate_link_target(
    entry_path: &Path,
    target: &Path,
    hard_link: bool,
) -> Result<(), ExtractionError> {
    let escape = || ExtractionError::PathTraversal {
        path: format!("{} -> {}", entry_path.display(), target.display()),
    };
    if hard_link {
        return validate_entry_path(target).map_err(|_| escape());
    }

    let mut depth = entry_path
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .count()
        .saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1).ok_or_else(escape)?,
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ArchiveFixture;
    use rstest::rstest;

    #[test]
    fn extract_real_archive() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("release.tar.gz");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        ArchiveFixture::new()
            .with_top_level("tfc_controller-1.0.4")
            .file("bin/tfc_controller.sh", "#!/bin/sh\n", 0o644)
            .file("lib/helpers.sh", "helper() { :; }\n", 0o644)
            .write_tar_gz(&archive_path)
            .expect("write archive");

        let mut files = GzipExtractor
            .extract(&archive_path, &dest_dir)
            .expect("extract");
        files.sort();
        assert_eq!(
            files,
            vec![
                PathBuf::from("tfc_controller-1.0.4/bin/tfc_controller.sh"),
                PathBuf::from("tfc_controller-1.0.4/lib/helpers.sh"),
            ]
        );
        assert!(dest_dir.join("tfc_controller-1.0.4/lib/helpers.sh").exists());
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    #[case::absolute("/etc/passwd")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let result = validate_entry_path(Path::new(bad_path));
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[rstest]
    #[case::absolute_symlink("link", "/tmp/outside", false)]
    #[case::climbing_symlink("bin/link", "../../outside", false)]
    #[case::climbing_hard_link("bin/link", "../outside", true)]
    fn rejects_links_leaving_the_destination(
        #[case] entry: &str,
        #[case] target: &str,
        #[case] hard_link: bool,
    ) {
        let result = validate_link_target(Path::new(entry), Path::new(target), hard_link);
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {entry} -> {target}"
        );
    }

    #[rstest]
    #[case::sibling("bin/tfc", "../lib/helpers.sh", false)]
    #[case::same_dir("bin/tfc", "./tfc_controller.sh", false)]
    #[case::hard_link("bin/tfc", "bin/tfc_controller.sh", true)]
    fn accepts_links_inside_the_destination(
        #[case] entry: &str,
        #[case] target: &str,
        #[case] hard_link: bool,
    ) {
        assert!(validate_link_target(Path::new(entry), Path::new(target), hard_link).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_cannot_redirect_later_entries() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let temp_dir = tempfile::tempdir().expect("temp dir");
        let outside = temp_dir.path().join("outside");
        std::fs::create_dir_all(&outside).expect("create outside");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");
        let archive_path = temp_dir.path().join("escape.tar.gz");

        let file = std::fs::File::create(&archive_path).expect("create archive");
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_size(0);
        link.set_mode(0o777);
        builder
            .append_link(&mut link, "link", &outside)
            .expect("append symlink");
        let contents = b"written through the link\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, "link/pwned", contents.as_slice())
            .expect("append file");
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip");

        let result = GzipExtractor.extract(&archive_path, &dest_dir);
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal, got {result:?}"
        );
        assert!(!outside.join("pwned").exists());
    }

    #[test]
    fn accepts_normal_paths() {
        assert!(validate_entry_path(Path::new("bin/tfc_controller.sh")).is_ok());
    }

    #[test]
    fn extract_empty_archive() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive_path = temp_dir.path().join("empty.tar.gz");
        let dest_dir = temp_dir.path().join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        ArchiveFixture::new()
            .write_tar_gz(&archive_path)
            .expect("write archive");

        let result = GzipExtractor.extract(&archive_path, &dest_dir);
        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[test]
    fn archive_root_descends_into_single_directory() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let wrapped = temp_dir.path().join("tfc_controller-1.0.4");
        std::fs::create_dir_all(wrapped.join("bin")).expect("create dirs");

        let root = archive_root(temp_dir.path()).expect("list");
        assert_eq!(root, wrapped);
    }

    #[test]
    fn archive_root_keeps_flat_layouts() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(temp_dir.path().join("bin")).expect("create bin");
        std::fs::write(temp_dir.path().join("README.md"), "docs").expect("write");

        let root = archive_root(temp_dir.path()).expect("list");
        assert_eq!(root, temp_dir.path());
    }

    #[test]
    fn archive_root_keeps_single_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(temp_dir.path().join("tfc_controller.sh"), "#!/bin/sh\n").expect("write");

        let root = archive_root(temp_dir.path()).expect("list");
        assert_eq!(root, temp_dir.path());
    }
}
