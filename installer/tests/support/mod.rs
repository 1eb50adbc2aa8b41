//! Test support utilities for installer behavioural tests.
//!
//! This module provides helpers shared across the behaviour suites: running
//! generated launchers, walking installed trees, and building archives the
//! production fixtures deliberately cannot express.

#![allow(dead_code, reason = "each behaviour suite uses a different subset")]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tfc_installer::artefact::sha256_digest::Sha256Digest;

/// Runs a generated launcher with `args` through `/bin/sh`.
///
/// Going through the shell avoids `ETXTBSY` when a launcher was written
/// moments earlier by another thread of the test binary.
pub fn run_launcher<S: AsRef<std::ffi::OsStr>>(launcher: &Path, args: &[S]) -> Output {
    Command::new("/bin/sh")
        .arg(launcher)
        .args(args)
        .env_remove("TFC_CONTROLLER_VERSION")
        .env_remove("TFC_CONTROLLER_ROOT")
        .output()
        .expect("failed to run launcher")
}

/// Returns every regular file under `dir`, relative to `dir`, sorted.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect(dir, Path::new(""), &mut found);
    found.sort();
    found
}

fn collect(dir: &Path, relative: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let entry = entry.expect("failed to read directory entry");
        let child = relative.join(entry.file_name());
        let file_type = entry.file_type().expect("failed to read file type");
        if file_type.is_dir() {
            collect(&entry.path(), &child, found);
        } else {
            found.push(child);
        }
    }
}

/// Writes a `.tar.gz` holding one entry named `../escape.sh` and returns its
/// digest.
///
/// `tar::Builder` refuses to write such names, so the header name field is
/// filled in directly.
pub fn write_traversal_archive(archive_path: &Path) -> Sha256Digest {
    let file = std::fs::File::create(archive_path).expect("failed to create archive");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let contents = b"#!/bin/sh\necho escaped\n";
    let name = b"../escape.sh";
    let mut header = tar::Header::new_old();
    header.as_old_mut().name[..name.len()].copy_from_slice(name);
    header.set_size(contents.len() as u64);
    header.set_mode(0o755);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    builder
        .append(&header, contents.as_slice())
        .expect("failed to append entry");

    let encoder = builder.into_inner().expect("failed to finish tar stream");
    encoder.finish().expect("failed to finish gzip stream");
    Sha256Digest::of_file(archive_path).expect("failed to hash archive")
}
