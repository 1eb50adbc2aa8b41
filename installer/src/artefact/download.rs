//! Release archive retrieval.
//!
//! Provides a trait-based abstraction for fetching the release tarball named
//! by a formula, enabling dependency injection for testing. `http(s)://`
//! URLs are downloaded with `ureq`; `file://` URLs are copied from disk.

use super::descriptor::SourceUrl;
use log::debug;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for release archive downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for fetching a release archive to a local file.
///
/// # Examples
///
/// ```
/// use tfc_installer::artefact::download::HttpFetcher;
///
/// let fetcher = HttpFetcher;
/// // Use fetcher.fetch(&url, dest) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher {
    /// Fetch the archive at `url` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer or the file write fails.
    fn fetch(&self, url: &SourceUrl, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from archive retrieval.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested archive was not found (HTTP 404 or missing local file).
    #[error("archive not found: {url}")]
    NotFound {
        /// The URL that could not be resolved.
        url: String,
    },

    /// I/O error writing the fetched file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// Production fetcher: `ureq` for HTTP, a plain copy for `file://`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &SourceUrl, dest: &Path) -> Result<(), DownloadError> {
        match url.local_path() {
            Some(source) => copy_local(url, &source, dest),
            None => download_to_file(url.as_str(), dest),
        }
    }
}

fn copy_local(url: &SourceUrl, source: &Path, dest: &Path) -> Result<(), DownloadError> {
    if !source.is_file() {
        return Err(DownloadError::NotFound {
            url: url.to_string(),
        });
    }
    debug!("copying local archive {} to {}", source.display(), dest.display());
    std::fs::copy(source, dest)?;
    Ok(())
}

/// Download a URL and write the body to a file.
fn download_to_file(url: &str, dest: &Path) -> Result<(), DownloadError> {
    debug!("downloading {url} to {}", dest.display());
    let response = http_agent()
        .get(url)
        .call()
        .map_err(|e| map_ureq_error(url, &e))?;
    let mut file = std::fs::File::create(dest)?;
    std::io::copy(&mut response.into_body().as_reader(), &mut file).map_err(DownloadError::Io)?;
    Ok(())
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let err = ureq::Error::StatusCode(404);
        let mapped = map_ureq_error("https://example.test/v1.0.4.tar.gz", &err);
        assert!(matches!(mapped, DownloadError::NotFound { .. }));
    }

    #[test]
    fn map_ureq_error_maps_other_status_to_http_error() {
        let err = ureq::Error::StatusCode(500);
        let mapped = map_ureq_error("https://example.test/v1.0.4.tar.gz", &err);
        assert!(matches!(mapped, DownloadError::HttpError { .. }));
    }

    #[test]
    fn file_url_is_copied() {
        let temp = tempfile::tempdir().expect("temp dir");
        let source = temp.path().join("release.tar.gz");
        std::fs::write(&source, b"archive bytes").expect("write source");
        let url = SourceUrl::try_from(format!("file://{}", source.display()).as_str())
            .expect("valid URL");
        let dest = temp.path().join("fetched.tar.gz");

        HttpFetcher.fetch(&url, &dest).expect("fetch local archive");

        assert_eq!(std::fs::read(&dest).expect("read"), b"archive bytes");
    }

    #[test]
    fn missing_file_url_is_not_found() {
        let temp = tempfile::tempdir().expect("temp dir");
        let missing = temp.path().join("absent.tar.gz");
        let url = SourceUrl::try_from(format!("file://{}", missing.display()).as_str())
            .expect("valid URL");

        let err = HttpFetcher
            .fetch(&url, &temp.path().join("out"))
            .expect_err("missing archive");
        assert!(matches!(err, DownloadError::NotFound { .. }));
    }
}
