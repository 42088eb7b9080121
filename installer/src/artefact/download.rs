//! Artefact download logic for Elide release archives.
//!
//! Provides a trait-based abstraction for fetching the binary archive and
//! its signature bundle, enabling dependency injection for testing.

use super::naming::ArtefactPair;
use crate::platform::PlatformTag;
use log::{debug, info};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Base of the CDN serving per-platform snapshot archives.
const ARCHIVE_BASE: &str = "https://elide.zip/cli/v1/snapshot";

/// Base of the GitHub releases hosting signature bundles.
const SIGNATURE_BASE: &str = "https://github.com/elide-dev/elide/releases/download";

/// Network timeout for each artefact request.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Where archives and signature bundles are published.
///
/// # Examples
///
/// ```
/// use elide_installer::artefact::download::DownloadEndpoints;
/// use elide_installer::platform::PlatformTag;
///
/// let tag = PlatformTag::classify("linux", "x86_64").expect("supported");
/// let endpoints = DownloadEndpoints::default();
/// assert_eq!(
///     endpoints.archive_url("1.0.0", &tag),
///     "https://elide.zip/cli/v1/snapshot/linux-amd64/1.0.0/elide.zip"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEndpoints {
    archive_base: String,
    signature_base: String,
}

impl DownloadEndpoints {
    /// Use custom bases, e.g. a mirror.
    #[must_use]
    pub fn new(archive_base: impl Into<String>, signature_base: impl Into<String>) -> Self {
        Self {
            archive_base: archive_base.into(),
            signature_base: signature_base.into(),
        }
    }

    /// URL of the binary archive.
    #[must_use]
    pub fn archive_url(&self, version: &str, platform: &PlatformTag) -> String {
        format!(
            "{}/{platform}/{version}/elide.zip",
            self.archive_base.trim_end_matches('/')
        )
    }

    /// URL of the detached signature bundle.
    #[must_use]
    pub fn signature_url(&self, version: &str, platform: &PlatformTag) -> String {
        format!(
            "{}/{version}/elide-{version}-{platform}.zip.sigstore",
            self.signature_base.trim_end_matches('/')
        )
    }
}

impl Default for DownloadEndpoints {
    fn default() -> Self {
        Self::new(ARCHIVE_BASE, SIGNATURE_BASE)
    }
}

/// Trait for fetching artefact files.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactDownloader {
    /// Fetch `url` and write the body to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the file write fails.
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from artefact download operations.
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

    /// The requested artefact was not found (HTTP 404).
    #[error("artefact not found: {url}; check that the configured version exists")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error preparing the target directory or writing the file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-based downloader using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl ArtefactDownloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(dest)?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file)?;
        Ok(())
    }
}

/// Download the archive and signature bundle for `version` into
/// `target_dir`.
///
/// When both files already exist nothing is fetched. Otherwise the files in
/// `target_dir` are removed first so a partial earlier attempt cannot leak
/// into this one.
///
/// # Errors
///
/// Returns [`DownloadError`] when clearing the directory or either fetch
/// fails. No retry is attempted.
pub fn download_artefacts(
    version: &str,
    platform: &PlatformTag,
    target_dir: &Path,
    endpoints: &DownloadEndpoints,
    downloader: &dyn ArtefactDownloader,
) -> Result<ArtefactPair, DownloadError> {
    let pair = ArtefactPair::in_dir(target_dir);
    if pair.both_exist() {
        debug!(
            target: "elide",
            "archive and signature for {version} already present in {}; skipping download",
            target_dir.display()
        );
        return Ok(pair);
    }

    clear_files(target_dir)?;
    std::fs::create_dir_all(target_dir)?;

    info!(target: "elide", "downloading Elide {version} for {platform}");
    downloader.fetch(&endpoints.archive_url(version, platform), pair.archive())?;
    downloader.fetch(&endpoints.signature_url(version, platform), pair.signature())?;
    Ok(pair)
}

/// Remove every regular file below `dir`, keeping the directory tree.
fn clear_files(dir: &Path) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            clear_files(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
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
