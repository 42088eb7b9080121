//! Deciding which Elide binary a build will use.
//!
//! Combines the configured [`ResolutionSource`] with the local search and the
//! download layout to produce a single path. The path is only computed, not
//! created; installing into it is the pipeline's job.

use crate::error::Result;
use crate::locator::{LocalBinaryLocator, LocalOrigin, binary_file_name};
use crate::platform::PlatformTag;
use crate::source::{BinaryConfiguration, ResolutionSource};
use log::debug;
use std::path::{Path, PathBuf};

/// Name of the directory holding everything the integration writes.
pub const RUNTIME_DIR_NAME: &str = "elide-runtime";

/// Paths derived from the build directory.
///
/// # Examples
///
/// ```
/// use elide_installer::resolution::RuntimeLayout;
/// use std::path::Path;
///
/// let layout = RuntimeLayout::new(Path::new("/work/build"));
/// assert_eq!(layout.version_file(), Path::new("/work/build/elide-runtime/version.txt"));
/// assert_eq!(
///     layout.task_marker("elideInstall"),
///     Path::new("/work/build/elide-runtime/tasks/elideInstall.done")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLayout {
    root: PathBuf,
}

impl RuntimeLayout {
    /// Lay out the runtime directory inside `build_dir`.
    #[must_use]
    pub fn new(build_dir: &Path) -> Self {
        Self {
            root: build_dir.join(RUNTIME_DIR_NAME),
        }
    }

    /// The runtime directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File receiving the trimmed output of `elide --version`.
    #[must_use]
    pub fn version_file(&self) -> PathBuf {
        self.root.join("version.txt")
    }

    /// Completion marker for the exec task `task`.
    #[must_use]
    pub fn task_marker(&self, task: &str) -> PathBuf {
        self.root.join("tasks").join(format!("{task}.done"))
    }

    /// Default download directory for one version and platform.
    #[must_use]
    pub fn default_download_dir(&self, version: &str, platform: &PlatformTag) -> PathBuf {
        self.root.join("bin").join(format!("{version}-{platform}"))
    }
}

/// How the resolved binary will come to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryOrigin {
    /// Already installed on this machine.
    Local(LocalOrigin),
    /// Downloaded (or to be downloaded) into `dir`.
    Download {
        /// Directory receiving the archive and the extracted binary.
        dir: PathBuf,
        /// Version being installed.
        version: String,
        /// Platform the release is built for.
        platform: PlatformTag,
    },
}

/// The binary a build will invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinary {
    path: PathBuf,
    origin: BinaryOrigin,
}

impl ResolvedBinary {
    /// Path of the executable.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How it is obtained.
    #[must_use]
    pub fn origin(&self) -> &BinaryOrigin {
        &self.origin
    }

    /// Whether the binary still has to be installed by the pipeline.
    #[must_use]
    pub fn needs_download(&self) -> bool {
        matches!(self.origin, BinaryOrigin::Download { .. })
    }
}

/// Directory a download would use, or `None` for local-only sources.
///
/// # Errors
///
/// Returns [`crate::error::InstallerError::MissingVersion`] when the source
/// downloads but no version is configured.
pub fn download_dir(
    config: &BinaryConfiguration,
    layout: &RuntimeLayout,
    platform: &PlatformTag,
) -> Result<Option<PathBuf>> {
    if !config.source().may_download() {
        return Ok(None);
    }
    let version = config.required_version()?;
    Ok(Some(match config.source().download_path() {
        Some(path) => path.to_path_buf(),
        None => layout.default_download_dir(version, platform),
    }))
}

/// Pick the binary for this build.
///
/// `Project` sources never look at local installs. `LocalIfApplicable`
/// prefers a local binary and falls back to the download directory.
/// `LocalOnly` yields `None` when nothing is installed.
///
/// `platform` is only called when a download directory is needed, so hosts
/// without a published build can still use a local binary.
///
/// # Errors
///
/// Returns configuration errors from the locator (invalid override), the
/// platform classifier, or [`download_dir`] (missing version).
pub fn resolve_binary<P>(
    config: &BinaryConfiguration,
    locator: &LocalBinaryLocator,
    layout: &RuntimeLayout,
    platform: P,
) -> Result<Option<ResolvedBinary>>
where
    P: FnOnce() -> Result<PlatformTag>,
{
    let local = match config.source() {
        ResolutionSource::Project { .. } => None,
        ResolutionSource::LocalOnly { path: Some(dir) } => locator
            .clone()
            .or_override(dir.join(binary_file_name()))
            .resolve()?,
        ResolutionSource::LocalOnly { path: None } | ResolutionSource::LocalIfApplicable { .. } => {
            locator.resolve()?
        }
    };

    if let Some(found) = local {
        debug!(target: "elide", "resolved local Elide binary {}", found.path.display());
        return Ok(Some(ResolvedBinary {
            path: found.path,
            origin: BinaryOrigin::Local(found.origin),
        }));
    }

    if !config.source().may_download() {
        return Ok(None);
    }
    let platform = platform()?;
    let Some(dir) = download_dir(config, layout, &platform)? else {
        return Ok(None);
    };
    let version = config.required_version()?.to_owned();
    debug!(target: "elide", "Elide {version} will be installed into {}", dir.display());
    Ok(Some(ResolvedBinary {
        path: dir.join(binary_file_name()),
        origin: BinaryOrigin::Download {
            dir,
            version,
            platform,
        },
    }))
}
