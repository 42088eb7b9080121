//! On-disk names for downloaded Elide artefacts.
//!
//! Whatever the remote URLs look like, the archive and its signature bundle
//! always land next to each other as `elide.zip` and `elide.zip.sigstore`.

use log::debug;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the downloaded binary archive.
pub const ARCHIVE_NAME: &str = "elide.zip";

/// File name of the detached signature bundle.
pub const SIGNATURE_NAME: &str = "elide.zip.sigstore";

/// The archive and signature bundle for one version and platform.
///
/// # Examples
///
/// ```
/// use elide_installer::artefact::naming::ArtefactPair;
/// use std::path::Path;
///
/// let pair = ArtefactPair::in_dir(Path::new("/tmp/elide"));
/// assert!(pair.archive().ends_with("elide.zip"));
/// assert!(pair.signature().ends_with("elide.zip.sigstore"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactPair {
    archive: PathBuf,
    signature: PathBuf,
}

impl ArtefactPair {
    /// Name both artefacts inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            archive: dir.join(ARCHIVE_NAME),
            signature: dir.join(SIGNATURE_NAME),
        }
    }

    /// Path of the binary archive.
    #[must_use]
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Path of the signature bundle.
    #[must_use]
    pub fn signature(&self) -> &Path {
        &self.signature
    }

    /// Whether both files are present from an earlier run.
    #[must_use]
    pub fn both_exist(&self) -> bool {
        self.archive.is_file() && self.signature.is_file()
    }

    /// Delete the signature bundle, ignoring a file that is already gone.
    ///
    /// # Errors
    ///
    /// Returns any other I/O error raised by the removal.
    pub fn remove_signature(&self) -> io::Result<()> {
        remove_if_present(&self.signature)
    }

    /// Delete the archive, ignoring a file that is already gone.
    ///
    /// # Errors
    ///
    /// Returns any other I/O error raised by the removal.
    pub fn remove_archive(&self) -> io::Result<()> {
        remove_if_present(&self.archive)
    }

    /// Delete both files.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error raised; the signature removal is still
    /// attempted when the archive removal fails.
    pub fn remove_all(&self) -> io::Result<()> {
        let archive = self.remove_archive();
        let signature = self.remove_signature();
        archive.and(signature)
    }
}

pub(crate) fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(target: "elide", "removed {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
