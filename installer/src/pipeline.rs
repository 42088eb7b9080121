//! Install pipeline orchestration.
//!
//! Sequences download, verification, extraction and the executable-bit fix
//! for one Elide version. Each step only runs once the previous one has
//! succeeded, so an archive that fails verification is never unpacked.

use crate::artefact::download::{
    ArtefactDownloader, DownloadEndpoints, HttpDownloader, download_artefacts,
};
use crate::artefact::extraction::{ArtefactExtractor, ZipExtractor, extract_archive};
use crate::artefact::naming::ArtefactPair;
use crate::artefact::verification::{CosignVerifier, SignatureVerifier, verify_artefacts};
use crate::command::CommandExecutor;
use crate::error::{InstallerError, Result};
use crate::locator::binary_file_name;
use crate::permissions::make_executable;
use crate::platform::PlatformTag;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// A single stage of the install pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    /// Archive and signature bundle fetched.
    Download,
    /// Archive checked against its bundle.
    Verify,
    /// Archive unpacked and removed.
    Extract,
    /// Executable bit ensured.
    MakeExecutable,
}

/// What to install and where.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    /// Pinned Elide version.
    pub version: &'a str,
    /// Host platform tag.
    pub platform: PlatformTag,
    /// Download directory, exclusive to this version and platform.
    pub dir: &'a Path,
}

/// Implementations of the pipeline's side-effecting seams.
pub struct InstallBackends<'a> {
    /// Fetches remote files.
    pub downloader: &'a dyn ArtefactDownloader,
    /// Checks the archive against its signature bundle.
    pub verifier: &'a dyn SignatureVerifier,
    /// Unpacks the archive.
    pub extractor: &'a dyn ArtefactExtractor,
}

/// Outcome of [`install_binary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// The installed executable.
    pub binary: PathBuf,
    /// Steps that ran, in execution order.
    pub steps: Vec<InstallStep>,
}

/// Install using HTTP downloads, `cosign` verification and zip extraction.
///
/// # Errors
///
/// See [`install_binary_with`].
pub fn install_binary(
    request: &InstallRequest<'_>,
    endpoints: &DownloadEndpoints,
    executor: &dyn CommandExecutor,
) -> Result<InstallReport> {
    let verifier = CosignVerifier::new(executor);
    let backends = InstallBackends {
        downloader: &HttpDownloader,
        verifier: &verifier,
        extractor: &ZipExtractor,
    };
    install_binary_with(request, endpoints, &backends)
}

/// Testable pipeline with injected backends.
///
/// When the binary is already present and no archive is pending, the
/// network steps are skipped and only the executable bit is checked.
///
/// # Errors
///
/// Returns the first failing step's error. A verification failure leaves
/// neither the archive nor the bundle on disk.
pub fn install_binary_with(
    request: &InstallRequest<'_>,
    endpoints: &DownloadEndpoints,
    backends: &InstallBackends<'_>,
) -> Result<InstallReport> {
    let binary = request.dir.join(binary_file_name());
    let pending = ArtefactPair::in_dir(request.dir);
    let mut steps = Vec::new();

    if binary.is_file() && !pending.archive().exists() {
        debug!(
            target: "elide",
            "Elide {} already installed at {}",
            request.version,
            binary.display()
        );
    } else {
        let pair = download_artefacts(
            request.version,
            &request.platform,
            request.dir,
            endpoints,
            backends.downloader,
        )?;
        steps.push(InstallStep::Download);

        verify_artefacts(&pair, backends.verifier)?;
        steps.push(InstallStep::Verify);

        if extract_archive(&pair, request.dir, backends.extractor)?.is_some() {
            steps.push(InstallStep::Extract);
        }
        if !binary.is_file() {
            return Err(InstallerError::BinaryMissingFromArchive {
                path: binary,
                dir: request.dir.to_path_buf(),
            });
        }
    }

    if !request.platform.is_windows() {
        make_executable(&binary)?;
        steps.push(InstallStep::MakeExecutable);
    }

    info!(target: "elide", "Elide {} ready at {}", request.version, binary.display());
    Ok(InstallReport { binary, steps })
}
