//! Checking the version a resolved binary reports.
//!
//! The check only runs for local binaries under strict checking: a project
//! download is pinned by construction. When it runs, the trimmed output of
//! `elide --version` is written to the version file so a caching layer can
//! key on it.

use crate::cli::{ElideCli, VERSION_ARG};
use crate::error::{BuildError, Result};
use elide_installer::permissions::make_executable;
use elide_installer::source::{BinaryConfiguration, ResolutionSource};
use log::{debug, info};
use std::path::Path;

/// Task name used in failure messages.
pub const CHECK_VERSION_TASK: &str = "elideCheckVersion";

/// What [`check_version`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheckOutcome {
    /// Strict checking does not apply to this configuration.
    Skipped,
    /// The binary is missing and silent mode tolerated it.
    BinaryAbsent,
    /// The binary was queried and reported this version.
    Reported(String),
}

/// Query the binary behind `cli` and compare against the configuration.
///
/// # Errors
///
/// - [`BuildError::BinaryNotFound`] when the binary is missing and silent
///   mode is off.
/// - [`BuildError::InvocationFailed`] when `--version` does not succeed.
/// - [`BuildError::VersionMismatch`] when a local-only binary reports a
///   version other than the required one.
/// - Installer errors when the binary cannot be made executable.
pub fn check_version(
    cli: &ElideCli,
    config: &BinaryConfiguration,
    version_file: &Path,
) -> Result<VersionCheckOutcome> {
    if !(config.strict_version_check() && config.source().is_local_based()) {
        debug!(
            target: "elide",
            "version check skipped for `{}` source",
            config.source().kind()
        );
        return Ok(VersionCheckOutcome::Skipped);
    }

    let binary = cli.path();
    if !binary.is_file() {
        if config.silent_mode() {
            info!(target: "elide", "no Elide binary at {}; skipping version check", binary.display());
            return Ok(VersionCheckOutcome::BinaryAbsent);
        }
        return Err(BuildError::BinaryNotFound {
            path: Some(binary.to_path_buf()),
        });
    }

    make_executable(binary)?;
    let reported = cli
        .get_version()
        .into_result()
        .map_err(|failure| BuildError::InvocationFailed {
            task: CHECK_VERSION_TASK.to_owned(),
            command: format!("{} {VERSION_ARG}", binary.display()),
            failure,
        })?;

    if let Some(parent) = version_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(version_file, &reported)?;

    if let (ResolutionSource::LocalOnly { .. }, Some(required)) = (config.source(), config.version())
        && reported != required
    {
        return Err(BuildError::VersionMismatch {
            required: required.to_owned(),
            reported,
            path: binary.to_path_buf(),
        });
    }

    info!(target: "elide", "Elide {reported} at {}", binary.display());
    Ok(VersionCheckOutcome::Reported(reported))
}
